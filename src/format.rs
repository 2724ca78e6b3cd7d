//! Number, money and date formatting for display.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use time::{Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, api::Currency, timezone::get_offset_at};

/// The number of decimal places used when a currency does not say otherwise.
pub const DEFAULT_DECIMAL_PLACES: u8 = 2;

const DISPLAY_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day padding:none] [month repr:short] [year]");

const DATE_ATTRIBUTE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

const DISPLAY_TIMESTAMP_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day padding:none] [month repr:short] [year] [hour]:[minute]");

fn get_thousands_separator_formatter() -> &'static Formatter {
    static FORMATTER: OnceLock<Formatter> = OnceLock::new();

    FORMATTER.get_or_init(|| {
        Formatter::new()
            .separator(',')
            .unwrap()
            .precision(Precision::Decimals(0))
    })
}

/// The most decimal places that can be rounded by scaling an `f64` without
/// losing precision.
const MAX_SCALED_DECIMALS: u8 = 15;

/// Format `value` with thousands separators and exactly `decimals` decimal places,
/// e.g. `format_number(-1234.5, 2)` gives "-1,234.50".
pub fn format_number(value: f64, decimals: u8) -> String {
    let magnitude = round_half_away_from_zero(value.abs(), decimals);
    let text = format!("{magnitude:.precision$}", precision = usize::from(decimals));
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let is_negative = value < 0.0 && text.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if is_negative { "-" } else { "" };

    let whole: f64 = whole.parse().unwrap_or_default();
    // numfmt renders zero as "0" regardless of the separator settings.
    let whole_text = if whole == 0.0 {
        "0".to_owned()
    } else {
        get_thousands_separator_formatter().fmt_string(whole)
    };

    if fraction.is_empty() {
        format!("{sign}{whole_text}")
    } else {
        format!("{sign}{whole_text}.{fraction}")
    }
}

/// `format!` rounds ties to even, amounts round ties away from zero.
fn round_half_away_from_zero(magnitude: f64, decimals: u8) -> f64 {
    if decimals > MAX_SCALED_DECIMALS {
        return magnitude;
    }

    let scale = 10_f64.powi(i32::from(decimals));
    let rounded = (magnitude * scale).round() / scale;

    if rounded.is_finite() { rounded } else { magnitude }
}

/// Format `value` as an amount of `currency`.
///
/// The currency symbol is used as a prefix when there is one, otherwise the
/// currency name follows the number, e.g. "$1,234.50" or "1,234.50 NZD".
pub fn format_amount(value: f64, currency: &Currency) -> String {
    let decimals = currency.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES);
    let number = format_number(value.abs(), decimals);
    let sign = if value < 0.0 && number.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match currency.symbol.as_deref().map(str::trim) {
        Some(symbol) if !symbol.is_empty() => format!("{sign}{symbol}{number}"),
        _ => format!("{sign}{number} {}", currency.name),
    }
}

/// Format a date for display, e.g. "31 Jan 2025".
pub fn format_date(date: Date) -> String {
    date.format(DISPLAY_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Format a date for `<time datetime>` and date inputs, e.g. "2025-01-31".
pub fn date_attr(date: Date) -> String {
    date.format(DATE_ATTRIBUTE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Format a backend timestamp in the local timezone, e.g. "31 Jan 2025 14:05".
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a known timezone.
pub fn format_timestamp(
    timestamp: OffsetDateTime,
    canonical_timezone: &str,
) -> Result<String, Error> {
    let offset = get_offset_at(canonical_timezone, timestamp)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    let local = timestamp.to_offset(offset);

    Ok(local
        .format(DISPLAY_TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| local.to_string()))
}

/// The letter shown in place of a missing account image.
///
/// This is the first grapheme of `name` in upper case, or "?" for a blank name.
pub fn avatar_initial(name: &str) -> String {
    name.trim()
        .graphemes(true)
        .next()
        .map(str::to_uppercase)
        .unwrap_or_else(|| "?".to_owned())
}
