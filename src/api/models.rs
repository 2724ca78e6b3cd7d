//! The JSON resources exchanged with the backend.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

/// The backend's identifier for an account.
///
/// The backend may send identifiers as JSON strings or numbers, both are
/// stored as strings since the frontend only ever echoes them back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(#[serde(deserialize_with = "id_string")] String);

impl AccountId {
    /// Wrap an identifier received from a form or URL.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The backend's identifier for a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(#[serde(deserialize_with = "id_string")] String);

impl CurrencyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Display for CurrencyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Treats `null` the same as a missing flag.
fn bool_or_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Audit fields that every backend entity carries.
///
/// These are owned by the backend and never sent back in a payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

/// What an account is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Income,
    Expense,
}

impl AccountType {
    /// All account types in the order they are offered in forms.
    pub const ALL: [AccountType; 3] = [AccountType::Asset, AccountType::Income, AccountType::Expense];

    /// The value used on the wire and in form fields.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountType::Asset => "Asset",
            AccountType::Income => "Income",
            AccountType::Expense => "Expense",
        }
    }

    /// Parse the wire/form representation, e.g. "asset".
    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|account_type| account_type.as_str() == text)
    }
}

/// The link between an account and an account at a bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    /// The last balance reported by the bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_balance: Option<f64>,
}

/// An account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfo>,
    #[serde(default, deserialize_with = "bool_or_null")]
    pub show_in_dashboard_summary: bool,
    #[serde(default, deserialize_with = "bool_or_null")]
    pub hide_from_reports: bool,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<Date>,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<Date>,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub ignore_unprocessed_before: Option<Date>,
    /// A reference (URL) to the account's image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// The bank link fields the frontend may set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfoPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
}

/// The body of a create or update request for an account.
///
/// Absent optional fields are left out of the JSON entirely so that an
/// update never overwrites backend values with empty ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfoPayload>,
    #[serde(default)]
    pub show_in_dashboard_summary: bool,
    #[serde(default)]
    pub hide_from_reports: bool,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub opening_date: Option<Date>,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<Date>,
    #[serde(default, with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub ignore_unprocessed_before: Option<Date>,
}

/// A currency as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    pub id: CurrencyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u8>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// The credentials exchanged for a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// The backend's reply to a successful authorization.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthorizeResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
}

mod iso_date {
    //! Dates are sent as "YYYY-MM-DD". The backend sometimes answers with a
    //! full RFC 3339 timestamp, in which case only the date part is kept.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

    const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => {
                let formatted = date
                    .format(DATE_FORMAT)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        if text.is_empty() {
            return Ok(None);
        }

        let date_part = text.get(..10).unwrap_or(&text);
        Date::parse(date_part, DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}
