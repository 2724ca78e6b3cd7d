//! The account form as the browser submits it, and its validation.

use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    api::{Account, AccountPayload, AccountType, BankInfoPayload},
    format::date_attr,
};

const DATE_INPUT_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

/// The raw values of the account form.
///
/// Every field is kept as the string the user typed so that an invalid form
/// can be shown again exactly as it was submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountFormData {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub bank_account_id: String,
    pub bank_id: String,
    /// Checkbox values are only sent when checked, see
    /// [MDN](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2).
    pub show_in_dashboard_summary: Option<String>,
    pub hide_from_reports: Option<String>,
    pub opening_date: String,
    pub closing_date: String,
    pub ignore_unprocessed_before: String,
}

/// Validation messages for the fields of an [AccountFormData].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub opening_date: Option<String>,
    pub closing_date: Option<String>,
    pub ignore_unprocessed_before: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();

    (!value.is_empty()).then(|| value.to_owned())
}

fn parse_date(value: &str, error: &mut Option<String>) -> Option<Date> {
    let value = value.trim();

    if value.is_empty() {
        return None;
    }

    match Date::parse(value, DATE_INPUT_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            *error = Some("Enter a date in the format YYYY-MM-DD.".to_owned());
            None
        }
    }
}

impl AccountFormData {
    /// Fill the form from `account`. Missing optional values become empty strings.
    pub fn from_account(account: &Account) -> Self {
        let bank_info = account.bank_info.as_ref();
        let checked = |value: bool| value.then(|| "on".to_owned());

        Self {
            name: account.name.clone(),
            kind: account.kind.as_str().to_owned(),
            description: account.description.clone().unwrap_or_default(),
            bank_account_id: bank_info
                .and_then(|info| info.account_id.clone())
                .unwrap_or_default(),
            bank_id: bank_info
                .and_then(|info| info.bank_id.clone())
                .unwrap_or_default(),
            show_in_dashboard_summary: checked(account.show_in_dashboard_summary),
            hide_from_reports: checked(account.hide_from_reports),
            opening_date: account.opening_date.map(date_attr).unwrap_or_default(),
            closing_date: account.closing_date.map(date_attr).unwrap_or_default(),
            ignore_unprocessed_before: account
                .ignore_unprocessed_before
                .map(date_attr)
                .unwrap_or_default(),
        }
    }

    /// Whether any of the fields in the "Advanced" section has a value.
    pub fn has_advanced_values(&self) -> bool {
        [
            &self.opening_date,
            &self.closing_date,
            &self.ignore_unprocessed_before,
        ]
        .iter()
        .any(|value| !value.trim().is_empty())
    }

    /// Whether any of the fields in the "Bank info" section has a value.
    pub fn has_bank_info_values(&self) -> bool {
        !self.bank_account_id.trim().is_empty() || !self.bank_id.trim().is_empty()
    }

    /// Check the form and build the request body for the backend.
    ///
    /// Empty optional fields are left out of the payload.
    ///
    /// # Errors
    /// Returns the message for every invalid field.
    pub fn validate(&self) -> Result<AccountPayload, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("Enter a name for the account.".to_owned());
        }

        let kind = AccountType::parse(self.kind.trim());
        if kind.is_none() {
            errors.kind = Some("Choose one of asset, income or expense.".to_owned());
        }

        let opening_date = parse_date(&self.opening_date, &mut errors.opening_date);
        let closing_date = parse_date(&self.closing_date, &mut errors.closing_date);
        let ignore_unprocessed_before = parse_date(
            &self.ignore_unprocessed_before,
            &mut errors.ignore_unprocessed_before,
        );

        let kind = match kind {
            Some(kind) if errors.is_empty() => kind,
            _ => return Err(errors),
        };

        let bank_info = BankInfoPayload {
            account_id: optional(&self.bank_account_id),
            bank_id: optional(&self.bank_id),
        };
        let bank_info = (bank_info.account_id.is_some() || bank_info.bank_id.is_some())
            .then_some(bank_info);

        Ok(AccountPayload {
            name: name.to_owned(),
            kind,
            description: optional(&self.description),
            bank_info,
            show_in_dashboard_summary: self.show_in_dashboard_summary.is_some(),
            hide_from_reports: self.hide_from_reports.is_some(),
            opening_date,
            closing_date,
            ignore_unprocessed_before,
        })
    }
}
