//! The client for the finance backend's JSON REST API.

mod client;
mod error;
mod models;
mod session;

pub use client::ApiClient;
pub use error::{ApiError, GENERIC_ERROR_MESSAGE};
pub use models::{
    Account, AccountId, AccountPayload, AccountType, BankInfoPayload, Credentials, Currency,
};
#[cfg(test)]
pub use models::{Audit, BankInfo, CurrencyId};
pub use session::{ApiSession, SessionKey};
