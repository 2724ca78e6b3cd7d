//! Cached, typed access to the backend's resources.

mod accounts;
mod cache;
mod currencies;

pub use accounts::AccountsResource;
pub use cache::{QueryCache, QueryKey, Resource};
pub use currencies::CurrenciesResource;
