//! Typed queries for the backend's `/currencies` endpoint.

use std::sync::Arc;

use crate::{
    Error,
    api::{ApiSession, Currency},
    query::{QueryCache, QueryKey},
};

/// The currency queries available to one session.
pub struct CurrenciesResource<'a> {
    session: &'a ApiSession,
    cache: &'a QueryCache,
}

impl<'a> CurrenciesResource<'a> {
    pub fn new(session: &'a ApiSession, cache: &'a QueryCache) -> Self {
        Self { session, cache }
    }

    /// Get every currency the backend knows about.
    pub async fn list(&self) -> Result<Arc<Vec<Currency>>, Error> {
        self.cache
            .get_or_fetch(self.session.key(), QueryKey::Currencies, || {
                self.session.get_json::<Vec<Currency>>(&["currencies"])
            })
            .await
            .map_err(Error::from)
    }
}
