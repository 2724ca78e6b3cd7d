//! Typed queries and mutations for the backend's `/accounts` endpoints.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};

use crate::{
    Error,
    account::StagedImage,
    api::{Account, AccountId, AccountPayload, ApiSession},
    query::{QueryCache, QueryKey, Resource},
};

const ACCOUNTS: &str = "accounts";
const IMAGE: &str = "image";

/// The account operations available to one session.
///
/// Reads go through the [QueryCache]. Every successful mutation invalidates
/// the cached accounts so the next read fetches them again.
pub struct AccountsResource<'a> {
    session: &'a ApiSession,
    cache: &'a QueryCache,
}

impl<'a> AccountsResource<'a> {
    pub fn new(session: &'a ApiSession, cache: &'a QueryCache) -> Self {
        Self { session, cache }
    }

    /// Get every account.
    pub async fn list(&self) -> Result<Arc<Vec<Account>>, Error> {
        self.cache
            .get_or_fetch(self.session.key(), QueryKey::Accounts, || {
                self.session.get_json::<Vec<Account>>(&[ACCOUNTS])
            })
            .await
            .map_err(Error::from)
    }

    /// Get the account with `id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the backend does not know the account.
    pub async fn get(&self, id: &AccountId) -> Result<Arc<Account>, Error> {
        self.cache
            .get_or_fetch(self.session.key(), QueryKey::Account(id.clone()), || async move {
                self.session
                    .get_json::<Account>(&[ACCOUNTS, id.as_str()])
                    .await
            })
            .await
            .map_err(Error::from)
    }

    pub async fn create(&self, payload: &AccountPayload) -> Result<(), Error> {
        self.session.post_json(&[ACCOUNTS], payload).await?;
        self.invalidate();

        Ok(())
    }

    pub async fn update(&self, id: &AccountId, payload: &AccountPayload) -> Result<(), Error> {
        self.session
            .put_json(&[ACCOUNTS, id.as_str()], payload)
            .await?;
        self.invalidate();

        Ok(())
    }

    /// Delete the account with `id`, moving its transactions to `replacement` if given.
    ///
    /// Without a replacement the backend request carries no `replacementAccount`
    /// parameter at all.
    pub async fn delete(&self, id: &AccountId, replacement: Option<&AccountId>) -> Result<(), Error> {
        let query = match replacement {
            Some(replacement) => vec![("replacementAccount", replacement.as_str())],
            None => Vec::new(),
        };

        self.session
            .delete(&[ACCOUNTS, id.as_str()], &query)
            .await?;
        self.invalidate();

        Ok(())
    }

    /// Upload `image` as the image of the account with `id`.
    pub async fn upload_image(&self, id: &AccountId, image: &StagedImage) -> Result<(), Error> {
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(|_| Error::NotAnImage(image.content_type.clone()))?;
        let form = Form::new().part("image", part);

        self.session
            .post_multipart(&[ACCOUNTS, id.as_str(), IMAGE], form)
            .await?;
        self.invalidate();

        Ok(())
    }

    /// Remove the image of the account with `id`.
    pub async fn delete_image(&self, id: &AccountId) -> Result<(), Error> {
        self.session
            .delete(&[ACCOUNTS, id.as_str(), IMAGE], &[])
            .await?;
        self.invalidate();

        Ok(())
    }

    fn invalidate(&self) {
        self.cache.invalidate(self.session.key(), Resource::Accounts);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::{
        Error,
        api::{AccountId, AccountPayload, AccountType, ApiClient},
        query::QueryCache,
        test_utils::{FakeBackend, sample_accounts},
    };

    use super::AccountsResource;

    fn payload(name: &str) -> AccountPayload {
        AccountPayload {
            name: name.to_owned(),
            kind: AccountType::Asset,
            description: None,
            bank_info: None,
            show_in_dashboard_summary: false,
            hide_from_reports: false,
            opening_date: None,
            closing_date: None,
            ignore_unprocessed_before: None,
        }
    }

    #[tokio::test]
    async fn list_is_cached_until_a_mutation() {
        let backend = FakeBackend::start().await;
        backend.set_accounts(sample_accounts());
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));
        let accounts = AccountsResource::new(&session, &cache);

        assert_eq!(accounts.list().await.unwrap().len(), 3);
        accounts.list().await.unwrap();
        assert_eq!(backend.count_requests("GET", "/v1/accounts"), 1);

        accounts.create(&payload("Holiday fund")).await.unwrap();
        let refreshed = accounts.list().await.unwrap();
        accounts.list().await.unwrap();

        assert_eq!(refreshed.len(), 4);
        assert_eq!(backend.count_requests("GET", "/v1/accounts"), 2);
    }

    #[tokio::test]
    async fn get_fetches_one_account_and_caches_it() {
        let backend = FakeBackend::start().await;
        backend.set_accounts(sample_accounts());
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));
        let accounts = AccountsResource::new(&session, &cache);

        let account = accounts.get(&AccountId::new("B")).await.unwrap();
        accounts.get(&AccountId::new("B")).await.unwrap();

        assert_eq!(account.name, "Salary");
        assert_eq!(backend.count_requests("GET", "/v1/accounts/B"), 1);
    }

    #[tokio::test]
    async fn get_missing_account_is_not_found() {
        let backend = FakeBackend::start().await;
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));

        let result = AccountsResource::new(&session, &cache)
            .get(&AccountId::new("missing"))
            .await;

        assert_eq!(result, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn delete_without_replacement_sends_no_query() {
        let backend = FakeBackend::start().await;
        backend.set_accounts(sample_accounts());
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));

        AccountsResource::new(&session, &cache)
            .delete(&AccountId::new("A"), None)
            .await
            .unwrap();

        let request = backend.last_request("DELETE").unwrap();
        assert_eq!(request.path, "/v1/accounts/A");
        assert_eq!(request.query, None);
    }

    #[tokio::test]
    async fn delete_with_replacement_sends_replacement() {
        let backend = FakeBackend::start().await;
        backend.set_accounts(sample_accounts());
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));

        AccountsResource::new(&session, &cache)
            .delete(&AccountId::new("A"), Some(&AccountId::new("B")))
            .await
            .unwrap();

        let request = backend.last_request("DELETE").unwrap();
        assert_eq!(request.path, "/v1/accounts/A");
        assert_eq!(request.query.as_deref(), Some("replacementAccount=B"));
    }

    #[tokio::test]
    async fn failed_mutation_keeps_cache() {
        let backend = FakeBackend::start().await;
        backend.set_accounts(sample_accounts());
        let session = ApiClient::new(backend.base_url())
            .unwrap()
            .session(FakeBackend::TOKEN);
        let cache = QueryCache::new(Duration::from_secs(60));
        let accounts = AccountsResource::new(&session, &cache);
        accounts.list().await.unwrap();
        backend.fail_mutations_with(400, "Name already in use");

        let result = accounts.create(&payload("Everyday")).await;
        accounts.list().await.unwrap();

        assert_eq!(
            result,
            Err(Error::BackendRejected {
                status: 400,
                message: "Name already in use".to_owned()
            })
        );
        assert_eq!(backend.count_requests("GET", "/v1/accounts"), 1);
    }
}
