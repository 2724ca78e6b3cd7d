//! A per-session cache of backend query results.

use std::{
    any::Any,
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::api::{AccountId, ApiError, SessionKey};

/// A group of queries that are invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Accounts,
    Currencies,
}

/// Identifies one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The list of all accounts.
    Accounts,
    /// A single account.
    Account(AccountId),
    /// The list of all currencies.
    Currencies,
}

impl QueryKey {
    /// The resource whose invalidation clears this query.
    pub fn resource(&self) -> Resource {
        match self {
            QueryKey::Accounts | QueryKey::Account(_) => Resource::Accounts,
            QueryKey::Currencies => Resource::Currencies,
        }
    }
}

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
}

/// A fetch that has started but not yet stored its result.
struct PendingFetch {
    session: SessionKey,
    resource: Resource,
    /// Set when the resource is invalidated while the fetch is running.
    outdated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<(SessionKey, QueryKey), Entry>,
    pending: HashMap<u64, PendingFetch>,
    next_fetch_id: u64,
}

impl CacheState {
    fn evict_stale(&mut self, stale_time: Duration) {
        self.entries
            .retain(|_, entry| entry.fetched_at.elapsed() < stale_time);
    }

    fn mark_outdated(&mut self, session: &SessionKey, resource: Option<Resource>) {
        self.pending
            .values_mut()
            .filter(|fetch| {
                &fetch.session == session && resource.is_none_or(|resource| fetch.resource == resource)
            })
            .for_each(|fetch| fetch.outdated = true);
    }
}

/// Removes a pending fetch when dropped, so that fetches which fail or are
/// cancelled do not stay registered.
struct PendingFetchGuard<'a> {
    cache: &'a QueryCache,
    id: u64,
}

impl PendingFetchGuard<'_> {
    /// Whether the fetched data may be stored.
    fn finish(&self) -> bool {
        self.cache
            .lock()
            .pending
            .remove(&self.id)
            .is_some_and(|fetch| !fetch.outdated)
    }
}

impl Drop for PendingFetchGuard<'_> {
    fn drop(&mut self) {
        self.cache.lock().pending.remove(&self.id);
    }
}

/// An in-memory cache of backend responses, keyed by session and query.
///
/// Only data returned by the backend is stored. Entries older than the stale
/// time are fetched again on the next read, and are dropped whenever a new
/// entry is stored so that abandoned sessions do not accumulate.
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    stale_time: Duration,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stale_time", &self.stale_time)
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            state: Arc::default(),
            stale_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the fresh cached value for `key`, if there is one.
    pub fn get<T>(&self, session: &SessionKey, key: &QueryKey) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let state = self.lock();
        let entry = state.entries.get(&(session.clone(), key.clone()))?;

        if entry.fetched_at.elapsed() >= self.stale_time {
            return None;
        }

        entry.value.clone().downcast::<T>().ok()
    }

    fn start_fetch(&self, session: &SessionKey, resource: Resource) -> PendingFetchGuard<'_> {
        let mut state = self.lock();
        let id = state.next_fetch_id;
        state.next_fetch_id = state.next_fetch_id.wrapping_add(1);
        state.pending.insert(
            id,
            PendingFetch {
                session: session.clone(),
                resource,
                outdated: false,
            },
        );

        PendingFetchGuard { cache: self, id }
    }

    /// Return the cached value for `key`, or fetch it with `fetch` and cache
    /// the result. Errors are never cached.
    ///
    /// # Errors
    /// Returns the error from `fetch`.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        session: &SessionKey,
        key: QueryKey,
        fetch: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.get::<T>(session, &key) {
            tracing::debug!("cache hit for {key:?} in session {session}");
            return Ok(value);
        }

        let pending = self.start_fetch(session, key.resource());
        let result = fetch().await;
        let can_store = pending.finish();
        let value = Arc::new(result?);

        if !can_store {
            tracing::debug!("not caching {key:?}, it was invalidated while being fetched");
            return Ok(value);
        }

        let mut state = self.lock();
        state.evict_stale(self.stale_time);
        state.entries.insert(
            (session.clone(), key),
            Entry {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(value)
    }

    /// Drop every cached query of `resource` for `session`.
    pub fn invalidate(&self, session: &SessionKey, resource: Resource) {
        let mut state = self.lock();

        state
            .entries
            .retain(|(entry_session, key), _| entry_session != session || key.resource() != resource);
        state.mark_outdated(session, Some(resource));

        tracing::debug!("invalidated {resource:?} for session {session}");
    }

    /// Drop everything cached for `session`, e.g. when the user logs out.
    pub fn clear_session(&self, session: &SessionKey) {
        let mut state = self.lock();

        state
            .entries
            .retain(|(entry_session, _), _| entry_session != session);
        state.mark_outdated(session, None);
    }
}
