//! Server-side holding place for account images between selection and upload,
//! and the guard that stops the same image request running twice.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use axum::body::Bytes;

use crate::{
    Error,
    api::{AccountId, SessionKey},
};

/// An image file selected in the image dialog that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

type SlotKey = (SessionKey, AccountId);

/// How long a staged image is kept before it is discarded unread.
pub const STAGED_IMAGE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug)]
struct Slot {
    image: StagedImage,
    staged_at: Instant,
}

/// One staging slot per image dialog, i.e. per session and account.
///
/// Slots older than the time to live are dropped, so dialogs that were never
/// closed do not hold on to their images.
#[derive(Debug, Clone)]
pub struct UploadStaging {
    slots: Arc<Mutex<HashMap<SlotKey, Slot>>>,
    ttl: Duration,
}

impl Default for UploadStaging {
    fn default() -> Self {
        Self::new(STAGED_IMAGE_TTL)
    }
}

impl UploadStaging {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::default(),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SlotKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `image` into the slot for `session` and `account`, replacing any
    /// previously staged image.
    pub fn stage(&self, session: &SessionKey, account: &AccountId, image: StagedImage) {
        let mut slots = self.lock();
        let ttl = self.ttl;
        slots.retain(|_, slot| slot.staged_at.elapsed() < ttl);

        let replaced = slots.insert(
            (session.clone(), account.clone()),
            Slot {
                image,
                staged_at: Instant::now(),
            },
        );

        if replaced.is_some() {
            tracing::debug!("Replaced the staged image for account {account} in session {session}");
        }
    }

    pub fn get(&self, session: &SessionKey, account: &AccountId) -> Option<StagedImage> {
        self.lock()
            .get(&(session.clone(), account.clone()))
            .filter(|slot| slot.staged_at.elapsed() < self.ttl)
            .map(|slot| slot.image.clone())
    }

    /// Empty the slot for `session` and `account`.
    ///
    /// Returns whether there was an image in the slot.
    pub fn clear(&self, session: &SessionKey, account: &AccountId) -> bool {
        self.lock()
            .remove(&(session.clone(), account.clone()))
            .is_some()
    }

    /// Empty every slot of `session`.
    pub fn clear_session(&self, session: &SessionKey) {
        self.lock()
            .retain(|(slot_session, _), _| slot_session != session);
    }
}

/// The image requests that must not run concurrently for the same account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAction {
    Upload,
    Remove,
}

type RequestKey = (SessionKey, AccountId, ImageAction);

/// The image requests that are currently being processed.
#[derive(Debug, Clone, Default)]
pub struct InFlightRequests {
    requests: Arc<Mutex<HashSet<RequestKey>>>,
}

impl InFlightRequests {
    fn lock(&self) -> MutexGuard<'_, HashSet<RequestKey>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `action` on `account` as in flight for `session`.
    ///
    /// The request stays in flight until the returned guard is dropped.
    ///
    /// # Errors
    /// Returns [Error::RequestInFlight] if the same request is already in flight.
    pub fn start(
        &self,
        session: &SessionKey,
        account: &AccountId,
        action: ImageAction,
    ) -> Result<InFlightGuard, Error> {
        let key = (session.clone(), account.clone(), action);

        if !self.lock().insert(key.clone()) {
            tracing::debug!("{action:?} for account {account} is already in flight");
            return Err(Error::RequestInFlight);
        }

        Ok(InFlightGuard {
            requests: self.clone(),
            key,
        })
    }

    pub fn is_in_flight(&self, session: &SessionKey, account: &AccountId, action: ImageAction) -> bool {
        self.lock()
            .contains(&(session.clone(), account.clone(), action))
    }
}

/// Ends an in-flight request when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    requests: InFlightRequests,
    key: RequestKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.requests.lock().remove(&self.key);
    }
}
