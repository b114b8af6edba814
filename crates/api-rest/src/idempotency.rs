//! In-memory idempotency store.
//!
//! Maps an `Idempotency-Key` to the request body hash and the response produced for it. Entries
//! live for the lifetime of the process.
//!
//! A key moves through two states:
//!
//! - **in flight**: claimed by a request that is still composing
//! - **done**: the stored response is replayed to any later request with the same body
//!
//! [`IdempotencyStore::claim`] inspects and reserves a key under one lock, so two concurrent
//! requests with the same key can never both compose. The loser sees [`Claim::InFlight`].

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// Hex-encoded SHA-256 of a request body.
pub fn body_hash(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

/// A response recorded against an idempotency key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredResponse {
    pub body_hash: String,
    pub message_id: String,
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug)]
enum Slot {
    InFlight { body_hash: String },
    Done(Arc<StoredResponse>),
}

/// Outcome of [`IdempotencyStore::claim`].
#[derive(Debug)]
pub enum Claim {
    /// The key was unused and is now reserved for the caller.
    Fresh(Reservation),
    /// The key already holds a response for the same body.
    Replay(Arc<StoredResponse>),
    /// The key already holds a response for a different body.
    Conflict,
    /// Another request holds the key and has not finished.
    InFlight,
}

#[derive(Clone, Debug, Default)]
pub struct IdempotencyStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` and, if it is unused, reserve it for a request whose body hashes to
    /// `body_hash`.
    pub fn claim(&self, key: &str, body_hash: &str) -> Claim {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Done(stored)) if stored.body_hash == body_hash => {
                Claim::Replay(Arc::clone(stored))
            }
            Some(Slot::Done(_)) => Claim::Conflict,
            Some(Slot::InFlight { .. }) => Claim::InFlight,
            None => {
                slots.insert(
                    key.to_owned(),
                    Slot::InFlight {
                        body_hash: body_hash.to_owned(),
                    },
                );
                Claim::Fresh(Reservation {
                    store: self.clone(),
                    key: key.to_owned(),
                    body_hash: body_hash.to_owned(),
                    finished: false,
                })
            }
        }
    }

    /// The completed response stored for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<StoredResponse>> {
        match self.slots.lock().get(key) {
            Some(Slot::Done(stored)) => Some(Arc::clone(stored)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Exclusive hold on an idempotency key.
///
/// Dropping a reservation without calling [`Reservation::complete`] frees the key, so a failed
/// request can be retried with the same key.
#[derive(Debug)]
pub struct Reservation {
    store: IdempotencyStore,
    key: String,
    body_hash: String,
    finished: bool,
}

impl Reservation {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Record the response for this key. Later claims with the same body replay it.
    pub fn complete(mut self, message_id: String, status: u16, body: Vec<u8>) -> Arc<StoredResponse> {
        let stored = Arc::new(StoredResponse {
            body_hash: std::mem::take(&mut self.body_hash),
            message_id,
            status,
            body,
        });
        self.store
            .slots
            .lock()
            .insert(self.key.clone(), Slot::Done(Arc::clone(&stored)));
        self.finished = true;
        stored
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut slots = self.store.slots.lock();
        if matches!(slots.get(&self.key), Some(Slot::InFlight { .. })) {
            slots.remove(&self.key);
        }
    }
}
