use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Entry<T> {
    value: T,
    created: Instant,
}

/// Single-use payloads keyed by random tokens.
///
/// A token is redeemed with [`SessionStore::take`], which removes the entry in
/// the same critical section that finds it, so two concurrent readers of one
/// token can never both succeed. Entries nobody opens expire after `ttl`.
pub struct SessionStore<T> {
    entries: Mutex<HashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Store a payload under a fresh UUID v4 token
    pub fn insert(&self, value: T) -> String {
        let token = Uuid::new_v4().to_string();
        self.entries.lock().insert(
            token.clone(),
            Entry {
                value,
                created: Instant::now(),
            },
        );
        token
    }

    /// Remove and return the payload, or `None` if unknown or expired
    pub fn take(&self, token: &str) -> Option<T> {
        let entry = self.entries.lock().remove(token)?;
        if self.is_expired(&entry) {
            tracing::debug!(token, "Session expired before it was opened");
            return None;
        }
        Some(entry.value)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.lock().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.created.elapsed() < self.ttl);
        before - entries.len()
    }

    fn is_expired(&self, entry: &Entry<T>) -> bool {
        entry.created.elapsed() >= self.ttl
    }
}
