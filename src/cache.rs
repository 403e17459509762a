use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::sources::ThreadKey;

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// Most recent value per review, with a time-to-live. Entries are
/// independent: storing or expiring one never touches another, and an
/// expired entry stays available through [`ResultCache::any`].
pub struct ResultCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<ThreadKey, Entry<T>>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadKey, Entry<T>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The cached value if it is younger than the TTL.
    pub fn fresh(&self, key: &ThreadKey) -> Option<T> {
        let entries = self.lock();
        let entry = entries.get(key)?;
        let age = entry.stored_at.elapsed();
        if age < self.ttl {
            debug!(key = %key, age_secs = age.as_secs(), "serving cached data");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// The cached value regardless of age.
    pub fn any(&self, key: &ThreadKey) -> Option<T> {
        self.lock().get(key).map(|e| e.value.clone())
    }

    pub fn store(&self, key: &ThreadKey, value: T) {
        self.lock().insert(
            key.clone(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        debug!(key = %key, "cached data");
    }

    pub fn invalidate(&self, key: &ThreadKey) {
        if self.lock().remove(key).is_some() {
            debug!(key = %key, "cache invalidated");
        }
    }
}
