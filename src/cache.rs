// In-memory key/value cache with per-entry expiry.
// Expiry is checked on every read; the sweeper only reclaims memory.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by string. Time comes from the tokio clock, so
/// paused-time tests can advance it.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value` under `key`, replacing any previous entry and resetting its expiry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), entry);
    }

    /// Returns the value if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn delete(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of stored entries, including expired ones the sweeper has not removed yet.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| now < e.expires_at);
        before - entries.len()
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Spawns the background sweep (every ttl/2). Exits when `shutdown` fires or
    /// the cache is dropped.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let period = (self.ttl / 2).max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let Some(cache) = cache.upgrade() else {
                            break;
                        };
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            tracing::trace!(purged, "cache sweep");
                        }
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
            tracing::debug!("Cache sweeper shutting down");
        })
    }
}
