use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Content-addressed "already posted" set; gives the pipeline idempotence
/// under webhook re-delivery and re-reviews of the same PR.
pub trait DedupStore: Send + Sync {
    fn seen(&self, key: &str) -> bool;
    fn mark(&self, key: &str);
}

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory store with TTL expiry and bounded size.
///
/// Eviction is pure insertion order: re-marking a key refreshes its expiry
/// but not its place in line. Expired keys are removed lazily on `seen`.
pub struct MemoryDedup {
    inner: Mutex<DedupState>,
    ttl: Duration,
    max_entries: usize,
}

struct DedupState {
    expiries: HashMap<String, Instant>,
    insertions: VecDeque<String>,
}

impl Default for MemoryDedup {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDedup {
    pub fn new() -> Self {
        Self::with(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }

    pub fn with(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(DedupState {
                expiries: HashMap::new(),
                insertions: VecDeque::new(),
            }),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DedupState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DedupStore for MemoryDedup {
    fn seen(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.lock();
        match state.expiries.get(key).copied() {
            Some(expiry) if now < expiry => true,
            Some(_) => {
                state.expiries.remove(key);
                false
            }
            None => false,
        }
    }

    fn mark(&self, key: &str) {
        let mut state = self.lock();
        if !state.expiries.contains_key(key) {
            state.insertions.push_back(key.to_string());
        }
        let expiry = Instant::now() + self.ttl;
        state.expiries.insert(key.to_string(), expiry);

        while state.expiries.len() > self.max_entries {
            // Skips queue entries whose key already expired lazily.
            let Some(oldest) = state.insertions.pop_front() else {
                break;
            };
            state.expiries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_keys_are_seen() {
        let store = MemoryDedup::new();
        assert!(!store.seen("k"));
        store.mark("k");
        assert!(store.seen("k"));
    }

    #[test]
    fn evicts_in_insertion_order_beyond_max_entries() {
        let store = MemoryDedup::with(Duration::from_secs(3600), 2);
        store.mark("k1");
        store.mark("k2");
        store.mark("k3");

        assert!(!store.seen("k1"), "oldest key must be evicted");
        assert!(store.seen("k2"));
        assert!(store.seen("k3"));
    }

    #[test]
    fn expires_keys_after_ttl() {
        let store = MemoryDedup::with(Duration::from_millis(5), 100);
        store.mark("expiring");
        std::thread::sleep(Duration::from_millis(10));
        assert!(!store.seen("expiring"));
    }

    #[test]
    fn remark_refreshes_expiry_but_not_position() {
        let store = MemoryDedup::with(Duration::from_secs(3600), 2);
        store.mark("k1");
        store.mark("k2");
        store.mark("k1");
        store.mark("k3");

        // k1 kept its original slot, so it is still the eviction victim.
        assert!(!store.seen("k1"));
        assert!(store.seen("k2"));
        assert!(store.seen("k3"));
    }

    #[test]
    fn never_holds_more_than_max_entries() {
        let store = MemoryDedup::with(Duration::from_secs(3600), 3);
        for i in 0..20 {
            store.mark(&format!("k{i}"));
        }
        let live = (0..20).filter(|i| store.seen(&format!("k{i}"))).count();
        assert_eq!(live, 3);
    }
}
