use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// The per-repository token bucket the processor waits on.
pub type RepoLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub const IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

struct LimiterEntry {
    limiter: Arc<RepoLimiter>,
    last_used: Instant,
}

struct RegistryState {
    entries: HashMap<String, LimiterEntry>,
    last_pruned: Option<Instant>,
}

/// Hands out one token-bucket limiter per repository and evicts idle ones.
///
/// The prune sweep is lazy: it runs inside `get`, at most once per minute.
pub struct LimiterRegistry {
    inner: Mutex<RegistryState>,
    quota: Quota,
    idle_ttl: Duration,
}

impl LimiterRegistry {
    pub fn new(rps: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Mutex::new(RegistryState {
                entries: HashMap::new(),
                last_pruned: None,
            }),
            quota: Quota::per_second(rps).allow_burst(burst),
            idle_ttl: IDLE_TTL,
        }
    }

    /// Shortens the idle TTL; used by tests.
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    /// Returns the repository's limiter, creating it on first access.
    pub fn get(&self, repo: &str) -> Arc<RepoLimiter> {
        let now = Instant::now();
        let mut state = self.lock();
        self.prune_locked(&mut state, now);

        if let Some(entry) = state.entries.get_mut(repo) {
            entry.last_used = now;
            return entry.limiter.clone();
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        state.entries.insert(
            repo.to_string(),
            LimiterEntry {
                limiter: limiter.clone(),
                last_used: now,
            },
        );
        limiter
    }

    fn prune_locked(&self, state: &mut RegistryState, now: Instant) {
        if let Some(last) = state.last_pruned {
            if now.duration_since(last) < PRUNE_INTERVAL {
                return;
            }
        }
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.last_used) <= self.idle_ttl);
        state.last_pruned = Some(now);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn force_prune_due(&self) {
        let mut state = self.lock();
        state.last_pruned = Instant::now().checked_sub(Duration::from_secs(120));
    }

    #[cfg(test)]
    fn contains(&self, repo: &str) -> bool {
        self.lock().entries.contains_key(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_limiter_per_repo() {
        let registry = LimiterRegistry::new(2, 4);
        let first = registry.get("acme/repo");
        let second = registry.get("acme/repo");
        assert!(Arc::ptr_eq(&first, &second));

        let other = registry.get("acme/other");
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn burst_allows_immediate_checks_up_to_capacity() {
        let registry = LimiterRegistry::new(1, 3);
        let limiter = registry.get("acme/repo");
        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err(), "burst exhausted");
    }

    #[test]
    fn prunes_idle_entries_and_no_others() {
        let registry = LimiterRegistry::new(2, 4).with_idle_ttl(Duration::from_millis(5));
        registry.get("idle/repo");
        std::thread::sleep(Duration::from_millis(10));

        registry.force_prune_due();
        registry.get("fresh/repo");

        assert!(!registry.contains("idle/repo"), "idle entry must be pruned");
        assert!(registry.contains("fresh/repo"));
    }

    #[test]
    fn prune_sweep_is_rate_limited() {
        let registry = LimiterRegistry::new(2, 4).with_idle_ttl(Duration::from_millis(5));
        registry.get("a/repo");
        std::thread::sleep(Duration::from_millis(10));

        // Last sweep was moments ago, so the idle entry survives this get.
        registry.get("b/repo");
        assert!(registry.contains("a/repo"));
    }
}
