use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The set of session ids with a live worker.
///
/// This is the mutual-exclusion authority for admission: the persisted
/// `charging` flag is only a durable hint, and after a restart the two
/// can disagree. The scheduler and the immediate-start path both go
/// through [`try_admit`](Self::try_admit), so whichever loses the race
/// simply backs off.
pub struct ChargeRegistry {
    active: DashMap<String, CancellationToken>,
}

impl ChargeRegistry {
    pub fn new() -> Self {
        Self {
            active: DashMap::new(),
        }
    }

    /// Atomically claim `id` for execution.
    ///
    /// Returns the cancellation token the new worker must carry, or
    /// `None` (with no side effects) when a worker is already
    /// registered. This is a single test-and-set through the map's
    /// entry lock — never a separate contains/insert pair, which would
    /// let two admission paths both observe "absent".
    pub fn try_admit(&self, id: &str) -> Option<CancellationToken> {
        match self.active.entry(id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                slot.insert(token.clone());
                debug!(session_id = %id, "session admitted");
                Some(token)
            }
        }
    }

    /// Remove `id` unconditionally. Safe to call from the worker's own
    /// exit path, and for ids that were never admitted.
    pub fn release(&self, id: &str) {
        self.active.remove(id);
        debug!(session_id = %id, "session released");
    }

    /// Whether a worker currently owns `id`.
    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Signal cancellation to the worker owning `id`, if any.
    ///
    /// Cooperative: the worker observes the signal at its next suspend
    /// point, unwinds through its recovery path, and releases itself.
    pub fn cancel(&self, id: &str) -> bool {
        match self.active.get(id) {
            Some(entry) => {
                entry.value().cancel();
                true
            }
            None => false,
        }
    }

    /// Signal cancellation to every live worker (shutdown path).
    pub fn cancel_all(&self) {
        for entry in self.active.iter() {
            entry.value().cancel();
        }
    }

    /// Number of live workers.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl Default for ChargeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_admit_fails_until_release() {
        let registry = ChargeRegistry::new();

        assert!(registry.try_admit("s-1").is_some());
        assert!(registry.try_admit("s-1").is_none());
        assert!(registry.is_active("s-1"));

        registry.release("s-1");
        assert!(!registry.is_active("s-1"));
        assert!(registry.try_admit("s-1").is_some());
    }

    #[test]
    fn distinct_ids_are_independent() {
        let registry = ChargeRegistry::new();
        assert!(registry.try_admit("s-1").is_some());
        assert!(registry.try_admit("s-2").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn cancel_fires_the_admitted_token() {
        let registry = ChargeRegistry::new();
        let token = registry.try_admit("s-1").unwrap();

        assert!(!token.is_cancelled());
        assert!(registry.cancel("s-1"));
        assert!(token.is_cancelled());

        assert!(!registry.cancel("s-2"));
    }

    #[test]
    fn cancel_all_reaches_every_worker() {
        let registry = ChargeRegistry::new();
        let a = registry.try_admit("s-1").unwrap();
        let b = registry.try_admit("s-2").unwrap();

        registry.cancel_all();
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn release_is_idempotent() {
        let registry = ChargeRegistry::new();
        registry.release("never-admitted");
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_admits_grant_exactly_one_owner() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let registry = Arc::new(ChargeRegistry::new());
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if registry.try_admit("s-1").is_some() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
}
