//! Per-plan write serialization.
//!
//! Writers of the same plan queue on that plan's mutex; writers of
//! different plans never contend here. Lock entries are never removed, so
//! a writer can't end up holding a mutex that a concurrent hard delete
//! has already dropped from the map.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use entl_core::PlanId;

#[derive(Debug, Default)]
pub(crate) struct PlanLocks {
    locks: DashMap<PlanId, Arc<Mutex<()>>>,
}

impl PlanLocks {
    /// Run `f` while holding the lock for `plan`.
    pub(crate) fn with<T>(&self, plan: &PlanId, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out first so the DashMap shard guard is released
        // before blocking on the plan mutex.
        let lock = self
            .locks
            .entry(plan.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_plan_writers_are_serialized() {
        let locks = Arc::new(PlanLocks::default());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let plan = PlanId::new("PLN-002").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                let plan = plan.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        locks.with(&plan, || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            inside.fetch_sub(1, Ordering::SeqCst);
                        });
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_plans_do_not_share_a_lock() {
        let locks = PlanLocks::default();
        let a = PlanId::new("PLN-001").unwrap();
        let b = PlanId::new("PLN-002").unwrap();
        let nested = locks.with(&a, || locks.with(&b, || 7));
        assert_eq!(nested, 7);
    }
}
