//! Registry of change notifiers, one per protocol session.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::identity::ControlIdentity;
use crate::notifier::ChangeNotifier;
use crate::Milliseconds;

/// Fans changes and ticks out to every registered [`ChangeNotifier`].
///
/// While a [`ChangeNotifierManagerHold`] is alive, ticking is suppressed, so
/// a batch of writes reaches subscribers as one delivery.
#[derive(Debug, Default)]
pub struct ChangeNotifierManager {
    notifiers: Mutex<BTreeMap<u64, Arc<ChangeNotifier>>>,
    hold_count: AtomicU32,
    next_id: AtomicU64,
}

impl ChangeNotifierManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<ChangeNotifier>>> {
        self.notifiers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<ChangeNotifier>> {
        self.lock().values().cloned().collect()
    }

    /// Allocate a notifier id from this manager's counter.
    pub fn next_notifier_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create and register a notifier.
    pub fn create_notifier(&self, min_scan_period: Milliseconds) -> Arc<ChangeNotifier> {
        let notifier = Arc::new(ChangeNotifier::new(self.next_notifier_id(), min_scan_period));
        self.add_change_notifier(Arc::clone(&notifier));
        notifier
    }

    pub fn add_change_notifier(&self, notifier: Arc<ChangeNotifier>) -> u64 {
        let id = notifier.id();
        info!(notifier = id, "notifier registered");
        self.lock().insert(id, notifier);
        id
    }

    pub fn remove_change_notifier(&self, id: u64) -> Option<Arc<ChangeNotifier>> {
        let removed = self.lock().remove(&id);
        if removed.is_some() {
            info!(notifier = id, "notifier removed");
        }
        removed
    }

    pub fn notifier_count(&self) -> usize {
        self.lock().len()
    }

    pub fn control_changed(&self, now: Milliseconds, identity: ControlIdentity) {
        for notifier in self.snapshot() {
            notifier.control_changed(now, identity);
        }
    }

    /// Tick every notifier, unless a hold is active.
    pub fn tick(&self, now: Milliseconds) {
        if self.hold_count() > 0 {
            debug!(now, "tick held");
            return;
        }
        for notifier in self.snapshot() {
            notifier.tick(now);
        }
    }

    /// Suppress ticking until the returned guard is dropped. Holds nest.
    pub fn hold(&self) -> ChangeNotifierManagerHold<'_> {
        self.hold_count.fetch_add(1, Ordering::AcqRel);
        ChangeNotifierManagerHold { manager: self }
    }

    pub fn hold_count(&self) -> u32 {
        self.hold_count.load(Ordering::Acquire)
    }
}

/// Scoped suppression of [`ChangeNotifierManager::tick`].
#[must_use = "the hold is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ChangeNotifierManagerHold<'a> {
    manager: &'a ChangeNotifierManager,
}

impl Drop for ChangeNotifierManagerHold<'_> {
    fn drop(&mut self) {
        self.manager.hold_count.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ControlIdentityComparator;
    use std::sync::atomic::AtomicUsize;

    fn id(index: u16) -> ControlIdentity {
        ControlIdentity::descriptor(0x1a, index)
    }

    #[test]
    fn test_notifier_ids_are_per_manager() {
        let a = ChangeNotifierManager::new();
        let b = ChangeNotifierManager::new();
        assert_eq!(a.create_notifier(0).id(), 0);
        assert_eq!(a.create_notifier(0).id(), 1);
        assert_eq!(b.create_notifier(0).id(), 0);
        assert_eq!(a.notifier_count(), 2);
        assert!(a.remove_change_notifier(0).is_some());
        assert!(a.remove_change_notifier(0).is_none());
        assert_eq!(a.notifier_count(), 1);
    }

    #[test]
    fn test_fan_out() {
        let manager = ChangeNotifierManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let n = manager.create_notifier(0);
            let count = Arc::clone(&count);
            n.add_subscription(ControlIdentityComparator::unique(id(1)), 10, 0, 0, move |_, _, _| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        manager.control_changed(0, id(1));
        manager.tick(10);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_hold_suppresses_tick() {
        let manager = ChangeNotifierManager::new();
        let count = Arc::new(AtomicUsize::new(0));
        let n = manager.create_notifier(0);
        let c = Arc::clone(&count);
        n.add_subscription(ControlIdentityComparator::unique(id(1)), 10, 0, 0, move |_, _, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        manager.control_changed(0, id(1));
        {
            let _outer = manager.hold();
            {
                let _inner = manager.hold();
                assert_eq!(manager.hold_count(), 2);
                manager.tick(20);
            }
            manager.tick(30);
            assert_eq!(count.load(Ordering::SeqCst), 0);
        }
        assert_eq!(manager.hold_count(), 0);
        manager.tick(40);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
