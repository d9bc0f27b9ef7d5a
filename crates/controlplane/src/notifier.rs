//! Rate-limited change delivery for one consumer.
//!
//! A [`ChangeNotifier`] holds a table of subscriptions, each a comparator
//! plus its delivery state. Changes are recorded as they happen; delivery
//! only happens from [`ChangeNotifier::tick`]:
//!
//! - **Heartbeat**: once `min_update_period` has passed since the last
//!   delivery, everything the comparator matches is delivered.
//! - **Latency**: otherwise, pending changes are delivered once
//!   `max_update_period` has passed since the last delivery.
//!
//! A period of zero disables its path. Callbacks run after the notifier's
//! lock is released and may call back into the notifier.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info_span};

use crate::comparator::ControlIdentityComparator;
use crate::identity::ControlIdentity;
use crate::Milliseconds;

/// Default global throttle between two scans of a notifier.
pub const DEFAULT_MIN_SCAN_PERIOD: Milliseconds = 30;

/// Receives `(now, comparator, delivered identities)`.
pub type ChangeCallback =
    Arc<dyn Fn(Milliseconds, &ControlIdentityComparator, &BTreeSet<ControlIdentity>) + Send + Sync>;

/// Delivery state of one subscription.
#[derive(Clone)]
pub struct ChangeNotificationState {
    pub max_update_period: Milliseconds,
    pub min_update_period: Milliseconds,
    pub last_change: Milliseconds,
    pub last_acknowledged: Milliseconds,
    pub changed: BTreeSet<ControlIdentity>,
    callback: ChangeCallback,
}

impl ChangeNotificationState {
    fn new(max_update_period: Milliseconds, min_update_period: Milliseconds, now: Milliseconds, callback: ChangeCallback) -> Self {
        Self {
            max_update_period,
            min_update_period,
            last_change: 0,
            last_acknowledged: now,
            changed: BTreeSet::new(),
            callback,
        }
    }

    fn heartbeat_due(&self, now: Milliseconds) -> bool {
        self.min_update_period != 0 && now.saturating_sub(self.last_acknowledged) >= self.min_update_period
    }

    fn latency_due(&self, now: Milliseconds) -> bool {
        !self.changed.is_empty()
            && self.max_update_period != 0
            && now.saturating_sub(self.last_acknowledged) >= self.max_update_period
    }
}

impl fmt::Debug for ChangeNotificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotificationState")
            .field("max_update_period", &self.max_update_period)
            .field("min_update_period", &self.min_update_period)
            .field("last_change", &self.last_change)
            .field("last_acknowledged", &self.last_acknowledged)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

struct Subscriptions {
    last_scan: Milliseconds,
    // comparators are mutable keys, so this is a list searched by ordering
    entries: Vec<(ControlIdentityComparator, ChangeNotificationState)>,
}

pub struct ChangeNotifier {
    id: u64,
    min_scan_period: Milliseconds,
    inner: Mutex<Subscriptions>,
}

struct Delivery {
    callback: ChangeCallback,
    comparator: ControlIdentityComparator,
    items: BTreeSet<ControlIdentity>,
}

impl ChangeNotifier {
    pub fn new(id: u64, min_scan_period: Milliseconds) -> Self {
        Self {
            id,
            min_scan_period,
            inner: Mutex::new(Subscriptions {
                last_scan: 0,
                entries: Vec::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn min_scan_period(&self) -> Milliseconds {
        self.min_scan_period
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the identities `comparator` matches. An existing
    /// subscription for an equal comparator is replaced.
    pub fn add_subscription<F>(
        &self,
        comparator: ControlIdentityComparator,
        max_update_period: Milliseconds,
        min_update_period: Milliseconds,
        now: Milliseconds,
        callback: F,
    ) where
        F: Fn(Milliseconds, &ControlIdentityComparator, &BTreeSet<ControlIdentity>) + Send + Sync + 'static,
    {
        let state = ChangeNotificationState::new(max_update_period, min_update_period, now, Arc::new(callback));
        debug!(notifier = self.id, %comparator, max_update_period, min_update_period, "subscribe");
        let mut inner = self.lock();
        match inner.entries.iter_mut().find(|(c, _)| *c == comparator) {
            Some(entry) => *entry = (comparator, state),
            None => inner.entries.push((comparator, state)),
        }
    }

    /// Returns whether a subscription was removed.
    pub fn remove_subscription(&self, comparator: &ControlIdentityComparator) -> bool {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|(c, _)| c != comparator);
        before != inner.entries.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Delivery state of the subscription for `comparator`.
    pub fn subscription_state(&self, comparator: &ControlIdentityComparator) -> Option<ChangeNotificationState> {
        self.lock()
            .entries
            .iter()
            .find(|(c, _)| c == comparator)
            .map(|(_, s)| s.clone())
    }

    /// Record a change for every subscription matching `identity`.
    pub fn control_changed(&self, now: Milliseconds, identity: ControlIdentity) {
        let mut inner = self.lock();
        for (comparator, state) in inner.entries.iter_mut() {
            if comparator.contains(&identity) {
                state.last_change = now;
                state.changed.insert(identity);
            }
        }
    }

    /// Deliver every subscription that is due. Does nothing until
    /// `min_scan_period` has passed since the previous scan.
    pub fn tick(&self, now: Milliseconds) {
        let _span = info_span!("tick", notifier = self.id, now).entered();
        let deliveries = {
            let mut inner = self.lock();
            if now <= inner.last_scan.saturating_add(self.min_scan_period) {
                return;
            }
            inner.last_scan = now;

            let mut due = Vec::new();
            for (comparator, state) in inner.entries.iter_mut() {
                let items = if state.heartbeat_due(now) {
                    comparator.matched()
                } else if state.latency_due(now) {
                    std::mem::take(&mut state.changed)
                } else {
                    continue;
                };
                state.last_acknowledged = now;
                state.changed.clear();
                due.push(Delivery {
                    callback: Arc::clone(&state.callback),
                    comparator: comparator.clone(),
                    items,
                });
            }
            due
        };

        for delivery in deliveries {
            debug!(comparator = %delivery.comparator, delivered = delivery.items.len(), "deliver");
            (delivery.callback)(now, &delivery.comparator, &delivery.items);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("id", &self.id)
            .field("min_scan_period", &self.min_scan_period)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        writeln!(
            f,
            "notifier {} last_scan={} min_scan={}",
            self.id, inner.last_scan, self.min_scan_period
        )?;
        for (comparator, state) in &inner.entries {
            writeln!(
                f,
                "  {}: max={} min={} last_change={} last_ack={} pending={}",
                comparator,
                state.max_update_period,
                state.min_update_period,
                state.last_change,
                state.last_acknowledged,
                state.changed.len()
            )?;
        }
        Ok(())
    }
}
