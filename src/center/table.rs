//! Dispatch table: observers and their subscriptions.

use crate::error::CallbackError;
use crate::types::{Notification, SenderId, SubscriptionId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::observer::{ObserverKey, ObserverRef};

/// What a callback asks of the center after a delivery.
pub(crate) enum Delivery {
    Delivered,
    /// The subscription can never deliver again and should be removed.
    Retire,
    Failed(CallbackError),
}

/// Shared subscriber callback.
pub(crate) type Callback = Arc<dyn Fn(&Notification) -> Delivery + Send + Sync>;

/// One registered interest of an observer.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) name: String,
    pub(crate) sender: Option<SenderId>,
    pub(crate) callback: Callback,
}

impl Subscription {
    /// Removal filter. Either side being `None` matches anything.
    fn matches_filter(&self, name: Option<&str>, sender: Option<SenderId>) -> bool {
        name.map_or(true, |n| self.name == n) && sender.map_or(true, |s| self.sender == Some(s))
    }
}

/// All subscriptions of a single observer.
pub(crate) struct SubscriberEntry {
    pub(crate) observer: ObserverRef,
    pub(crate) subscriptions: Vec<Subscription>,
}

/// Result of looking up an entry during a delivery pass.
pub(crate) enum Visit<T> {
    /// Entry was removed since the pass started.
    Gone,
    /// Entry's observer was dropped; the entry has been taken out of the table.
    Pruned(SubscriberEntry),
    Live(T),
}

/// Entries keyed by a monotonic entry id, so iteration follows the order in
/// which observers first subscribed.
pub(crate) struct DispatchTable {
    entries: BTreeMap<u64, SubscriberEntry>,
    by_observer: HashMap<ObserverKey, u64>,
    next_entry: u64,
    next_subscription: u64,
}

impl DispatchTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_observer: HashMap::with_capacity(capacity),
            next_entry: 1,
            next_subscription: 1,
        }
    }

    /// Append a subscription, creating the observer's entry if needed.
    pub(crate) fn insert(
        &mut self,
        observer: ObserverRef,
        name: String,
        sender: Option<SenderId>,
        callback: Callback,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        let entry_id = match self.by_observer.get(&observer.key()) {
            Some(&entry_id) => entry_id,
            None => {
                let entry_id = self.next_entry;
                self.next_entry += 1;
                self.by_observer.insert(observer.key(), entry_id);
                self.entries.insert(
                    entry_id,
                    SubscriberEntry {
                        observer,
                        subscriptions: Vec::new(),
                    },
                );
                entry_id
            }
        };

        if let Some(entry) = self.entries.get_mut(&entry_id) {
            entry.subscriptions.push(Subscription {
                id,
                name,
                sender,
                callback,
            });
        }

        id
    }

    // Removed values are handed back rather than dropped here: callbacks may
    // own values whose `Drop` re-enters the center, so they must outlive the
    // table lock.

    /// Take out an observer's whole entry.
    pub(crate) fn remove_observer(&mut self, key: ObserverKey) -> Option<SubscriberEntry> {
        let entry_id = self.by_observer.remove(&key)?;
        self.entries.remove(&entry_id)
    }

    /// Take out an observer's subscriptions matching the filter. An entry
    /// left empty is removed as well.
    pub(crate) fn remove_matching(
        &mut self,
        key: ObserverKey,
        name: Option<&str>,
        sender: Option<SenderId>,
    ) -> Vec<Subscription> {
        let Some(&entry_id) = self.by_observer.get(&key) else {
            return Vec::new();
        };
        let Some(entry) = self.entries.get_mut(&entry_id) else {
            return Vec::new();
        };

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut entry.subscriptions)
            .into_iter()
            .partition(|sub| sub.matches_filter(name, sender));
        entry.subscriptions = kept;

        if entry.subscriptions.is_empty() {
            self.remove_entry(entry_id);
        }
        removed
    }

    /// Take out a single subscription by id.
    pub(crate) fn remove_subscription(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let (entry_id, removed, now_empty) =
            self.entries.iter_mut().find_map(|(&entry_id, entry)| {
                let pos = entry.subscriptions.iter().position(|sub| sub.id == id)?;
                let removed = entry.subscriptions.remove(pos);
                Some((entry_id, removed, entry.subscriptions.is_empty()))
            })?;

        if now_empty {
            self.remove_entry(entry_id);
        }
        Some(removed)
    }

    fn remove_entry(&mut self, entry_id: u64) -> Option<SubscriberEntry> {
        let entry = self.entries.remove(&entry_id)?;
        self.by_observer.remove(&entry.observer.key());
        Some(entry)
    }

    /// Take out every entry whose observer was dropped.
    pub(crate) fn prune(&mut self) -> Vec<SubscriberEntry> {
        let dead: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.observer.is_alive())
            .map(|(&entry_id, _)| entry_id)
            .collect();

        dead.into_iter()
            .filter_map(|entry_id| self.remove_entry(entry_id))
            .collect()
    }

    /// Take out every entry.
    pub(crate) fn clear(&mut self) -> BTreeMap<u64, SubscriberEntry> {
        self.by_observer.clear();
        std::mem::take(&mut self.entries)
    }

    /// Entry ids in delivery order.
    pub(crate) fn entry_ids(&self) -> Vec<u64> {
        self.entries.keys().copied().collect()
    }

    /// Ids of an entry's subscriptions for `name`, pruning the entry if its
    /// observer is gone.
    pub(crate) fn visit(&mut self, entry_id: u64, name: &str) -> Visit<Vec<SubscriptionId>> {
        let Some(entry) = self.entries.get(&entry_id) else {
            return Visit::Gone;
        };
        if !entry.observer.is_alive() {
            return self.remove_entry(entry_id).map_or(Visit::Gone, Visit::Pruned);
        }

        Visit::Live(
            entry
                .subscriptions
                .iter()
                .filter(|sub| sub.name == name)
                .map(|sub| sub.id)
                .collect(),
        )
    }

    /// Callback of a subscription that is still registered, pruning the
    /// entry if its observer is gone.
    pub(crate) fn callback(&mut self, entry_id: u64, id: SubscriptionId) -> Visit<Callback> {
        let Some(entry) = self.entries.get(&entry_id) else {
            return Visit::Gone;
        };
        if !entry.observer.is_alive() {
            return self.remove_entry(entry_id).map_or(Visit::Gone, Visit::Pruned);
        }

        match entry.subscriptions.iter().find(|sub| sub.id == id) {
            Some(sub) => Visit::Live(Arc::clone(&sub.callback)),
            None => Visit::Gone,
        }
    }

    pub(crate) fn contains(&self, key: ObserverKey, name: &str) -> bool {
        self.by_observer
            .get(&key)
            .and_then(|entry_id| self.entries.get(entry_id))
            .is_some_and(|entry| entry.subscriptions.iter().any(|sub| sub.name == name))
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| entry.subscriptions.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callback {
        Arc::new(|_: &Notification| Delivery::Delivered)
    }

    #[test]
    fn test_one_entry_per_observer() {
        let mut table = DispatchTable::with_capacity(4);
        let observer = Arc::new(());

        table.insert(ObserverRef::new(&observer), "a".into(), None, noop());
        table.insert(ObserverRef::new(&observer), "b".into(), None, noop());

        assert_eq!(table.observer_count(), 1);
        assert_eq!(table.subscription_count(), 2);
    }

    #[test]
    fn test_entry_order_follows_first_subscription() {
        let mut table = DispatchTable::with_capacity(4);
        let first = Arc::new(1u8);
        let second = Arc::new(2u8);

        table.insert(ObserverRef::new(&first), "a".into(), None, noop());
        table.insert(ObserverRef::new(&second), "a".into(), None, noop());
        table.insert(ObserverRef::new(&first), "b".into(), None, noop());

        let ids = table.entry_ids();
        assert_eq!(ids.len(), 2);
        assert!(matches!(table.visit(ids[0], "b"), Visit::Live(subs) if subs.len() == 1));
        assert!(matches!(table.visit(ids[1], "b"), Visit::Live(subs) if subs.is_empty()));
    }

    #[test]
    fn test_remove_matching_drops_empty_entry() {
        let mut table = DispatchTable::with_capacity(4);
        let observer = Arc::new(());
        let key = ObserverKey::of(&observer);

        table.insert(ObserverRef::new(&observer), "a".into(), None, noop());
        assert_eq!(table.remove_matching(key, Some("a"), None).len(), 1);
        assert_eq!(table.observer_count(), 0);
        assert!(!table.contains(key, "a"));
    }

    #[test]
    fn test_visit_prunes_dead_entry() {
        let mut table = DispatchTable::with_capacity(4);
        let observer = Arc::new(());
        table.insert(ObserverRef::new(&observer), "a".into(), None, noop());
        let ids = table.entry_ids();

        drop(observer);
        assert!(matches!(table.visit(ids[0], "a"), Visit::Pruned(_)));
        assert!(matches!(table.visit(ids[0], "a"), Visit::Gone));
        assert_eq!(table.observer_count(), 0);
    }

    #[test]
    fn test_remove_subscription_by_id() {
        let mut table = DispatchTable::with_capacity(4);
        let observer = Arc::new(());
        let a = table.insert(ObserverRef::new(&observer), "a".into(), None, noop());
        let b = table.insert(ObserverRef::new(&observer), "b".into(), None, noop());

        assert_eq!(table.remove_subscription(a).map(|sub| sub.id), Some(a));
        assert!(table.remove_subscription(a).is_none());
        assert_eq!(table.subscription_count(), 1);

        assert!(table.remove_subscription(b).is_some());
        assert_eq!(table.observer_count(), 0);
    }

    #[test]
    fn test_removals_hand_back_callbacks() {
        let mut table = DispatchTable::with_capacity(4);
        let kept = Arc::new(1u8);
        let dropped = Arc::new(2u8);
        let callback = noop();

        table.insert(ObserverRef::new(&kept), "a".into(), None, Arc::clone(&callback));
        table.insert(ObserverRef::new(&dropped), "a".into(), None, Arc::clone(&callback));
        drop(dropped);

        let pruned = table.prune();
        assert_eq!(pruned.len(), 1);
        assert_eq!(Arc::strong_count(&callback), 3);
        drop(pruned);
        assert_eq!(Arc::strong_count(&callback), 2);

        let cleared = table.clear();
        assert_eq!(cleared.len(), 1);
        assert_eq!(table.observer_count(), 0);
        assert_eq!(Arc::strong_count(&callback), 2);
    }
}
