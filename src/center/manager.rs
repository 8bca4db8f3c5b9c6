//! The notification center: subscription bookkeeping and delivery.

use crate::error::{CallbackResult, NotificationError, Result};
use crate::types::{Notification, Payload, SenderId, SubscriptionId};
use crossbeam_channel::{bounded, TrySendError};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

use super::handle::NotificationReceiver;
use super::observer::{ObserverKey, ObserverRef};
use super::table::{Callback, Delivery, DispatchTable, Visit};

/// Notification center configuration.
#[derive(Clone, Debug)]
pub struct CenterConfig {
    /// Tag attached to every log event from this center.
    pub label: String,

    /// Expected number of observers.
    pub initial_capacity: usize,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            initial_capacity: 16,
        }
    }
}

/// Registry of observers, delivering notifications by name.
///
/// Observers are held weakly: dropping the last `Arc` to an observer ends
/// its subscriptions, and the entry is pruned on the next delivery pass that
/// reaches it.
///
/// The table lock is never held while a callback runs, so callbacks may
/// post, subscribe or unsubscribe on the same center. A delivery pass walks
/// the entries and subscriptions that existed when it reached them; anything
/// removed mid-pass is skipped, anything added mid-pass waits for the next
/// post.
pub struct NotificationCenter {
    config: CenterConfig,
    table: Mutex<DispatchTable>,
}

impl NotificationCenter {
    /// Create a center with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CenterConfig::default())
    }

    /// Create a center with an explicit configuration.
    pub fn with_config(config: CenterConfig) -> Self {
        let table = DispatchTable::with_capacity(config.initial_capacity);
        Self {
            config,
            table: Mutex::new(table),
        }
    }

    /// The process-wide center, created on first access.
    pub fn global() -> &'static NotificationCenter {
        static GLOBAL: OnceLock<NotificationCenter> = OnceLock::new();
        GLOBAL.get_or_init(NotificationCenter::new)
    }

    /// Configuration this center was built with.
    pub fn config(&self) -> &CenterConfig {
        &self.config
    }

    // --- Subscribing ---

    /// Register `callback` for notifications named `name`.
    ///
    /// `sender` is recorded for [`unsubscribe_matching`](Self::unsubscribe_matching)
    /// but is not consulted during delivery: a subscription receives every
    /// notification with its name, whoever sent it.
    ///
    /// Subscribing twice with the same arguments delivers twice.
    pub fn subscribe<T, F>(
        &self,
        observer: &Arc<T>,
        name: &str,
        sender: Option<SenderId>,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        T: Send + Sync + 'static,
        F: Fn(&Notification) -> CallbackResult + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(move |notification: &Notification| {
            match callback(notification) {
                Ok(()) => Delivery::Delivered,
                Err(source) => Delivery::Failed(source),
            }
        });
        self.insert(observer, name, sender, callback)
    }

    /// Like [`subscribe`](Self::subscribe), with the observer itself passed to
    /// the callback. The callback is skipped once the observer is gone.
    pub fn subscribe_with<T, F>(
        &self,
        observer: &Arc<T>,
        name: &str,
        sender: Option<SenderId>,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &Notification) -> CallbackResult + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(observer);
        self.subscribe(observer, name, sender, move |notification| {
            match weak.upgrade() {
                Some(observer) => callback(&*observer, notification),
                None => Ok(()),
            }
        })
    }

    /// Forward matching notifications into a bounded channel.
    ///
    /// When the buffer is full the notification is dropped for this receiver.
    /// Once the receiver is dropped, the next matching post removes the
    /// subscription.
    pub fn subscribe_channel<T>(
        &self,
        observer: &Arc<T>,
        name: &str,
        sender: Option<SenderId>,
        capacity: usize,
    ) -> Result<NotificationReceiver>
    where
        T: Send + Sync + 'static,
    {
        if capacity == 0 {
            return Err(NotificationError::InvalidArgument(
                "channel capacity must be at least 1".to_string(),
            ));
        }

        let (tx, rx) = bounded(capacity);
        let label = self.config.label.clone();
        let callback: Callback = Arc::new(move |notification: &Notification| {
            match tx.try_send(notification.clone()) {
                Ok(()) => Delivery::Delivered,
                Err(TrySendError::Full(dropped)) => {
                    tracing::warn!(
                        center = %label,
                        name = dropped.name(),
                        capacity,
                        "channel full, notification dropped"
                    );
                    Delivery::Delivered
                }
                Err(TrySendError::Disconnected(_)) => Delivery::Retire,
            }
        });
        let id = self.insert(observer, name, sender, callback)?;

        Ok(NotificationReceiver { id, receiver: rx })
    }

    fn insert<T>(
        &self,
        observer: &Arc<T>,
        name: &str,
        sender: Option<SenderId>,
        callback: Callback,
    ) -> Result<SubscriptionId>
    where
        T: Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(NotificationError::empty_name());
        }

        let observer = ObserverRef::new(observer);
        let key = observer.key();
        let id = self
            .table
            .lock()
            .insert(observer, name.to_string(), sender, callback);

        tracing::debug!(
            center = %self.config.label,
            observer = ?key,
            name,
            sender = ?sender,
            subscription = %id,
            "subscribed"
        );
        Ok(id)
    }

    // --- Unsubscribing ---

    /// Remove every subscription of `observer`. Unknown observers are ignored.
    pub fn unsubscribe<T>(&self, observer: &Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let key = ObserverKey::of(observer);
        // Bound before use so the lock is released before the entry drops.
        let entry = self.table.lock().remove_observer(key);
        if let Some(entry) = entry {
            let removed = entry.subscriptions.len();
            drop(entry);
            tracing::debug!(center = %self.config.label, observer = ?key, removed, "unsubscribed");
        }
    }

    /// Remove the subscriptions of `observer` matching `name` and/or `sender`.
    ///
    /// With neither filter this is [`unsubscribe`](Self::unsubscribe). An
    /// empty name counts as no name filter.
    pub fn unsubscribe_matching<T>(
        &self,
        observer: &Arc<T>,
        name: Option<&str>,
        sender: Option<SenderId>,
    ) where
        T: Send + Sync + 'static,
    {
        let name = name.filter(|n| !n.is_empty());
        if name.is_none() && sender.is_none() {
            return self.unsubscribe(observer);
        }

        let key = ObserverKey::of(observer);
        let removed = self.table.lock().remove_matching(key, name, sender);
        if !removed.is_empty() {
            let removed = removed.len();
            tracing::debug!(
                center = %self.config.label,
                observer = ?key,
                name,
                sender = ?sender,
                removed,
                "unsubscribed"
            );
        }
    }

    /// Remove a single subscription. Returns false if it was not registered.
    pub fn unsubscribe_id(&self, id: SubscriptionId) -> bool {
        let removed = self.table.lock().remove_subscription(id);
        match removed {
            Some(subscription) => {
                drop(subscription);
                tracing::debug!(center = %self.config.label, subscription = %id, "unsubscribed");
                true
            }
            None => false,
        }
    }

    // --- Posting ---

    /// Deliver `notification` to every subscription registered under its name.
    ///
    /// Delivery follows observer registration order, then subscription
    /// order. A callback error stops the pass and is returned; observers
    /// already notified stay notified.
    pub fn post(&self, notification: &Notification) -> Result<()> {
        let name = notification.name();
        let entry_ids = self.table.lock().entry_ids();
        let mut delivered = 0usize;
        let mut pruned = 0usize;
        let mut retired = 0usize;

        // Every table lookup is its own statement so the guard is gone before
        // a pruned entry or a callback is dropped or invoked.
        for entry_id in entry_ids {
            let visit = self.table.lock().visit(entry_id, name);
            let matching = match visit {
                Visit::Live(ids) => ids,
                Visit::Pruned(entry) => {
                    drop(entry);
                    pruned += 1;
                    continue;
                }
                Visit::Gone => continue,
            };

            for id in matching {
                let visit = self.table.lock().callback(entry_id, id);
                let callback = match visit {
                    Visit::Live(callback) => callback,
                    Visit::Pruned(entry) => {
                        drop(entry);
                        pruned += 1;
                        break;
                    }
                    Visit::Gone => continue,
                };

                match callback(notification) {
                    Delivery::Delivered => delivered += 1,
                    Delivery::Retire => {
                        let removed = self.table.lock().remove_subscription(id);
                        drop(removed);
                        retired += 1;
                    }
                    Delivery::Failed(source) => {
                        tracing::warn!(
                            center = %self.config.label,
                            name,
                            subscription = %id,
                            error = %source,
                            "callback failed, delivery aborted"
                        );
                        return Err(NotificationError::Callback {
                            name: name.to_string(),
                            source,
                        });
                    }
                }
            }
        }

        if pruned > 0 {
            tracing::debug!(center = %self.config.label, pruned, "pruned dropped observers");
        }
        if retired > 0 {
            tracing::debug!(center = %self.config.label, name, retired, "retired closed subscriptions");
        }
        tracing::trace!(center = %self.config.label, name, delivered, "posted");
        Ok(())
    }

    /// Post a notification built from `name` and `sender`.
    pub fn post_name(&self, name: &str, sender: Option<SenderId>) -> Result<()> {
        self.post(&Self::build(name, sender, None)?)
    }

    /// Post a notification built from `name`, `sender` and `payload`.
    pub fn post_with_payload(
        &self,
        name: &str,
        sender: Option<SenderId>,
        payload: Payload,
    ) -> Result<()> {
        self.post(&Self::build(name, sender, Some(payload))?)
    }

    fn build(name: &str, sender: Option<SenderId>, payload: Option<Payload>) -> Result<Notification> {
        let mut notification = Notification::new(name)?;
        if let Some(sender) = sender {
            notification = notification.with_sender(sender);
        }
        if let Some(payload) = payload {
            notification = notification.with_payload(payload);
        }
        Ok(notification)
    }

    // --- Maintenance ---

    /// Remove every entry whose observer was dropped. Returns how many.
    pub fn prune(&self) -> usize {
        let entries = self.table.lock().prune();
        let pruned = entries.len();
        drop(entries);
        if pruned > 0 {
            tracing::debug!(center = %self.config.label, pruned, "pruned dropped observers");
        }
        pruned
    }

    /// Remove all observers.
    pub fn clear(&self) {
        let entries = self.table.lock().clear();
        drop(entries);
    }

    /// Whether `observer` has a subscription for `name`.
    pub fn is_observing<T>(&self, observer: &Arc<T>, name: &str) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.table.lock().contains(ObserverKey::of(observer), name)
    }

    /// Number of observer entries, including dropped ones not yet pruned.
    pub fn observer_count(&self) -> usize {
        self.table.lock().observer_count()
    }

    /// Number of subscriptions, including those of dropped observers not yet pruned.
    pub fn subscription_count(&self) -> usize {
        self.table.lock().subscription_count()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}
