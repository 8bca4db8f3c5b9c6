//! Receiving end of a channel subscription.

use crate::types::{Notification, SubscriptionId};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Handle returned by [`NotificationCenter::subscribe_channel`](super::NotificationCenter::subscribe_channel).
///
/// The sending half lives inside the subscription. Once the subscription is
/// removed (unsubscribed, observer dropped and pruned, or the center
/// cleared) and the buffer is drained, receiving reports disconnection.
/// Dropping the handle retires the subscription on its next matching post.
pub struct NotificationReceiver {
    pub(crate) id: SubscriptionId,
    pub(crate) receiver: Receiver<Notification>,
}

impl NotificationReceiver {
    /// Id of the backing subscription, usable with `unsubscribe_id`.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Block for the next notification. `None` once the subscription is gone.
    pub fn recv(&self) -> Option<Notification> {
        self.receiver.recv().ok()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<Notification, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout. `Disconnected` means the subscription is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Notification, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take everything currently buffered.
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// Number of buffered notifications.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
