//! Observer registry with name-filtered delivery.
//!
//! Observers register callbacks under a notification name. Posting a
//! notification invokes every callback registered under its name, in the
//! order observers first subscribed.
//!
//! The center holds observers weakly:
//! - dropping an observer ends its subscriptions
//! - dead entries are pruned lazily during delivery, or eagerly via `prune`
//!
//! # Example
//!
//! ```
//! use notification_center::{NotificationCenter, SenderId};
//! use std::sync::Arc;
//!
//! let center = NotificationCenter::new();
//! let observer = Arc::new(());
//!
//! center.subscribe(&observer, "login", None, |n| {
//!     println!("{} signed in", n);
//!     Ok(())
//! })?;
//!
//! center.post_name("login", Some(SenderId::new(1)))?;
//! center.unsubscribe(&observer);
//! # Ok::<(), notification_center::NotificationError>(())
//! ```

mod handle;
mod manager;
mod observer;
mod table;

pub use handle::NotificationReceiver;
pub use manager::{CenterConfig, NotificationCenter};
pub use observer::{ObserverKey, ObserverRef};
