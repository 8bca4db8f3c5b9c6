//! # Notification Center
//!
//! A publish/subscribe registry for loosely coupled components.
//!
//! ## Core Concepts
//!
//! - **Notifications**: Named events with an optional sender and payload
//! - **Observers**: Objects registering callbacks by notification name, held weakly
//! - **Center**: Owns the dispatch table and delivers synchronously
//!
//! ## Example
//!
//! ```ignore
//! use notification_center::{NotificationCenter, Payload};
//!
//! let center = NotificationCenter::global();
//! let panel = Arc::new(Panel::default());
//!
//! center.subscribe_with(&panel, "socket.connected", None, |panel, n| {
//!     panel.show_status(n.payload());
//!     Ok(())
//! })?;
//!
//! center.post_with_payload(
//!     "socket.connected",
//!     None,
//!     Payload::new().with("host", "127.0.0.1"),
//! )?;
//! ```

pub mod center;
pub mod error;
pub mod types;

// Re-exports
pub use center::{CenterConfig, NotificationCenter, NotificationReceiver, ObserverKey, ObserverRef};
pub use error::{CallbackError, CallbackResult, NotificationError, Result};
pub use types::*;
