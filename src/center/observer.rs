//! Weak observer handles.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

/// Identity of an observer object: the address of its `Arc` allocation.
///
/// Unique for as long as an `ObserverRef` to the allocation exists, since a
/// `Weak` keeps the allocation itself from being reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(usize);

impl ObserverKey {
    /// Key of the allocation behind `observer`.
    pub fn of<T: Send + Sync + 'static>(observer: &Arc<T>) -> Self {
        ObserverKey(Arc::as_ptr(observer) as *const () as usize)
    }
}

impl fmt::Debug for ObserverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observer({:#x})", self.0)
    }
}

/// Non-owning reference to an observer. Never keeps the observer alive.
#[derive(Clone)]
pub struct ObserverRef {
    key: ObserverKey,
    handle: Weak<dyn Any + Send + Sync>,
}

impl ObserverRef {
    /// Weak reference to `observer`.
    pub fn new<T: Send + Sync + 'static>(observer: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(observer);
        Self {
            key: ObserverKey::of(observer),
            handle: weak,
        }
    }

    /// Identity of the referenced observer.
    pub fn key(&self) -> ObserverKey {
        self.key
    }

    /// Whether the observer still has at least one strong owner.
    pub fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }
}

impl fmt::Debug for ObserverRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRef")
            .field("key", &self.key)
            .field("alive", &self.is_alive())
            .finish()
    }
}
