//! Listener capability contract and non-owning listener handles.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ListenerResult;
use crate::event::EventId;

/// A long-lived object that receives event deliveries.
///
/// `P` is the payload type carried by the dispatcher; payload-less
/// dispatchers use `()`. Implementations may fail by returning `Err` or by
/// panicking. Either way the dispatcher isolates the failure and keeps
/// delivering to the remaining listeners.
///
/// Delivery takes `&self`: a listener that needs to mutate its own state uses
/// interior mutability, which also lets it call back into the dispatcher that
/// is currently delivering to it.
pub trait EventListener<P = ()> {
    /// Called once per dispatch with the dispatcher's identity and payload.
    fn on_event(&self, event: EventId, payload: &P) -> ListenerResult;
}

/// Non-owning reference to a registered listener.
///
/// Two handles are equal iff they point at the same listener object. Holding
/// a handle never keeps the listener alive; the registering party must
/// unsubscribe before dropping the listener.
pub struct ListenerHandle<P = ()> {
    inner: Weak<dyn EventListener<P>>,
}

impl<P> ListenerHandle<P> {
    /// Creates a handle for `listener` without taking ownership of it.
    #[must_use]
    pub fn new<L>(listener: &Rc<L>) -> Self
    where
        L: EventListener<P> + 'static,
    {
        let inner: Weak<L> = Rc::downgrade(listener);
        Self { inner }
    }

    /// Creates a handle from a weak reference, e.g. inside `Rc::new_cyclic`
    /// when a listener needs its own handle.
    #[must_use]
    pub fn from_weak<L>(listener: Weak<L>) -> Self
    where
        L: EventListener<P> + 'static,
    {
        Self { inner: listener }
    }

    /// Creates a handle from an already type-erased listener.
    #[must_use]
    pub fn from_dyn(listener: &Rc<dyn EventListener<P>>) -> Self {
        Self {
            inner: Rc::downgrade(listener),
        }
    }

    /// Returns true if `listener` is the object this handle refers to.
    #[must_use]
    pub fn refers_to<L>(&self, listener: &Rc<L>) -> bool
    where
        L: EventListener<P> + 'static,
    {
        std::ptr::addr_eq(self.inner.as_ptr(), Rc::as_ptr(listener))
    }

    /// Returns true if the listener has already been dropped.
    #[must_use]
    pub fn is_dangling(&self) -> bool {
        self.inner.strong_count() == 0
    }

    /// Delivers one event to the referenced listener.
    ///
    /// Returns `None` when the listener no longer exists.
    pub(crate) fn deliver(&self, event: EventId, payload: &P) -> Option<ListenerResult> {
        let listener = self.inner.upgrade()?;
        Some(listener.on_event(event, payload))
    }
}

impl<P> Clone for ListenerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<P> PartialEq for ListenerHandle<P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl<P> Eq for ListenerHandle<P> {}

impl<P> fmt::Debug for ListenerHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("addr", &self.inner.as_ptr().cast::<()>())
            .field("alive", &!self.is_dangling())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Counter {
        hits: Cell<u32>,
    }

    impl EventListener for Counter {
        fn on_event(&self, _event: EventId, _payload: &()) -> ListenerResult {
            self.hits.set(self.hits.get() + 1);
            Ok(())
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter { hits: Cell::new(0) })
    }

    #[test]
    fn test_handle_identity() {
        let a = counter();
        let b = counter();

        let ha: ListenerHandle = ListenerHandle::new(&a);
        assert_eq!(ha, ListenerHandle::new(&a));
        assert_ne!(ha, ListenerHandle::new(&b));
        assert!(ha.refers_to(&a));
        assert!(!ha.refers_to(&b));
    }

    #[test]
    fn test_handle_from_dyn_matches_concrete() {
        let a = counter();
        let erased: Rc<dyn EventListener> = a.clone();
        assert_eq!(ListenerHandle::from_dyn(&erased), ListenerHandle::new(&a));
    }

    #[test]
    fn test_handle_does_not_own_listener() {
        let a = counter();
        let handle: ListenerHandle = ListenerHandle::new(&a);
        assert_eq!(Rc::strong_count(&a), 1);
        assert!(!handle.is_dangling());

        drop(a);
        assert!(handle.is_dangling());
        assert!(handle.deliver(EventId::new(1), &()).is_none());
    }

    #[test]
    fn test_deliver_calls_listener() {
        let a = counter();
        let handle: ListenerHandle = ListenerHandle::new(&a);
        let result = handle.deliver(EventId::new(1), &());
        assert!(matches!(result, Some(Ok(()))));
        assert_eq!(a.hits.get(), 1);
    }
}
