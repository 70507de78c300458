//! Scoped cancellation handles.

use std::fmt;
use std::sync::Mutex;

use crate::lock;

/// Something that can be cancelled.
pub trait Cancellable: Send + Sync {
    /// Cancel the activity. Calling this more than once has no effect.
    fn cancel(&self);
}

impl<C: Cancellable + ?Sized> Cancellable for std::sync::Arc<C> {
    fn cancel(&self) {
        (**self).cancel()
    }
}

type Cancel = Box<dyn FnOnce() + Send + 'static>;

/// A handle that cancels a subscription when dropped.
///
/// Terminal operators like `sink` return one of these. Keep it alive for as
/// long as values should keep arriving:
///
/// ```
/// # use backflow::{PassthroughSubject, Never, PublisherExt};
/// # use std::sync::{Arc, Mutex};
/// let subject = PassthroughSubject::<i32, Never>::new();
/// let seen = Arc::new(Mutex::new(vec![]));
/// let store = seen.clone();
/// let handle = subject.sink_values(move |x| store.lock().unwrap().push(x));
/// subject.send(1);
/// drop(handle);
/// subject.send(2);
/// assert_eq!(*seen.lock().unwrap(), vec![1]);
/// ```
pub struct AnyCancellable {
    cancel: Mutex<Option<Cancel>>,
}

impl AnyCancellable {
    /// Wrap a cancellable.
    pub fn new<C: Cancellable + 'static>(cancellable: C) -> AnyCancellable {
        AnyCancellable::from_fn(move || cancellable.cancel())
    }

    /// Run a closure once, on cancel or on drop.
    pub fn from_fn<F: FnOnce() + Send + 'static>(cancel: F) -> AnyCancellable {
        AnyCancellable {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A handle that does nothing.
    pub fn empty() -> AnyCancellable {
        AnyCancellable {
            cancel: Mutex::new(None),
        }
    }

    /// Whether the handle has already been used.
    pub fn is_cancelled(&self) -> bool {
        lock(&self.cancel).is_none()
    }

    /// Move the handle into a collection that keeps it alive.
    pub fn store_in<E: Extend<AnyCancellable>>(self, collection: &mut E) {
        collection.extend(Some(self));
    }
}

impl Cancellable for AnyCancellable {
    fn cancel(&self) {
        let cancel = lock(&self.cancel).take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }
}

impl Drop for AnyCancellable {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for AnyCancellable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyCancellable")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, AnyCancellable) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let handle = AnyCancellable::from_fn(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, handle)
    }

    #[test]
    fn cancels_once() {
        let (count, handle) = counter();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancels_on_drop() {
        let (count, handle) = counter();
        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn store_in_keeps_alive() {
        let (count, handle) = counter();
        let mut bag = Vec::new();
        handle.store_in(&mut bag);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bag.clear();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wraps_cancellable() {
        let (count, inner) = counter();
        let outer = AnyCancellable::new(inner);
        outer.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
