//! The producer side of the protocol.

use std::sync::Arc;

use crate::subscriber::{AnySubscriber, Subscriber};

/// A producer of values.
///
/// Each call to `subscribe` wires up a fresh, independent subscription for
/// the given subscriber. The publisher itself holds no per-subscription
/// state, which is why `subscribe` only needs `&self`.
///
/// The subscriber receives its subscription through `receive_subscription`
/// before anything else, either during `subscribe` or later from another
/// thread.
pub trait Publisher: Send + Sync + 'static {
    /// The type of values produced.
    type Output: Send + 'static;
    /// The type of error that may end a subscription.
    type Failure: Send + 'static;

    /// Attach a subscriber.
    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = Self::Output, Failure = Self::Failure>;
}

impl<P: Publisher> Publisher for Arc<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        (**self).subscribe(subscriber)
    }
}

/// Object safe counterpart of `Publisher`.
trait ErasedPublisher<O, F>: Send + Sync {
    fn subscribe_erased(&self, subscriber: AnySubscriber<O, F>);
}

impl<P: Publisher> ErasedPublisher<P::Output, P::Failure> for P {
    fn subscribe_erased(&self, subscriber: AnySubscriber<P::Output, P::Failure>) {
        self.subscribe(subscriber)
    }
}

/// A publisher with its concrete type erased.
///
/// Useful to return pipelines from functions or to store publishers of
/// different shapes together. Cloning is cheap.
///
/// ```
/// # use backflow::{AnyPublisher, Just, Never, PublisherExt};
/// fn numbers(double: bool) -> AnyPublisher<i32, Never> {
///     if double {
///         Just::new(4).map(|x| x * 2).erase()
///     } else {
///         Just::new(4).erase()
///     }
/// }
/// assert_eq!(numbers(true).events().next(), Some(Ok(8)));
/// ```
pub struct AnyPublisher<O, F> {
    inner: Arc<dyn ErasedPublisher<O, F>>,
}

impl<O, F> Clone for AnyPublisher<O, F> {
    fn clone(&self) -> AnyPublisher<O, F> {
        AnyPublisher {
            inner: self.inner.clone(),
        }
    }
}

impl<O: Send + 'static, F: Send + 'static> AnyPublisher<O, F> {
    /// Erase the type of a publisher.
    pub fn new<P>(publisher: P) -> AnyPublisher<O, F>
    where
        P: Publisher<Output = O, Failure = F>,
    {
        AnyPublisher {
            inner: Arc::new(publisher),
        }
    }
}

impl<O: Send + 'static, F: Send + 'static> Publisher for AnyPublisher<O, F> {
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        self.inner.subscribe_erased(Arc::new(subscriber))
    }
}
