//! The consumer side of the protocol.

use std::sync::Arc;

use crate::completion::Completion;
use crate::demand::Demand;
use crate::subscription::Subscription;

/// A consumer of values from a publisher.
///
/// For every subscription the calls arrive in this order: exactly one
/// `receive_subscription`, then any number of `receive`, then at most one
/// `receive_completion`. Nothing follows the completion.
///
/// Subscribers are shared between the upstream that feeds them and the
/// handles that may cancel them, so every method takes `&self` and the type
/// must be `Send + Sync`.
pub trait Subscriber: Send + Sync + 'static {
    /// The type of values received.
    type Input: Send + 'static;
    /// The type of error that may end the subscription.
    type Failure: Send + 'static;

    /// Accept the subscription from upstream.
    ///
    /// The subscriber requests demand through it; nothing is sent before a
    /// request.
    fn receive_subscription(&self, subscription: Arc<dyn Subscription>);

    /// Accept a value and return how much *additional* demand to add.
    fn receive(&self, input: Self::Input) -> Demand;

    /// Accept the terminal signal.
    fn receive_completion(&self, completion: Completion<Self::Failure>);
}

impl<S: Subscriber + ?Sized> Subscriber for Arc<S> {
    type Input = S::Input;
    type Failure = S::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        (**self).receive_subscription(subscription)
    }

    fn receive(&self, input: S::Input) -> Demand {
        (**self).receive(input)
    }

    fn receive_completion(&self, completion: Completion<S::Failure>) {
        (**self).receive_completion(completion)
    }
}

impl<S: Subscriber + ?Sized> Subscriber for Box<S> {
    type Input = S::Input;
    type Failure = S::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        (**self).receive_subscription(subscription)
    }

    fn receive(&self, input: S::Input) -> Demand {
        (**self).receive(input)
    }

    fn receive_completion(&self, completion: Completion<S::Failure>) {
        (**self).receive_completion(completion)
    }
}

/// A type-erased subscriber.
pub type AnySubscriber<I, F> = Arc<dyn Subscriber<Input = I, Failure = F>>;

/// Erase the type of a subscriber.
pub fn erase<S: Subscriber>(subscriber: S) -> AnySubscriber<S::Input, S::Failure> {
    Arc::new(subscriber)
}
