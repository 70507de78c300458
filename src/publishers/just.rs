//! Publishers of at most one value.

use std::iter;
use std::marker::PhantomData;

use crate::completion::{Completion, Never};
use crate::publisher::Publisher;
use crate::publishers::emitter::Emitter;
use crate::subscriber::Subscriber;
use crate::subscription::EmptySubscription;

/// Emits a single value, then finishes.
///
/// ```
/// # use backflow::{Just, PublisherExt};
/// let values: Vec<_> = Just::new("hello").events().collect();
/// assert_eq!(values, vec![Ok("hello")]);
/// ```
pub struct Just<O, F = Never> {
    value: O,
    marker: PhantomData<fn() -> F>,
}

impl<O: Clone, F> Clone for Just<O, F> {
    fn clone(&self) -> Just<O, F> {
        Just {
            value: self.value.clone(),
            marker: PhantomData,
        }
    }
}

impl<O> Just<O, Never> {
    /// A publisher of `value` that cannot fail.
    pub fn new(value: O) -> Just<O, Never> {
        Just::with_failure(value)
    }
}

impl<O, F> Just<O, F> {
    /// A publisher of `value` with an arbitrary failure type.
    ///
    /// Useful to combine with publishers that can fail.
    pub fn with_failure(value: O) -> Just<O, F> {
        Just {
            value,
            marker: PhantomData,
        }
    }
}

impl<O, F> Publisher for Just<O, F>
where
    O: Clone + Send + Sync + 'static,
    F: Send + 'static,
{
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        Emitter::start(subscriber, iter::once(self.value.clone()), Completion::Finished);
    }
}

/// Emits nothing, then finishes.
///
/// `Empty::never()` does not even finish.
pub struct Empty<O, F = Never> {
    complete: bool,
    marker: PhantomData<fn() -> (O, F)>,
}

impl<O, F> Clone for Empty<O, F> {
    fn clone(&self) -> Empty<O, F> {
        Empty {
            complete: self.complete,
            marker: PhantomData,
        }
    }
}

impl<O> Empty<O, Never> {
    /// A publisher that finishes right away.
    pub fn new() -> Empty<O, Never> {
        Empty::with_failure()
    }
}

impl<O> Default for Empty<O, Never> {
    fn default() -> Empty<O, Never> {
        Empty::new()
    }
}

impl<O, F> Empty<O, F> {
    /// A publisher that finishes right away, with an arbitrary failure type.
    pub fn with_failure() -> Empty<O, F> {
        Empty {
            complete: true,
            marker: PhantomData,
        }
    }

    /// A publisher that never emits and never completes.
    pub fn never() -> Empty<O, F> {
        Empty {
            complete: false,
            marker: PhantomData,
        }
    }
}

impl<O, F> Publisher for Empty<O, F>
where
    O: Send + 'static,
    F: Send + 'static,
{
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        subscriber.receive_subscription(EmptySubscription::shared());
        if self.complete {
            subscriber.receive_completion(Completion::Finished);
        }
    }
}

/// Fails right away with an error.
#[derive(Clone)]
pub struct Fail<O, E> {
    error: E,
    marker: PhantomData<fn() -> O>,
}

impl<O, E> Fail<O, E> {
    /// A publisher that fails with `error`.
    pub fn new(error: E) -> Fail<O, E> {
        Fail {
            error,
            marker: PhantomData,
        }
    }
}

impl<O, E> Publisher for Fail<O, E>
where
    O: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = O;
    type Failure = E;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = E>,
    {
        subscriber.receive_subscription(EmptySubscription::shared());
        subscriber.receive_completion(Completion::Failure(self.error.clone()));
    }
}

/// Publishes the outcome of a computation that already happened.
///
/// `Ok(Some(value))` emits the value and finishes, `Ok(None)` just finishes
/// and `Err(error)` fails.
///
/// ```
/// # use backflow::{Once, PublisherExt};
/// let failed: Vec<_> = Once::<i32, _>::new(Err("bad")).events().collect();
/// assert_eq!(failed, vec![Err("bad")]);
/// let nothing: Vec<_> = Once::<i32, ()>::from_option(None).events().collect();
/// assert!(nothing.is_empty());
/// ```
#[derive(Clone)]
pub struct Once<O, F> {
    result: Result<Option<O>, F>,
}

impl<O, F> Once<O, F> {
    /// Publish a result.
    pub fn new(result: Result<O, F>) -> Once<O, F> {
        Once {
            result: result.map(Some),
        }
    }

    /// Publish an optional value, finishing right away if there is none.
    pub fn from_option(value: Option<O>) -> Once<O, F> {
        Once { result: Ok(value) }
    }
}

impl<O, F> Publisher for Once<O, F>
where
    O: Clone + Send + Sync + 'static,
    F: Clone + Send + Sync + 'static,
{
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        match &self.result {
            Ok(value) => Emitter::start(subscriber, value.clone().into_iter(), Completion::Finished),
            Err(error) => {
                Emitter::start(subscriber, None.into_iter(), Completion::Failure(error.clone()))
            }
        }
    }
}
