//! Value transformations.

use std::sync::Arc;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Transforms every value with a function.
#[derive(Clone)]
pub struct Map<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> Map<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> Map<P, F> {
        Map {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

struct MapOp<F> {
    transform: Arc<F>,
}

impl<I, E, O, F> Operator<I, E> for MapOp<F>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    type Output = O;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<O, E> {
        Step::Send((self.transform)(input))
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<O>, Completion<E>) {
        (None, completion)
    }
}

impl<P, F, O> Publisher for Map<P, F>
where
    P: Publisher,
    F: Fn(P::Output) -> O + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = P::Failure>,
    {
        let op = MapOp {
            transform: self.transform.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Transforms every value with a function that may fail.
///
/// The first error cancels upstream and ends the stream with that error.
#[derive(Clone)]
pub struct TryMap<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> TryMap<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> TryMap<P, F> {
        TryMap {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

struct TryMapOp<F> {
    transform: Arc<F>,
}

impl<I, E, O, F> Operator<I, E> for TryMapOp<F>
where
    F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    O: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = O;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<O, anyhow::Error> {
        match (self.transform)(input) {
            Ok(output) => Step::Send(output),
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<O>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P, F, O> Publisher for TryMap<P, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    F: Fn(P::Output) -> anyhow::Result<O> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = anyhow::Error>,
    {
        let op = TryMapOp {
            transform: self.transform.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Transforms the failure of a stream.
#[derive(Clone)]
pub struct MapError<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> MapError<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> MapError<P, F> {
        MapError {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

struct MapErrorOp<F> {
    transform: Arc<F>,
}

impl<I, E, E2, F> Operator<I, E> for MapErrorOp<F>
where
    F: Fn(E) -> E2 + Send + Sync + 'static,
    I: Send + 'static,
    E2: Send + 'static,
{
    type Output = I;
    type Failure = E2;

    fn receive(&mut self, input: I) -> Step<I, E2> {
        Step::Send(input)
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<I>, Completion<E2>) {
        (None, completion.map_error(|error| (self.transform)(error)))
    }
}

impl<P, F, E2> Publisher for MapError<P, F>
where
    P: Publisher,
    F: Fn(P::Failure) -> E2 + Send + Sync + 'static,
    E2: Send + 'static,
{
    type Output = P::Output;
    type Failure = E2;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = E2>,
    {
        let op = MapErrorOp {
            transform: self.transform.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Replaces `None` values with a default.
#[derive(Clone)]
pub struct ReplaceNil<P, O> {
    upstream: P,
    default: O,
}

impl<P, O> ReplaceNil<P, O> {
    pub(crate) fn new(upstream: P, default: O) -> ReplaceNil<P, O> {
        ReplaceNil { upstream, default }
    }
}

struct ReplaceNilOp<O> {
    default: O,
}

impl<E, O> Operator<Option<O>, E> for ReplaceNilOp<O>
where
    O: Clone + Send + 'static,
    E: Send + 'static,
{
    type Output = O;
    type Failure = E;

    fn receive(&mut self, input: Option<O>) -> Step<O, E> {
        Step::Send(input.unwrap_or_else(|| self.default.clone()))
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<O>, Completion<E>) {
        (None, completion)
    }
}

impl<P, O> Publisher for ReplaceNil<P, O>
where
    P: Publisher<Output = Option<O>>,
    O: Clone + Send + Sync + 'static,
{
    type Output = O;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = P::Failure>,
    {
        let op = ReplaceNilOp {
            default: self.default.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Transforms values and drops those mapped to `None`.
#[derive(Clone)]
pub struct CompactMap<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> CompactMap<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> CompactMap<P, F> {
        CompactMap {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

struct CompactMapOp<F> {
    transform: Arc<F>,
}

impl<I, E, O, F> Operator<I, E> for CompactMapOp<F>
where
    F: Fn(I) -> Option<O> + Send + Sync + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    type Output = O;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<O, E> {
        match (self.transform)(input) {
            Some(output) => Step::Send(output),
            None => Step::Skip,
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<O>, Completion<E>) {
        (None, completion)
    }
}

impl<P, F, O> Publisher for CompactMap<P, F>
where
    P: Publisher,
    F: Fn(P::Output) -> Option<O> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = P::Failure>,
    {
        let op = CompactMapOp {
            transform: self.transform.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `CompactMap`, with a transform that may fail.
#[derive(Clone)]
pub struct TryCompactMap<P, F> {
    upstream: P,
    transform: Arc<F>,
}

impl<P, F> TryCompactMap<P, F> {
    pub(crate) fn new(upstream: P, transform: F) -> TryCompactMap<P, F> {
        TryCompactMap {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

struct TryCompactMapOp<F> {
    transform: Arc<F>,
}

impl<I, E, O, F> Operator<I, E> for TryCompactMapOp<F>
where
    F: Fn(I) -> anyhow::Result<Option<O>> + Send + Sync + 'static,
    O: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = O;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<O, anyhow::Error> {
        match (self.transform)(input) {
            Ok(Some(output)) => Step::Send(output),
            Ok(None) => Step::Skip,
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<O>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P, F, O> Publisher for TryCompactMap<P, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    F: Fn(P::Output) -> anyhow::Result<Option<O>> + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = anyhow::Error>,
    {
        let op = TryCompactMapOp {
            transform: self.transform.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}
