//! Questions about a whole stream, answered with a single `bool`.
//!
//! All of these finish early, cancelling upstream, as soon as the answer is
//! known.

use std::sync::Arc;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Emits whether every value satisfies a predicate.
#[derive(Clone)]
pub struct AllSatisfy<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> AllSatisfy<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> AllSatisfy<P, F> {
        AllSatisfy {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct AllSatisfyOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for AllSatisfyOp<F>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = bool;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<bool, E> {
        if (self.predicate)(&input) {
            Step::Skip
        } else {
            Step::Finish(Some(false))
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<E>) {
        answer(completion, true)
    }
}

impl<P, F> Publisher for AllSatisfy<P, F>
where
    P: Publisher,
    F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
    type Output = bool;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = P::Failure>,
    {
        let op = AllSatisfyOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `AllSatisfy`, with a predicate that may fail.
#[derive(Clone)]
pub struct TryAllSatisfy<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> TryAllSatisfy<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> TryAllSatisfy<P, F> {
        TryAllSatisfy {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct TryAllSatisfyOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for TryAllSatisfyOp<F>
where
    F: Fn(&I) -> anyhow::Result<bool> + Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<bool, anyhow::Error> {
        match (self.predicate)(&input) {
            Ok(true) => Step::Skip,
            Ok(false) => Step::Finish(Some(false)),
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<anyhow::Error>) {
        answer(completion.map_error(Into::into), true)
    }
}

impl<P, F> Publisher for TryAllSatisfy<P, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    F: Fn(&P::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = anyhow::Error>,
    {
        let op = TryAllSatisfyOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Emits whether any value equals a given one.
#[derive(Clone)]
pub struct Contains<P: Publisher> {
    upstream: P,
    value: Arc<P::Output>,
}

impl<P: Publisher> Contains<P> {
    pub(crate) fn new(upstream: P, value: P::Output) -> Contains<P> {
        Contains {
            upstream,
            value: Arc::new(value),
        }
    }
}

struct ContainsOp<T> {
    value: Arc<T>,
}

impl<E, T> Operator<T, E> for ContainsOp<T>
where
    T: PartialEq + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = bool;
    type Failure = E;

    fn receive(&mut self, input: T) -> Step<bool, E> {
        if input == *self.value {
            Step::Finish(Some(true))
        } else {
            Step::Skip
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<E>) {
        answer(completion, false)
    }
}

impl<P> Publisher for Contains<P>
where
    P: Publisher,
    P::Output: PartialEq + Sync,
{
    type Output = bool;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = P::Failure>,
    {
        let op = ContainsOp {
            value: self.value.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Emits whether any value satisfies a predicate.
#[derive(Clone)]
pub struct ContainsWhere<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> ContainsWhere<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> ContainsWhere<P, F> {
        ContainsWhere {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct ContainsWhereOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for ContainsWhereOp<F>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = bool;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<bool, E> {
        if (self.predicate)(&input) {
            Step::Finish(Some(true))
        } else {
            Step::Skip
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<E>) {
        answer(completion, false)
    }
}

impl<P, F> Publisher for ContainsWhere<P, F>
where
    P: Publisher,
    F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
    type Output = bool;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = P::Failure>,
    {
        let op = ContainsWhereOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `ContainsWhere`, with a predicate that may fail.
#[derive(Clone)]
pub struct TryContainsWhere<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> TryContainsWhere<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> TryContainsWhere<P, F> {
        TryContainsWhere {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct TryContainsWhereOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for TryContainsWhereOp<F>
where
    F: Fn(&I) -> anyhow::Result<bool> + Send + Sync + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<bool, anyhow::Error> {
        match (self.predicate)(&input) {
            Ok(true) => Step::Finish(Some(true)),
            Ok(false) => Step::Skip,
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<bool>, Completion<anyhow::Error>) {
        answer(completion.map_error(Into::into), false)
    }
}

impl<P, F> Publisher for TryContainsWhere<P, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    F: Fn(&P::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    type Output = bool;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = bool, Failure = anyhow::Error>,
    {
        let op = TryContainsWhereOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// The answer given when upstream ends without deciding the question.
fn answer<E>(completion: Completion<E>, default: bool) -> (Option<bool>, Completion<E>) {
    match completion {
        Completion::Finished => (Some(default), Completion::Finished),
        failure => (None, failure),
    }
}
