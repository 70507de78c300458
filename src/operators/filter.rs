//! Dropping values.

use std::sync::Arc;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Forwards only the values that satisfy a predicate.
#[derive(Clone)]
pub struct Filter<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> Filter<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> Filter<P, F> {
        Filter {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct FilterOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for FilterOp<F>
where
    F: Fn(&I) -> bool + Send + Sync + 'static,
    I: Send + 'static,
    E: Send + 'static,
{
    type Output = I;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<I, E> {
        if (self.predicate)(&input) {
            Step::Send(input)
        } else {
            Step::Skip
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<I>, Completion<E>) {
        (None, completion)
    }
}

impl<P, F> Publisher for Filter<P, F>
where
    P: Publisher,
    F: Fn(&P::Output) -> bool + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let op = FilterOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `Filter`, with a predicate that may fail.
#[derive(Clone)]
pub struct TryFilter<P, F> {
    upstream: P,
    predicate: Arc<F>,
}

impl<P, F> TryFilter<P, F> {
    pub(crate) fn new(upstream: P, predicate: F) -> TryFilter<P, F> {
        TryFilter {
            upstream,
            predicate: Arc::new(predicate),
        }
    }
}

struct TryFilterOp<F> {
    predicate: Arc<F>,
}

impl<I, E, F> Operator<I, E> for TryFilterOp<F>
where
    F: Fn(&I) -> anyhow::Result<bool> + Send + Sync + 'static,
    I: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = I;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<I, anyhow::Error> {
        match (self.predicate)(&input) {
            Ok(true) => Step::Send(input),
            Ok(false) => Step::Skip,
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<I>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P, F> Publisher for TryFilter<P, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    F: Fn(&P::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = anyhow::Error>,
    {
        let op = TryFilterOp {
            predicate: self.predicate.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Drops values equivalent to the previously forwarded one.
///
/// `remove_duplicates` compares with `==`, `remove_duplicates_by` with a
/// custom equivalence.
#[derive(Clone)]
pub struct RemoveDuplicates<P, F> {
    upstream: P,
    equivalent: Arc<F>,
}

impl<P, F> RemoveDuplicates<P, F> {
    pub(crate) fn new(upstream: P, equivalent: F) -> RemoveDuplicates<P, F> {
        RemoveDuplicates {
            upstream,
            equivalent: Arc::new(equivalent),
        }
    }
}

struct RemoveDuplicatesOp<I, F> {
    equivalent: Arc<F>,
    last: Option<I>,
}

impl<I, E, F> Operator<I, E> for RemoveDuplicatesOp<I, F>
where
    F: Fn(&I, &I) -> bool + Send + Sync + 'static,
    I: Clone + Send + 'static,
    E: Send + 'static,
{
    type Output = I;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<I, E> {
        match &self.last {
            Some(last) if (self.equivalent)(last, &input) => Step::Skip,
            _ => {
                self.last = Some(input.clone());
                Step::Send(input)
            }
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<I>, Completion<E>) {
        self.last = None;
        (None, completion)
    }
}

impl<P, F> Publisher for RemoveDuplicates<P, F>
where
    P: Publisher,
    P::Output: Clone,
    F: Fn(&P::Output, &P::Output) -> bool + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let op = RemoveDuplicatesOp {
            equivalent: self.equivalent.clone(),
            last: None,
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `RemoveDuplicates`, with an equivalence that may fail.
#[derive(Clone)]
pub struct TryRemoveDuplicates<P, F> {
    upstream: P,
    equivalent: Arc<F>,
}

impl<P, F> TryRemoveDuplicates<P, F> {
    pub(crate) fn new(upstream: P, equivalent: F) -> TryRemoveDuplicates<P, F> {
        TryRemoveDuplicates {
            upstream,
            equivalent: Arc::new(equivalent),
        }
    }
}

struct TryRemoveDuplicatesOp<I, F> {
    equivalent: Arc<F>,
    last: Option<I>,
}

impl<I, E, F> Operator<I, E> for TryRemoveDuplicatesOp<I, F>
where
    F: Fn(&I, &I) -> anyhow::Result<bool> + Send + Sync + 'static,
    I: Clone + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = I;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<I, anyhow::Error> {
        let duplicate = match &self.last {
            Some(last) => (self.equivalent)(last, &input),
            None => Ok(false),
        };
        match duplicate {
            Ok(true) => Step::Skip,
            Ok(false) => {
                self.last = Some(input.clone());
                Step::Send(input)
            }
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<I>, Completion<anyhow::Error>) {
        self.last = None;
        (None, completion.map_error(Into::into))
    }
}

impl<P, F> Publisher for TryRemoveDuplicates<P, F>
where
    P: Publisher,
    P::Output: Clone,
    P::Failure: Into<anyhow::Error>,
    F: Fn(&P::Output, &P::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    type Output = P::Output;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = anyhow::Error>,
    {
        let op = TryRemoveDuplicatesOp {
            equivalent: self.equivalent.clone(),
            last: None,
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}
