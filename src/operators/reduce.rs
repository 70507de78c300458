//! Accumulating values.

use std::sync::Arc;

use crate::completion::Completion;
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Folds all values into one, emitted when upstream finishes.
///
/// Nothing is emitted if upstream fails.
#[derive(Clone)]
pub struct Reduce<P, A, F> {
    upstream: P,
    initial: A,
    fold: Arc<F>,
}

impl<P, A, F> Reduce<P, A, F> {
    pub(crate) fn new(upstream: P, initial: A, fold: F) -> Reduce<P, A, F> {
        Reduce {
            upstream,
            initial,
            fold: Arc::new(fold),
        }
    }
}

struct ReduceOp<A, F> {
    acc: Option<A>,
    fold: Arc<F>,
}

impl<I, E, A, F> Operator<I, E> for ReduceOp<A, F>
where
    F: Fn(A, I) -> A + Send + Sync + 'static,
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<A, E> {
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.fold)(acc, input));
        }
        Step::Skip
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<A>, Completion<E>) {
        match completion {
            Completion::Finished => (self.acc.take(), Completion::Finished),
            failure => (None, failure),
        }
    }
}

impl<P, A, F> Publisher for Reduce<P, A, F>
where
    P: Publisher,
    A: Clone + Send + Sync + 'static,
    F: Fn(A, P::Output) -> A + Send + Sync + 'static,
{
    type Output = A;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = A, Failure = P::Failure>,
    {
        let op = ReduceOp {
            acc: Some(self.initial.clone()),
            fold: self.fold.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `Reduce`, with a fold that may fail.
#[derive(Clone)]
pub struct TryReduce<P, A, F> {
    upstream: P,
    initial: A,
    fold: Arc<F>,
}

impl<P, A, F> TryReduce<P, A, F> {
    pub(crate) fn new(upstream: P, initial: A, fold: F) -> TryReduce<P, A, F> {
        TryReduce {
            upstream,
            initial,
            fold: Arc::new(fold),
        }
    }
}

struct TryReduceOp<A, F> {
    acc: Option<A>,
    fold: Arc<F>,
}

impl<I, E, A, F> Operator<I, E> for TryReduceOp<A, F>
where
    F: Fn(A, I) -> anyhow::Result<A> + Send + Sync + 'static,
    A: Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = A;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<A, anyhow::Error> {
        let Some(acc) = self.acc.take() else {
            return Step::Skip;
        };
        match (self.fold)(acc, input) {
            Ok(acc) => {
                self.acc = Some(acc);
                Step::Skip
            }
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<A>, Completion<anyhow::Error>) {
        match completion {
            Completion::Finished => (self.acc.take(), Completion::Finished),
            Completion::Failure(error) => (None, Completion::Failure(error.into())),
        }
    }
}

impl<P, A, F> Publisher for TryReduce<P, A, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    A: Clone + Send + Sync + 'static,
    F: Fn(A, P::Output) -> anyhow::Result<A> + Send + Sync + 'static,
{
    type Output = A;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = A, Failure = anyhow::Error>,
    {
        let op = TryReduceOp {
            acc: Some(self.initial.clone()),
            fold: self.fold.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Emits every intermediate result of a fold.
#[derive(Clone)]
pub struct Scan<P, A, F> {
    upstream: P,
    initial: A,
    fold: Arc<F>,
}

impl<P, A, F> Scan<P, A, F> {
    pub(crate) fn new(upstream: P, initial: A, fold: F) -> Scan<P, A, F> {
        Scan {
            upstream,
            initial,
            fold: Arc::new(fold),
        }
    }
}

struct ScanOp<A, F> {
    acc: A,
    fold: Arc<F>,
}

impl<I, E, A, F> Operator<I, E> for ScanOp<A, F>
where
    F: Fn(&A, I) -> A + Send + Sync + 'static,
    A: Clone + Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Failure = E;

    fn receive(&mut self, input: I) -> Step<A, E> {
        self.acc = (self.fold)(&self.acc, input);
        Step::Send(self.acc.clone())
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<A>, Completion<E>) {
        (None, completion)
    }
}

impl<P, A, F> Publisher for Scan<P, A, F>
where
    P: Publisher,
    A: Clone + Send + Sync + 'static,
    F: Fn(&A, P::Output) -> A + Send + Sync + 'static,
{
    type Output = A;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = A, Failure = P::Failure>,
    {
        let op = ScanOp {
            acc: self.initial.clone(),
            fold: self.fold.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Like `Scan`, with a fold that may fail.
#[derive(Clone)]
pub struct TryScan<P, A, F> {
    upstream: P,
    initial: A,
    fold: Arc<F>,
}

impl<P, A, F> TryScan<P, A, F> {
    pub(crate) fn new(upstream: P, initial: A, fold: F) -> TryScan<P, A, F> {
        TryScan {
            upstream,
            initial,
            fold: Arc::new(fold),
        }
    }
}

struct TryScanOp<A, F> {
    acc: A,
    fold: Arc<F>,
}

impl<I, E, A, F> Operator<I, E> for TryScanOp<A, F>
where
    F: Fn(&A, I) -> anyhow::Result<A> + Send + Sync + 'static,
    A: Clone + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
{
    type Output = A;
    type Failure = anyhow::Error;

    fn receive(&mut self, input: I) -> Step<A, anyhow::Error> {
        match (self.fold)(&self.acc, input) {
            Ok(acc) => {
                self.acc = acc;
                Step::Send(self.acc.clone())
            }
            Err(error) => Step::Fail(error),
        }
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<A>, Completion<anyhow::Error>) {
        (None, completion.map_error(Into::into))
    }
}

impl<P, A, F> Publisher for TryScan<P, A, F>
where
    P: Publisher,
    P::Failure: Into<anyhow::Error>,
    A: Clone + Send + Sync + 'static,
    F: Fn(&A, P::Output) -> anyhow::Result<A> + Send + Sync + 'static,
{
    type Output = A;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = A, Failure = anyhow::Error>,
    {
        let op = TryScanOp {
            acc: self.initial.clone(),
            fold: self.fold.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Emits the number of values once upstream finishes.
#[derive(Clone)]
pub struct Count<P> {
    upstream: P,
}

impl<P> Count<P> {
    pub(crate) fn new(upstream: P) -> Count<P> {
        Count { upstream }
    }
}

struct CountOp {
    count: usize,
}

impl<I, E: Send + 'static> Operator<I, E> for CountOp {
    type Output = usize;
    type Failure = E;

    fn receive(&mut self, _input: I) -> Step<usize, E> {
        self.count += 1;
        Step::Skip
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<usize>, Completion<E>) {
        match completion {
            Completion::Finished => (Some(self.count), Completion::Finished),
            failure => (None, failure),
        }
    }
}

impl<P: Publisher> Publisher for Count<P> {
    type Output = usize;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = usize, Failure = P::Failure>,
    {
        attach_operator(&self.upstream, subscriber, CountOp { count: 0 });
    }
}

#[cfg(test)]
mod test {
    use anyhow::ensure;

    use crate::completion::Completion;
    use crate::ext::PublisherExt;
    use crate::publisher::Publisher;
    use crate::publishers::{PassthroughSubject, Sequence};
    use crate::testing::{Event, Recorder};

    #[test]
    fn reduce_emits_once_on_finish() {
        let subject = PassthroughSubject::<i32, ()>::new();
        let recorder = Recorder::new();
        subject
            .clone()
            .reduce(0, |acc, x| acc + x)
            .subscribe(recorder.clone());
        subject.feed(1..=4);
        assert!(recorder.values().is_empty());
        subject.send_completion(Completion::Finished);
        assert_eq!(recorder.values(), vec![10]);
        assert!(recorder.is_finished());
    }

    #[test]
    fn reduce_on_failure_emits_nothing() {
        let subject = PassthroughSubject::<i32, ()>::new();
        let recorder = Recorder::new();
        subject
            .clone()
            .reduce(vec![], |mut acc, x| {
                acc.push(x);
                acc
            })
            .subscribe(recorder.clone());
        subject.send(1);
        subject.send_completion(Completion::Failure(()));
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure(()))]
        );
    }

    #[test]
    fn try_reduce_stops_at_error() {
        let recorder = Recorder::new();
        Sequence::new(vec![1u8, 100, 200])
            .try_reduce(0u8, |acc, x| {
                acc.checked_add(x).ok_or_else(|| anyhow::anyhow!("overflow"))
            })
            .subscribe(recorder.clone());
        assert!(recorder.values().is_empty());
        assert_eq!(recorder.error_message().as_deref(), Some("overflow"));
    }

    #[test]
    fn scan_emits_running_totals() {
        let recorder = Recorder::new();
        Sequence::new(vec![1, 2, 3, 4])
            .scan(0, |acc, x| acc + x)
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 3, 6, 10]);
    }

    #[test]
    fn try_scan_fails() {
        let recorder = Recorder::new();
        Sequence::new(vec![5, 3, -1, 7])
            .try_scan(String::new(), |acc, x: i32| {
                ensure!(x >= 0, "negative input {}", x);
                Ok(format!("{}{}", acc, x))
            })
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec!["5".to_string(), "53".to_string()]);
        assert_eq!(recorder.error_message().as_deref(), Some("negative input -1"));
    }

    #[test]
    fn count_values() {
        let recorder = Recorder::new();
        Sequence::new("counting".chars().collect::<Vec<_>>())
            .count()
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![8]);
    }
}
