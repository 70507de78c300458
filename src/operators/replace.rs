//! Substituting values for empty or failed streams.

use std::sync::Arc;

use crate::completion::{Completion, Never};
use crate::publisher::Publisher;
use crate::sink::{attach_operator, Operator, Step};
use crate::subscriber::Subscriber;

/// Emits a fallback value if upstream finishes without emitting anything.
#[derive(Clone)]
pub struct ReplaceEmpty<P: Publisher> {
    upstream: P,
    fallback: Arc<P::Output>,
}

impl<P: Publisher> ReplaceEmpty<P> {
    pub(crate) fn new(upstream: P, fallback: P::Output) -> ReplaceEmpty<P> {
        ReplaceEmpty {
            upstream,
            fallback: Arc::new(fallback),
        }
    }
}

struct ReplaceEmptyOp<T> {
    fallback: Arc<T>,
    empty: bool,
}

impl<T, E> Operator<T, E> for ReplaceEmptyOp<T>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = E;

    fn receive(&mut self, input: T) -> Step<T, E> {
        self.empty = false;
        Step::Send(input)
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<T>, Completion<E>) {
        let last = match completion {
            Completion::Finished if self.empty => Some((*self.fallback).clone()),
            _ => None,
        };
        (last, completion)
    }
}

impl<P> Publisher for ReplaceEmpty<P>
where
    P: Publisher,
    P::Output: Clone + Sync,
{
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let op = ReplaceEmptyOp {
            fallback: self.fallback.clone(),
            empty: true,
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Turns a failure into a fallback value followed by a normal finish.
///
/// The resulting publisher cannot fail.
#[derive(Clone)]
pub struct ReplaceError<P: Publisher> {
    upstream: P,
    fallback: Arc<P::Output>,
}

impl<P: Publisher> ReplaceError<P> {
    pub(crate) fn new(upstream: P, fallback: P::Output) -> ReplaceError<P> {
        ReplaceError {
            upstream,
            fallback: Arc::new(fallback),
        }
    }
}

struct ReplaceErrorOp<T> {
    fallback: Arc<T>,
}

impl<T, E> Operator<T, E> for ReplaceErrorOp<T>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Failure = Never;

    fn receive(&mut self, input: T) -> Step<T, Never> {
        Step::Send(input)
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<T>, Completion<Never>) {
        match completion {
            Completion::Finished => (None, Completion::Finished),
            Completion::Failure(_) => (Some((*self.fallback).clone()), Completion::Finished),
        }
    }
}

impl<P> Publisher for ReplaceError<P>
where
    P: Publisher,
    P::Output: Clone + Sync,
{
    type Output = P::Output;
    type Failure = Never;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = Never>,
    {
        let op = ReplaceErrorOp {
            fallback: self.fallback.clone(),
        };
        attach_operator(&self.upstream, subscriber, op);
    }
}

/// Drops every value and forwards only the completion.
#[derive(Clone)]
pub struct IgnoreOutput<P> {
    upstream: P,
}

impl<P> IgnoreOutput<P> {
    pub(crate) fn new(upstream: P) -> IgnoreOutput<P> {
        IgnoreOutput { upstream }
    }
}

struct IgnoreOutputOp;

impl<I, E: Send + 'static> Operator<I, E> for IgnoreOutputOp {
    type Output = Never;
    type Failure = E;

    fn receive(&mut self, _input: I) -> Step<Never, E> {
        Step::Skip
    }

    fn complete(&mut self, completion: Completion<E>) -> (Option<Never>, Completion<E>) {
        (None, completion)
    }
}

impl<P: Publisher> Publisher for IgnoreOutput<P> {
    type Output = Never;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = Never, Failure = P::Failure>,
    {
        attach_operator(&self.upstream, subscriber, IgnoreOutputOp);
    }
}

#[cfg(test)]
mod test {
    use crate::completion::{Completion, Never};
    use crate::ext::PublisherExt;
    use crate::publisher::Publisher;
    use crate::publishers::{Empty, Fail, PassthroughSubject, Sequence};
    use crate::testing::{Event, Recorder};

    #[test]
    fn replace_empty_on_empty_finish() {
        let recorder = Recorder::new();
        Empty::<i32>::new().replace_empty(7).subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![7]);
        assert!(recorder.is_finished());
    }

    #[test]
    fn replace_empty_leaves_values_alone() {
        let recorder = Recorder::new();
        Sequence::new(vec![1, 2])
            .replace_empty(7)
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 2]);
    }

    #[test]
    fn replace_empty_not_on_failure() {
        let recorder = Recorder::new();
        Fail::<i32, _>::new("nope")
            .replace_empty(7)
            .subscribe(recorder.clone());
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure("nope"))]
        );
    }

    #[test]
    fn replace_error_finishes_normally() {
        let subject = PassthroughSubject::<i32, String>::new();
        let recorder: Recorder<i32, Never> = Recorder::new();
        subject.clone().replace_error(-1).subscribe(recorder.clone());
        subject.send(3);
        subject.send_completion(Completion::Failure("broken".into()));
        assert_eq!(
            recorder.events(),
            vec![
                Event::Subscribed,
                Event::Value(3),
                Event::Value(-1),
                Event::Completed(Completion::Finished)
            ]
        );
    }

    #[test]
    fn ignore_output_keeps_completion() {
        let recorder: Recorder<Never, &str> = Recorder::new();
        let subject = PassthroughSubject::<i32, &str>::new();
        subject.clone().ignore_output().subscribe(recorder.clone());
        subject.feed(0..10);
        subject.send_completion(Completion::Failure("end"));
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure("end"))]
        );
    }
}
