//! Shared plumbing for single-upstream operators.
//!
//! An operator only decides what to do with each value and with the
//! completion. `OperatorSink` does everything else: it links to the upstream
//! subscription, presents itself to the downstream as its subscription,
//! requests unlimited demand upstream, serializes delivery, and terminates
//! exactly once.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, Weak};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::outbox::{Outbox, Signal};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// What to do with a single upstream value.
pub(crate) enum Step<O, F> {
    /// Forward a value downstream.
    Send(O),
    /// Drop the value.
    Skip,
    /// Cancel upstream and finish, after sending one last value if given.
    Finish(Option<O>),
    /// Cancel upstream and fail.
    Fail(F),
}

/// The per-subscription state of a single-upstream operator.
pub(crate) trait Operator<I, E>: Send + 'static {
    type Output: Send + 'static;
    type Failure: Send + 'static;

    fn receive(&mut self, input: I) -> Step<Self::Output, Self::Failure>;

    /// Turn the upstream completion into a last value, if any, and the
    /// completion sent downstream.
    fn complete(
        &mut self,
        completion: Completion<E>,
    ) -> (Option<Self::Output>, Completion<Self::Failure>);
}

pub(crate) struct OperatorSink<D: Subscriber, Op, I, E> {
    upstream: Upstream,
    operator: Mutex<Op>,
    outbox: Outbox<D>,
    me: Weak<OperatorSink<D, Op, I, E>>,
    marker: PhantomData<fn(I, E)>,
}

/// Run `operator` on every subscription made through `upstream`.
pub(crate) fn attach_operator<P, D, Op>(upstream: &P, downstream: D, operator: Op)
where
    P: Publisher,
    Op: Operator<P::Output, P::Failure>,
    D: Subscriber<Input = Op::Output, Failure = Op::Failure>,
{
    let sink = Arc::new_cyclic(|me| OperatorSink::<D, Op, P::Output, P::Failure> {
        upstream: Upstream::new(),
        operator: Mutex::new(operator),
        outbox: Outbox::new(downstream),
        me: me.clone(),
        marker: PhantomData,
    });
    upstream.subscribe(sink);
}

impl<D, Op, I, E> Subscriber for OperatorSink<D, Op, I, E>
where
    I: Send + 'static,
    E: Send + 'static,
    Op: Operator<I, E>,
    D: Subscriber<Input = Op::Output, Failure = Op::Failure>,
{
    type Input = I;
    type Failure = E;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if !self.upstream.attach(subscription) {
            return;
        }
        if let Some(me) = self.me.upgrade() {
            self.outbox.subscribe(me);
        }
        self.upstream.open();
    }

    fn receive(&self, input: I) -> Demand {
        if !self.upstream.is_subscribed() {
            log::trace!("dropping a value received outside of a live subscription");
            return Demand::none();
        }
        let terminal = {
            let mut operator = lock(&self.operator);
            if self.outbox.is_closed() {
                return Demand::none();
            }
            match operator.receive(input) {
                Step::Send(output) => {
                    self.outbox.push(Signal::Value(output));
                    false
                }
                Step::Skip => false,
                Step::Finish(last) => {
                    if let Some(output) = last {
                        self.outbox.push(Signal::Value(output));
                    }
                    self.outbox.push(Signal::Complete(Completion::Finished));
                    true
                }
                Step::Fail(error) => {
                    self.outbox.push(Signal::Complete(Completion::Failure(error)));
                    true
                }
            }
        };
        if terminal {
            self.upstream.cancel();
        }
        self.outbox.drain();
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<E>) {
        if !self.upstream.complete() {
            log::trace!("dropping a completion received outside of a live subscription");
            return;
        }
        {
            let mut operator = lock(&self.operator);
            let (last, completion) = operator.complete(completion);
            if let Some(output) = last {
                self.outbox.push(Signal::Value(output));
            }
            self.outbox.push(Signal::Complete(completion));
        }
        self.outbox.drain();
    }
}

impl<D, Op, I, E> Subscription for OperatorSink<D, Op, I, E>
where
    I: Send + 'static,
    E: Send + 'static,
    Op: Operator<I, E>,
    D: Subscriber<Input = Op::Output, Failure = Op::Failure>,
{
    fn request(&self, demand: Demand) {
        self.upstream.forward(demand);
    }

    fn cancel(&self) {
        self.upstream.cancel();
        self.outbox.cancel();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::completion::Never;
    use crate::ext::PublisherExt;
    use crate::publishers::{PassthroughSubject, Sequence};
    use crate::testing::{Event, Recorder};

    /// Forwards even numbers, stops at the first negative one.
    struct EvenUntilNegative {
        seen: usize,
    }

    impl Operator<i32, String> for EvenUntilNegative {
        type Output = i32;
        type Failure = String;

        fn receive(&mut self, input: i32) -> Step<i32, String> {
            self.seen += 1;
            if input < -100 {
                Step::Fail(format!("too small: {}", input))
            } else if input < 0 {
                Step::Finish(Some(input))
            } else if input % 2 == 0 {
                Step::Send(input)
            } else {
                Step::Skip
            }
        }

        fn complete(&mut self, completion: Completion<String>) -> (Option<i32>, Completion<String>) {
            (Some(self.seen as i32), completion)
        }
    }

    fn pipeline() -> (PassthroughSubject<i32, String>, Recorder<i32, String>) {
        let subject = PassthroughSubject::new();
        let recorder = Recorder::new();
        attach_operator(&subject, recorder.clone(), EvenUntilNegative { seen: 0 });
        (subject, recorder)
    }

    #[test]
    fn sends_and_skips() {
        let (subject, recorder) = pipeline();
        subject.feed(vec![1, 2, 3, 4]);
        subject.send_completion(Completion::Finished);
        assert_eq!(recorder.values(), vec![2, 4, 4]);
        assert_eq!(recorder.completion(), Some(Completion::Finished));
    }

    #[test]
    fn finish_early_cancels_upstream() {
        let (subject, recorder) = pipeline();
        subject.feed(vec![2, -1, 6]);
        assert_eq!(recorder.values(), vec![2, -1]);
        assert_eq!(recorder.completion(), Some(Completion::Finished));
        assert_eq!(subject.subscriber_count(), 0);
        subject.send_completion(Completion::Finished);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn fail_terminates_once() {
        let (subject, recorder) = pipeline();
        subject.feed(vec![-200, -300]);
        subject.send_completion(Completion::Failure("late".into()));
        assert_eq!(
            recorder.events(),
            vec![
                Event::Subscribed,
                Event::Completed(Completion::Failure("too small: -200".to_string()))
            ]
        );
    }

    #[test]
    fn downstream_cancel_reaches_upstream() {
        let (subject, recorder) = pipeline();
        subject.send(2);
        recorder.cancel();
        subject.send(4);
        assert_eq!(recorder.values(), vec![2]);
        assert_eq!(recorder.completions(), 0);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn cancel_from_within_receive() {
        let subject = PassthroughSubject::<i32, String>::new();
        let recorder = Recorder::new().cancel_after(1);
        attach_operator(&subject, recorder.clone(), EvenUntilNegative { seen: 0 });
        subject.feed(vec![2, 4, 6]);
        assert_eq!(recorder.values(), vec![2]);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn endless_source_behind_two_operators() {
        let recorder = Recorder::<u64, Never>::new().cancel_after(3);
        Sequence::new(1u64..)
            .map(|x| x * x)
            .filter(|x| x % 2 == 1)
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 9, 25]);
        assert_eq!(recorder.completions(), 0);
        assert!(!recorder.is_subscribed());
    }

    #[test]
    fn request_during_handshake_waits_for_the_sink() {
        let recorder = Recorder::<u64, Never>::with_demand(Demand::max(1));
        Sequence::new(vec![1, 2, 3])
            .map(|x| x + 1)
            .subscribe(recorder.clone());
        assert_eq!(
            recorder.events(),
            vec![
                Event::Subscribed,
                Event::Value(2),
                Event::Value(3),
                Event::Value(4),
                Event::Completed(Completion::Finished)
            ]
        );
    }
}
