//! Publishers combining several upstreams.
//!
//! All combinators share one sink, `Join`. Each upstream branch is
//! subscribed through a `Lane` that stores incoming values into the shared
//! `JoinState` while holding the join's single lock, so branches firing on
//! different threads never see a torn state. Outputs are queued under that
//! same lock and delivered after it is released.
//!
//! Any failure ends the combination right away and cancels every branch.
//! A normal finish needs every branch to finish, unless the state reports
//! that it cannot produce anything anymore.

use std::mem;
use std::sync::{Arc, Mutex};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::outbox::{Outbox, Signal};
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

pub use self::combine_latest::{CombineLatest, CombineLatest3, CombineLatest4, CombineLatest5};
pub use self::merge::{Merge, Merge3, Merge4, Merge5, Merge6, Merge7, Merge8, MergeMany};
pub use self::zip::{Zip, Zip3, Zip4, Zip5};

mod combine_latest;
mod merge;
mod zip;

/// How a combination turns stored branch values into outputs.
pub(crate) trait JoinState: Send + 'static {
    type Output: Send + 'static;

    /// Take the next output, if the stored values allow one.
    fn poll(&mut self) -> Option<Self::Output>;

    /// Whether no output can ever follow, given the finished branches.
    fn exhausted(&self, _finished: &[bool]) -> bool {
        false
    }
}

struct Inner<St> {
    state: St,
    finished: Vec<bool>,
    terminated: bool,
}

pub(crate) struct Join<St, D: Subscriber> {
    inner: Mutex<Inner<St>>,
    lanes: Vec<Upstream>,
    outbox: Outbox<D>,
}

impl<St, D> Join<St, D>
where
    St: JoinState,
    D: Subscriber<Input = St::Output>,
{
    /// Create the join and hand it downstream as the subscription.
    ///
    /// Branches are subscribed afterwards through `lane`. A join without
    /// branches finishes right away.
    pub fn start(state: St, branches: usize, downstream: D) -> Arc<Join<St, D>> {
        let join = Arc::new(Join {
            inner: Mutex::new(Inner {
                state,
                finished: vec![false; branches],
                terminated: false,
            }),
            lanes: (0..branches).map(|_| Upstream::new()).collect(),
            outbox: Outbox::new(downstream),
        });
        join.outbox.subscribe(join.clone());
        if branches == 0 {
            join.finish(Completion::Finished);
        }
        join
    }

    /// The subscriber for branch `index`, storing values with `store`.
    pub fn lane<I>(self: &Arc<Self>, index: usize, store: fn(&mut St, I)) -> Lane<St, D, I> {
        Lane {
            join: self.clone(),
            index,
            store,
        }
    }

    fn receive<I>(&self, index: usize, store: fn(&mut St, I), input: I) {
        if !self.lanes[index].is_subscribed() {
            log::trace!("dropping a value from an inactive branch");
            return;
        }
        let finished = {
            let mut inner = lock(&self.inner);
            if inner.terminated {
                return;
            }
            store(&mut inner.state, input);
            while let Some(output) = inner.state.poll() {
                self.outbox.push(Signal::Value(output));
            }
            let exhausted = inner.state.exhausted(&inner.finished);
            if exhausted {
                inner.terminated = true;
                self.outbox.push(Signal::Complete(Completion::Finished));
            }
            exhausted
        };
        if finished {
            self.cancel_lanes();
        }
        self.outbox.drain();
    }

    fn complete(&self, index: usize, completion: Completion<D::Failure>) {
        if !self.lanes[index].complete() {
            return;
        }
        let done = {
            let mut inner = lock(&self.inner);
            if inner.terminated {
                return;
            }
            let done = match completion {
                Completion::Finished => {
                    inner.finished[index] = true;
                    inner.finished.iter().all(|&f| f) || inner.state.exhausted(&inner.finished)
                }
                Completion::Failure(_) => true,
            };
            if done {
                inner.terminated = true;
                self.outbox.push(Signal::Complete(completion));
            }
            done
        };
        if done {
            self.cancel_lanes();
        }
        self.outbox.drain();
    }

    fn finish(&self, completion: Completion<D::Failure>) {
        lock(&self.inner).terminated = true;
        self.outbox.complete(completion);
    }

    fn cancel_lanes(&self) {
        for lane in &self.lanes {
            lane.cancel();
        }
    }
}

impl<St, D> Subscription for Join<St, D>
where
    St: JoinState,
    D: Subscriber<Input = St::Output>,
{
    fn request(&self, demand: Demand) {
        for lane in &self.lanes {
            lane.forward(demand);
        }
    }

    fn cancel(&self) {
        let was_live = !mem::replace(&mut lock(&self.inner).terminated, true);
        if was_live {
            self.cancel_lanes();
        }
        self.outbox.cancel();
    }
}

/// Subscribes a join to one of its branches.
pub(crate) struct Lane<St, D: Subscriber, I> {
    join: Arc<Join<St, D>>,
    index: usize,
    store: fn(&mut St, I),
}

impl<St, D, I> Subscriber for Lane<St, D, I>
where
    St: JoinState,
    D: Subscriber<Input = St::Output>,
    I: Send + 'static,
{
    type Input = I;
    type Failure = D::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        let lane = &self.join.lanes[self.index];
        if lane.attach(subscription) {
            lane.open();
        }
    }

    fn receive(&self, input: I) -> Demand {
        self.join.receive(self.index, self.store, input);
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<D::Failure>) {
        self.join.complete(self.index, completion);
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;

    use super::*;
    use crate::testing::{Event, Recorder};

    /// Emits the sum of one value from each of two lanes, in arrival order.
    struct Pairs {
        left: VecDeque<i32>,
        right: VecDeque<i32>,
    }

    impl JoinState for Pairs {
        type Output = i32;

        fn poll(&mut self) -> Option<i32> {
            if self.left.is_empty() || self.right.is_empty() {
                return None;
            }
            Some(self.left.pop_front()? + self.right.pop_front()?)
        }
    }

    fn pairs() -> (
        Lane<Pairs, Recorder<i32, &'static str>, i32>,
        Lane<Pairs, Recorder<i32, &'static str>, i32>,
        Recorder<i32, &'static str>,
    ) {
        let recorder = Recorder::new();
        let state = Pairs {
            left: VecDeque::new(),
            right: VecDeque::new(),
        };
        let join = Join::start(state, 2, recorder.clone());
        let left = join.lane(0, |state: &mut Pairs, x| state.left.push_back(x));
        let right = join.lane(1, |state: &mut Pairs, x| state.right.push_back(x));
        left.receive_subscription(crate::subscription::EmptySubscription::shared());
        right.receive_subscription(crate::subscription::EmptySubscription::shared());
        (left, right, recorder)
    }

    #[test]
    fn stores_and_polls() {
        let (left, right, recorder) = pairs();
        left.receive(1);
        left.receive(2);
        right.receive(10);
        assert_eq!(recorder.values(), vec![11]);
        right.receive(20);
        assert_eq!(recorder.values(), vec![11, 22]);
    }

    #[test]
    fn finishes_after_every_branch() {
        let (left, right, recorder) = pairs();
        left.receive_completion(Completion::Finished);
        assert_eq!(recorder.completions(), 0);
        right.receive_completion(Completion::Finished);
        assert_eq!(recorder.completion(), Some(Completion::Finished));
    }

    #[test]
    fn failure_terminates_once() {
        let (left, right, recorder) = pairs();
        left.receive_completion(Completion::Failure("left"));
        right.receive_completion(Completion::Failure("right"));
        right.receive(1);
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure("left"))]
        );
    }

    #[test]
    fn empty_join_finishes() {
        let recorder: Recorder<i32, &str> = Recorder::new();
        let state = Pairs {
            left: VecDeque::new(),
            right: VecDeque::new(),
        };
        Join::start(state, 0, recorder.clone());
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Finished)]
        );
    }
}
