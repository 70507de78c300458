//! Utilities for testing pipelines.
//!
//! `Recorder` is a subscriber that remembers everything it receives, and
//! `TestScheduler` is a scheduler with a virtual clock. Together they make
//! asynchronous pipelines deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::scheduler::{Scheduler, Timer, Work};
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

/// Install `env_logger` for the test harness.
///
/// Safe to call from every test, only the first call has an effect. Needs
/// the `testing` feature outside of this crate's own tests.
#[cfg(any(test, feature = "testing"))]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A signal observed by a `Recorder`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event<I, F> {
    /// A subscription arrived.
    Subscribed,
    /// A value arrived.
    Value(I),
    /// A completion arrived.
    Completed(Completion<F>),
}

struct Log<I, F> {
    events: Vec<Event<I, F>>,
    subscription: Option<Arc<dyn Subscription>>,
    received: usize,
}

struct Shared<I, F> {
    log: Mutex<Log<I, F>>,
    initial: Demand,
    replenish: Demand,
    cancel_after: AtomicUsize,
}

/// A subscriber that records every signal.
///
/// The recorder does not enforce the protocol, it records whatever it is
/// sent, so tests can check that nothing arrives after a completion. Clones
/// share the same log.
///
/// ```
/// # use backflow::{Completion, Just, Publisher};
/// # use backflow::testing::Recorder;
/// let recorder = Recorder::new();
/// Just::new(1).subscribe(recorder.clone());
/// assert_eq!(recorder.values(), vec![1]);
/// assert_eq!(recorder.completion(), Some(Completion::Finished));
/// ```
pub struct Recorder<I, F> {
    shared: Arc<Shared<I, F>>,
}

impl<I, F> Clone for Recorder<I, F> {
    fn clone(&self) -> Recorder<I, F> {
        Recorder {
            shared: self.shared.clone(),
        }
    }
}

impl<I, F> Default for Recorder<I, F> {
    fn default() -> Recorder<I, F> {
        Recorder::new()
    }
}

impl<I, F> Recorder<I, F> {
    /// A recorder that requests unlimited demand when subscribed.
    pub fn new() -> Recorder<I, F> {
        Recorder::with_demand(Demand::unlimited())
    }

    /// A recorder that requests `initial` when subscribed.
    ///
    /// With `Demand::none()` nothing is requested until `request` is called.
    pub fn with_demand(initial: Demand) -> Recorder<I, F> {
        Recorder::replenishing(initial, Demand::none())
    }

    /// A recorder that requests `initial` when subscribed and asks for
    /// `replenish` more after every value.
    pub fn replenishing(initial: Demand, replenish: Demand) -> Recorder<I, F> {
        Recorder {
            shared: Arc::new(Shared {
                log: Mutex::new(Log {
                    events: vec![],
                    subscription: None,
                    received: 0,
                }),
                initial,
                replenish,
                cancel_after: AtomicUsize::new(usize::MAX),
            }),
        }
    }

    /// Cancel the subscription from within `receive` once `n` values have
    /// arrived.
    pub fn cancel_after(self, n: usize) -> Recorder<I, F> {
        self.shared.cancel_after.store(n, Ordering::SeqCst);
        self
    }

    /// Request more values through the recorded subscription.
    pub fn request(&self, demand: Demand) {
        let subscription = lock(&self.shared.log).subscription.clone();
        if let Some(subscription) = subscription {
            subscription.request(demand);
        }
    }

    /// Cancel the recorded subscription.
    pub fn cancel(&self) {
        let subscription = lock(&self.shared.log).subscription.take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// The number of subscriptions received.
    pub fn subscriptions(&self) -> usize {
        self.count(|event| matches!(event, Event::Subscribed))
    }

    /// The number of completions received.
    pub fn completions(&self) -> usize {
        self.count(|event| matches!(event, Event::Completed(_)))
    }

    /// Whether a `Finished` completion was received.
    pub fn is_finished(&self) -> bool {
        self.count(|event| matches!(event, Event::Completed(Completion::Finished))) > 0
    }

    /// Whether a subscription was received and has been neither completed
    /// nor cancelled.
    pub fn is_subscribed(&self) -> bool {
        lock(&self.shared.log).subscription.is_some()
    }

    fn count<P: Fn(&Event<I, F>) -> bool>(&self, predicate: P) -> usize {
        lock(&self.shared.log)
            .events
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl<I: Clone, F> Recorder<I, F> {
    /// The values received so far.
    pub fn values(&self) -> Vec<I> {
        lock(&self.shared.log)
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Value(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<I, F: fmt::Display> Recorder<I, F> {
    /// The message of the first failure received, if any.
    pub fn error_message(&self) -> Option<String> {
        lock(&self.shared.log)
            .events
            .iter()
            .find_map(|event| match event {
                Event::Completed(Completion::Failure(error)) => Some(error.to_string()),
                _ => None,
            })
    }
}

impl<I: Clone, F: Clone> Recorder<I, F> {
    /// Everything received so far.
    pub fn events(&self) -> Vec<Event<I, F>> {
        lock(&self.shared.log).events.clone()
    }

    /// The first completion received, if any.
    pub fn completion(&self) -> Option<Completion<F>> {
        lock(&self.shared.log)
            .events
            .iter()
            .find_map(|event| match event {
                Event::Completed(completion) => Some(completion.clone()),
                _ => None,
            })
    }
}

impl<I: Send + 'static, F: Send + 'static> Subscriber for Recorder<I, F> {
    type Input = I;
    type Failure = F;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        {
            let mut log = lock(&self.shared.log);
            log.events.push(Event::Subscribed);
            if log.subscription.is_none() {
                log.subscription = Some(subscription.clone());
            }
        }
        if !self.shared.initial.is_zero() {
            subscription.request(self.shared.initial);
        }
    }

    fn receive(&self, input: I) -> Demand {
        let cancel = {
            let mut log = lock(&self.shared.log);
            log.events.push(Event::Value(input));
            log.received += 1;
            log.received == self.shared.cancel_after.load(Ordering::SeqCst)
        };
        if cancel {
            self.cancel();
            return Demand::none();
        }
        self.shared.replenish
    }

    fn receive_completion(&self, completion: Completion<F>) {
        let mut log = lock(&self.shared.log);
        log.events.push(Event::Completed(completion));
        log.subscription = None;
    }
}

struct Clock {
    now: Duration,
    seq: u64,
    timers: BinaryHeap<Reverse<Timer<Duration>>>,
}

/// A scheduler driven by a virtual clock.
///
/// Scheduled work only runs when the test advances the clock, so timing
/// dependent operators can be tested without sleeping.
///
/// ```
/// # use backflow::Scheduler;
/// # use backflow::testing::TestScheduler;
/// # use std::sync::{Arc, Mutex};
/// # use std::time::Duration;
/// let scheduler = TestScheduler::new();
/// let ran = Arc::new(Mutex::new(false));
/// let flag = ran.clone();
/// scheduler.schedule_after(Duration::from_secs(1), Box::new(move || *flag.lock().unwrap() = true));
/// scheduler.advance(Duration::from_millis(999));
/// assert!(!*ran.lock().unwrap());
/// scheduler.advance(Duration::from_millis(1));
/// assert!(*ran.lock().unwrap());
/// ```
#[derive(Clone)]
pub struct TestScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl Default for TestScheduler {
    fn default() -> TestScheduler {
        TestScheduler::new()
    }
}

impl TestScheduler {
    /// A scheduler whose clock starts at zero.
    pub fn new() -> TestScheduler {
        TestScheduler {
            clock: Arc::new(Mutex::new(Clock {
                now: Duration::ZERO,
                seq: 0,
                timers: BinaryHeap::new(),
            })),
        }
    }

    /// The current virtual time.
    pub fn now(&self) -> Duration {
        lock(&self.clock).now
    }

    /// The amount of work waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.clock).timers.len()
    }

    /// Move the clock forward, running all work that becomes due on the way.
    ///
    /// Work scheduled by running work is picked up as well, if it is due
    /// before the new time.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.clock).now + by;
        while let Some(work) = self.next_due(target) {
            work();
        }
        lock(&self.clock).now = target;
    }

    /// Run all work that is due now.
    pub fn run(&self) {
        self.advance(Duration::ZERO)
    }

    /// Run all scheduled work, moving the clock as far as needed.
    pub fn run_all(&self) {
        loop {
            let next = lock(&self.clock).timers.peek().map(|Reverse(timer)| timer.at);
            match next {
                Some(at) => {
                    let now = self.now();
                    self.advance(at.saturating_sub(now));
                }
                None => return,
            }
        }
    }

    fn next_due(&self, target: Duration) -> Option<Work> {
        let mut clock = lock(&self.clock);
        if clock.timers.peek().map_or(true, |Reverse(timer)| timer.at > target) {
            return None;
        }
        let Reverse(timer) = clock.timers.pop()?;
        clock.now = timer.at;
        Some(timer.work)
    }
}

impl Scheduler for TestScheduler {
    fn schedule(&self, work: Work) {
        self.schedule_after(Duration::ZERO, work)
    }

    fn schedule_after(&self, delay: Duration, work: Work) {
        let mut clock = lock(&self.clock);
        clock.seq += 1;
        let timer = Timer {
            at: clock.now + delay,
            seq: clock.seq,
            work,
        };
        clock.timers.push(Reverse(timer));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subscription::EmptySubscription;

    #[test]
    fn recorder_requests_initial_demand() {
        struct Expect(Mutex<Vec<Demand>>);
        impl Subscription for Expect {
            fn request(&self, demand: Demand) {
                self.0.lock().unwrap().push(demand);
            }
            fn cancel(&self) {}
        }
        let subscription = Arc::new(Expect(Mutex::new(vec![])));
        let recorder = Recorder::<(), ()>::with_demand(Demand::max(3));
        recorder.receive_subscription(subscription.clone());
        recorder.request(Demand::max(1));
        assert_eq!(*subscription.0.lock().unwrap(), vec![Demand::max(3), Demand::max(1)]);
    }

    #[test]
    fn recorder_forgets_subscription_on_completion() {
        let recorder = Recorder::<i32, ()>::new();
        recorder.receive_subscription(EmptySubscription::shared());
        assert!(recorder.is_subscribed());
        recorder.receive_completion(Completion::Finished);
        assert!(!recorder.is_subscribed());
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn scheduler_runs_in_time_order() {
        let scheduler = TestScheduler::new();
        let order = Arc::new(Mutex::new(vec![]));
        for (delay, tag) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let order = order.clone();
            scheduler.schedule_after(
                Duration::from_millis(delay),
                Box::new(move || order.lock().unwrap().push(tag)),
            );
        }
        scheduler.advance(Duration::from_millis(20));
        assert_eq!(*order.lock().unwrap(), vec!["a", "a2", "b"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
        scheduler.run_all();
        assert_eq!(*order.lock().unwrap(), vec!["a", "a2", "b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn work_scheduled_by_work_runs_when_due() {
        let scheduler = TestScheduler::new();
        let hits = Arc::new(Mutex::new(vec![]));
        let (inner_scheduler, inner_hits) = (scheduler.clone(), hits.clone());
        scheduler.schedule_after(
            Duration::from_millis(5),
            Box::new(move || {
                let stamp = inner_scheduler.now();
                inner_hits.lock().unwrap().push(stamp);
                let hits = inner_hits.clone();
                let clock = inner_scheduler.clone();
                inner_scheduler.schedule_after(
                    Duration::from_millis(5),
                    Box::new(move || hits.lock().unwrap().push(clock.now())),
                );
            }),
        );
        scheduler.advance(Duration::from_millis(10));
        assert_eq!(
            *hits.lock().unwrap(),
            vec![Duration::from_millis(5), Duration::from_millis(10)]
        );
    }
}
