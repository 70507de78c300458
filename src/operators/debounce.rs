//! Waiting for a pause before emitting.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::outbox::Outbox;
use crate::publisher::Publisher;
use crate::scheduler::Scheduler;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// Emits a value only after `delay` has passed without a newer one.
///
/// Every value replaces the one waiting, and restarts the wait. When
/// upstream finishes, a waiting value is emitted right away, followed by the
/// completion. When upstream fails, a waiting value is discarded.
///
/// All deliveries happen through the scheduler.
pub struct Debounce<P, S> {
    upstream: P,
    delay: Duration,
    scheduler: Arc<S>,
}

impl<P: Clone, S> Clone for Debounce<P, S> {
    fn clone(&self) -> Debounce<P, S> {
        Debounce {
            upstream: self.upstream.clone(),
            delay: self.delay,
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<P, S> Debounce<P, S> {
    pub(crate) fn new(upstream: P, delay: Duration, scheduler: S) -> Debounce<P, S> {
        Debounce {
            upstream,
            delay,
            scheduler: Arc::new(scheduler),
        }
    }
}

impl<P: Publisher, S: Scheduler> Publisher for Debounce<P, S> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<D>(&self, subscriber: D)
    where
        D: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let sink = Arc::new_cyclic(|me| DebounceSink {
            upstream: Upstream::new(),
            outbox: Outbox::new(subscriber),
            waiting: Mutex::new(Waiting {
                generation: 0,
                value: None,
            }),
            delay: self.delay,
            scheduler: self.scheduler.clone(),
            me: me.clone(),
        });
        self.upstream.subscribe(sink);
    }
}

/// The newest value, tagged with the number of values seen so far.
struct Waiting<I> {
    generation: u64,
    value: Option<I>,
}

struct DebounceSink<D: Subscriber, S> {
    upstream: Upstream,
    outbox: Outbox<D>,
    waiting: Mutex<Waiting<D::Input>>,
    delay: Duration,
    scheduler: Arc<S>,
    me: Weak<DebounceSink<D, S>>,
}

impl<D: Subscriber, S: Scheduler> DebounceSink<D, S> {
    /// Emit the waiting value if nothing newer arrived since `generation`.
    fn fire(&self, generation: u64) {
        let value = {
            let mut waiting = lock(&self.waiting);
            if waiting.generation != generation {
                return;
            }
            waiting.value.take()
        };
        if let Some(value) = value {
            self.outbox.send(value);
        }
    }

    fn finish(&self, completion: Completion<D::Failure>) {
        let value = lock(&self.waiting).value.take();
        if let (Some(value), Completion::Finished) = (value, &completion) {
            self.outbox.send(value);
        }
        self.outbox.complete(completion);
    }
}

impl<D: Subscriber, S: Scheduler> Subscriber for DebounceSink<D, S> {
    type Input = D::Input;
    type Failure = D::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if !self.upstream.attach(subscription) {
            return;
        }
        if let Some(me) = self.me.upgrade() {
            self.outbox.subscribe(me);
        }
        self.upstream.open();
    }

    fn receive(&self, input: D::Input) -> Demand {
        if !self.upstream.is_subscribed() {
            return Demand::none();
        }
        let generation = {
            let mut waiting = lock(&self.waiting);
            waiting.generation += 1;
            waiting.value = Some(input);
            waiting.generation
        };
        let me = self.me.clone();
        self.scheduler.schedule_after(
            self.delay,
            Box::new(move || {
                if let Some(sink) = me.upgrade() {
                    sink.fire(generation);
                }
            }),
        );
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<D::Failure>) {
        if !self.upstream.complete() {
            return;
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        self.scheduler
            .schedule(Box::new(move || me.finish(completion)));
    }
}

impl<D: Subscriber, S: Scheduler> Subscription for DebounceSink<D, S> {
    fn request(&self, demand: Demand) {
        self.upstream.forward(demand);
    }

    fn cancel(&self) {
        self.upstream.cancel();
        self.outbox.cancel();
        lock(&self.waiting).value = None;
    }
}
