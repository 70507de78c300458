//! Moving delivery onto a scheduler.

use std::sync::{Arc, Weak};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::outbox::{Outbox, Signal};
use crate::publisher::Publisher;
use crate::scheduler::Scheduler;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// Delivers values and the completion through a scheduler.
///
/// The subscription itself is handed downstream synchronously. Values keep
/// their order, and nothing is delivered after a cancellation, even work
/// that was already scheduled.
pub struct ReceiveOn<P, S> {
    upstream: P,
    scheduler: Arc<S>,
}

impl<P: Clone, S> Clone for ReceiveOn<P, S> {
    fn clone(&self) -> ReceiveOn<P, S> {
        ReceiveOn {
            upstream: self.upstream.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<P, S> ReceiveOn<P, S> {
    pub(crate) fn new(upstream: P, scheduler: S) -> ReceiveOn<P, S> {
        ReceiveOn {
            upstream,
            scheduler: Arc::new(scheduler),
        }
    }
}

impl<P: Publisher, S: Scheduler> Publisher for ReceiveOn<P, S> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<D>(&self, subscriber: D)
    where
        D: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let sink = Arc::new_cyclic(|me| ReceiveOnSink {
            upstream: Upstream::new(),
            outbox: Arc::new(Outbox::new(subscriber)),
            scheduler: self.scheduler.clone(),
            me: me.clone(),
        });
        self.upstream.subscribe(sink);
    }
}

struct ReceiveOnSink<D: Subscriber, S> {
    upstream: Upstream,
    outbox: Arc<Outbox<D>>,
    scheduler: Arc<S>,
    me: Weak<ReceiveOnSink<D, S>>,
}

impl<D: Subscriber, S: Scheduler> ReceiveOnSink<D, S> {
    fn deliver_later(&self, signal: Signal<D::Input, D::Failure>) {
        if !self.outbox.push(signal) {
            return;
        }
        let outbox = self.outbox.clone();
        self.scheduler.schedule(Box::new(move || {
            outbox.drain();
        }));
    }
}

impl<D: Subscriber, S: Scheduler> Subscriber for ReceiveOnSink<D, S> {
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
        if self.upstream.is_subscribed() {
            self.deliver_later(Signal::Value(input));
        }
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<D::Failure>) {
        if self.upstream.complete() {
            self.deliver_later(Signal::Complete(completion));
        }
    }
}

impl<D: Subscriber, S: Scheduler> Subscription for ReceiveOnSink<D, S> {
    fn request(&self, demand: Demand) {
        self.upstream.forward(demand);
    }

    fn cancel(&self) {
        self.upstream.cancel();
        self.outbox.cancel();
    }
}
