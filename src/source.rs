//! Subscriber registries for multicasting publishers.
//!
//! This is the observer pattern underneath the subjects. A `Source` keeps one
//! `Conduit` per subscriber. A conduit is that subscriber's subscription: it
//! tracks the demand, buffers at most one value, and serializes delivery.
//! Cancelled conduits are not removed eagerly. They are pruned the next time
//! the source sends an event.

use std::mem;
use std::sync::{Arc, Mutex};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::outbox::{Outbox, Signal};
use crate::subscriber::AnySubscriber;
use crate::subscription::{EmptySubscription, Subscription};

/// How a conduit treats a value that arrives while there is no demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overflow {
    /// Throw the value away.
    Drop,
    /// Keep the newest value and deliver it on the next request.
    KeepLatest,
}

struct Flow<I> {
    demand: Demand,
    pending: Option<I>,
}

/// The subscription of a single subscriber to a source.
pub(crate) struct Conduit<I: Send + 'static, F: Send + 'static> {
    flow: Mutex<Flow<I>>,
    overflow: Overflow,
    outbox: Outbox<AnySubscriber<I, F>>,
}

impl<I: Send + 'static, F: Send + 'static> Conduit<I, F> {
    fn new(
        downstream: AnySubscriber<I, F>,
        pending: Option<I>,
        overflow: Overflow,
    ) -> Arc<Conduit<I, F>> {
        let conduit = Arc::new(Conduit {
            flow: Mutex::new(Flow {
                demand: Demand::none(),
                pending,
            }),
            overflow,
            outbox: Outbox::new(downstream),
        });
        // Queued before the conduit becomes visible to senders, so the
        // subscription always arrives first.
        conduit.outbox.push(Signal::Subscribe(conduit.clone()));
        conduit
    }

    /// Hand the subscription to the subscriber.
    fn start(&self) {
        let requested = self.outbox.drain();
        self.grant(requested);
    }

    /// Deliver a value if there is demand for it.
    pub fn offer(&self, value: I) {
        {
            let mut flow = lock(&self.flow);
            if self.outbox.is_closed() {
                return;
            }
            if flow.demand.consume() {
                self.outbox.push(Signal::Value(value));
            } else if self.overflow == Overflow::KeepLatest {
                flow.pending = Some(value);
            } else {
                log::trace!("subscriber has no demand, dropping value");
                return;
            }
        }
        let requested = self.outbox.drain();
        self.grant(requested);
    }

    pub fn finish(&self, completion: Completion<F>) {
        lock(&self.flow).pending = None;
        self.outbox.complete(completion);
    }

    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    /// Add demand and deliver the pending value if it can now be sent.
    fn grant(&self, mut demand: Demand) {
        while !demand.is_zero() {
            {
                let mut flow = lock(&self.flow);
                flow.demand += demand;
                if flow.pending.is_none() || !flow.demand.consume() {
                    return;
                }
                if let Some(value) = flow.pending.take() {
                    self.outbox.push(Signal::Value(value));
                }
            }
            demand = self.outbox.drain();
        }
    }
}

impl<I: Send + 'static, F: Send + 'static> Subscription for Conduit<I, F> {
    fn request(&self, demand: Demand) {
        if demand.is_zero() {
            log::debug!("ignoring a request for no values");
            return;
        }
        self.grant(demand);
    }

    fn cancel(&self) {
        lock(&self.flow).pending = None;
        self.outbox.cancel();
    }
}

/// A registry of subscribers.
pub(crate) struct Source<I: Send + 'static, F: Send + 'static> {
    conduits: Vec<Arc<Conduit<I, F>>>,
    completion: Option<Completion<F>>,
}

impl<I: Send + 'static, F: Clone + Send + 'static> Source<I, F> {
    /// Create a new source.
    pub fn new() -> Source<I, F> {
        Source {
            conduits: vec![],
            completion: None,
        }
    }

    /// Register a subscriber.
    ///
    /// The returned closure hands the subscription over and must be called
    /// once the lock around the source has been released. A source that has
    /// already completed replays its completion to the subscriber instead.
    pub fn register(
        &mut self,
        subscriber: AnySubscriber<I, F>,
        pending: Option<I>,
        overflow: Overflow,
    ) -> Registration<I, F> {
        if let Some(completion) = &self.completion {
            return Registration::Completed(subscriber, completion.clone());
        }
        let conduit = Conduit::new(subscriber, pending, overflow);
        self.conduits.push(conduit.clone());
        Registration::Live(conduit)
    }

    /// The conduits of all subscribers still listening.
    pub fn live(&mut self) -> Vec<Arc<Conduit<I, F>>> {
        self.conduits.retain(|conduit| !conduit.is_closed());
        self.conduits.clone()
    }

    /// Mark the source complete and return the conduits to notify.
    ///
    /// Returns `None` if the source had already completed.
    pub fn complete(
        &mut self,
        completion: Completion<F>,
    ) -> Option<(Vec<Arc<Conduit<I, F>>>, Completion<F>)> {
        if self.completion.is_some() {
            return None;
        }
        self.completion = Some(completion.clone());
        Some((mem::take(&mut self.conduits), completion))
    }

    pub fn is_completed(&self) -> bool {
        self.completion.is_some()
    }
}

/// Send a value to a set of conduits, cloning it for all but the last.
pub(crate) fn broadcast<I: Clone + Send + 'static, F: Send + 'static>(
    conduits: Vec<Arc<Conduit<I, F>>>,
    value: I,
) {
    let mut iter = conduits.into_iter().peekable();
    while let Some(conduit) = iter.next() {
        if iter.peek().is_some() {
            conduit.offer(value.clone());
        } else {
            conduit.offer(value);
            break;
        }
    }
}

/// Send a completion to a set of conduits.
pub(crate) fn finish_all<I: Send + 'static, F: Clone + Send + 'static>(
    conduits: Vec<Arc<Conduit<I, F>>>,
    completion: Completion<F>,
) {
    for conduit in conduits {
        conduit.finish(completion.clone());
    }
}

/// The outcome of `Source::register`.
pub(crate) enum Registration<I: Send + 'static, F: Send + 'static> {
    Live(Arc<Conduit<I, F>>),
    Completed(AnySubscriber<I, F>, Completion<F>),
}

impl<I: Send + 'static, F: Send + 'static> Registration<I, F> {
    /// Deliver the subscription, or the replayed completion.
    pub fn start(self) {
        match self {
            Registration::Live(conduit) => conduit.start(),
            Registration::Completed(subscriber, completion) => {
                subscriber.receive_subscription(EmptySubscription::shared());
                subscriber.receive_completion(completion);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subscriber::erase;
    use crate::testing::{Event, Recorder};

    fn source() -> Source<i32, ()> {
        Source::new()
    }

    #[test]
    fn register_and_send() {
        let mut src = source();
        let recorder = Recorder::new();
        src.register(erase(recorder.clone()), None, Overflow::Drop).start();
        broadcast(src.live(), 4);
        assert_eq!(recorder.values(), vec![4]);
    }

    #[test]
    fn drops_values_without_demand() {
        let mut src = source();
        let recorder = Recorder::with_demand(Demand::none());
        src.register(erase(recorder.clone()), None, Overflow::Drop).start();
        broadcast(src.live(), 1);
        recorder.request(Demand::max(1));
        broadcast(src.live(), 2);
        broadcast(src.live(), 3);
        assert_eq!(recorder.values(), vec![2]);
    }

    #[test]
    fn keeps_latest_until_requested() {
        let mut src = source();
        let recorder = Recorder::with_demand(Demand::none());
        src.register(erase(recorder.clone()), Some(0), Overflow::KeepLatest)
            .start();
        broadcast(src.live(), 1);
        broadcast(src.live(), 2);
        assert!(recorder.values().is_empty());
        recorder.request(Demand::max(2));
        broadcast(src.live(), 3);
        broadcast(src.live(), 4);
        assert_eq!(recorder.values(), vec![2, 3]);
    }

    #[test]
    fn replenished_demand_is_granted() {
        let mut src = source();
        let recorder = Recorder::replenishing(Demand::max(1), Demand::max(1));
        src.register(erase(recorder.clone()), None, Overflow::Drop).start();
        for n in 0..5 {
            broadcast(src.live(), n);
        }
        assert_eq!(recorder.values(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancelled_conduits_are_pruned() {
        let mut src = source();
        let recorder = Recorder::new();
        src.register(erase(recorder.clone()), None, Overflow::Drop).start();
        assert_eq!(src.live().len(), 1);
        recorder.cancel();
        assert_eq!(src.live().len(), 0);
    }

    #[test]
    fn late_subscriber_gets_completion() {
        let mut src = source();
        let (conduits, completion) = src
            .complete(Completion::Failure(()))
            .expect("first completion");
        finish_all(conduits, completion);
        assert!(src.complete(Completion::Finished).is_none());
        let recorder = Recorder::new();
        src.register(erase(recorder.clone()), None, Overflow::Drop).start();
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure(()))]
        );
    }
}
