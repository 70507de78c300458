//! Resubscribing after a failure.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::outbox::Outbox;
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// Resubscribes to upstream when it fails.
///
/// With a budget of `Some(n)` at most `n` fresh subscriptions are made, with
/// `None` there is no limit. The downstream never sees the failures that
/// were retried, only the values of every attempt and the outcome of the
/// last one.
pub struct Retry<P> {
    upstream: Arc<P>,
    budget: Option<usize>,
}

impl<P> Clone for Retry<P> {
    fn clone(&self) -> Retry<P> {
        Retry {
            upstream: self.upstream.clone(),
            budget: self.budget,
        }
    }
}

impl<P> Retry<P> {
    pub(crate) fn new(upstream: P, budget: Option<usize>) -> Retry<P> {
        Retry {
            upstream: Arc::new(upstream),
            budget,
        }
    }
}

impl<P: Publisher> Publisher for Retry<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let sink = Arc::new_cyclic(|me| RetrySink {
            publisher: self.upstream.clone(),
            link: Upstream::new(),
            outbox: Outbox::new(subscriber),
            remaining: Mutex::new(self.budget),
            attempts: AtomicUsize::new(0),
            introduced: AtomicBool::new(false),
            trampoline: Mutex::new(Trampoline::default()),
            me: me.clone(),
        });
        self.upstream.subscribe(sink);
    }
}

/// Keeps resubscription iterative when upstream fails synchronously.
#[derive(Default)]
struct Trampoline {
    running: bool,
    pending: bool,
}

struct RetrySink<P, D: Subscriber> {
    publisher: Arc<P>,
    link: Upstream,
    outbox: Outbox<D>,
    remaining: Mutex<Option<usize>>,
    attempts: AtomicUsize,
    introduced: AtomicBool,
    trampoline: Mutex<Trampoline>,
    me: Weak<RetrySink<P, D>>,
}

impl<P, D> RetrySink<P, D>
where
    P: Publisher,
    D: Subscriber<Input = P::Output, Failure = P::Failure>,
{
    /// Take one retry from the budget, if any is left.
    fn take_retry(&self) -> bool {
        let mut remaining = lock(&self.remaining);
        match *remaining {
            None => true,
            Some(0) => false,
            Some(ref mut n) => {
                *n -= 1;
                true
            }
        }
    }

    fn resubscribe(&self) {
        {
            let mut trampoline = lock(&self.trampoline);
            if trampoline.running {
                trampoline.pending = true;
                return;
            }
            trampoline.running = true;
        }
        loop {
            let me = match self.me.upgrade() {
                Some(me) if !self.link.is_terminated() => me,
                _ => {
                    *lock(&self.trampoline) = Trampoline::default();
                    return;
                }
            };
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            log::warn!("upstream failed, resubscribing (attempt {})", attempt);
            self.publisher.subscribe(me);
            let mut trampoline = lock(&self.trampoline);
            if !trampoline.pending {
                trampoline.running = false;
                return;
            }
            trampoline.pending = false;
        }
    }
}

impl<P, D> Subscriber for RetrySink<P, D>
where
    P: Publisher,
    D: Subscriber<Input = P::Output, Failure = P::Failure>,
{
    type Input = P::Output;
    type Failure = P::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if !self.link.attach(subscription) {
            return;
        }
        if !self.introduced.swap(true, Ordering::SeqCst) {
            if let Some(me) = self.me.upgrade() {
                self.outbox.subscribe(me);
            }
        }
        self.link.open();
    }

    fn receive(&self, input: P::Output) -> Demand {
        if self.link.is_subscribed() {
            self.outbox.send(input);
        }
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<P::Failure>) {
        if let Completion::Failure(_) = completion {
            if self.take_retry() {
                if self.link.detach() {
                    self.resubscribe();
                }
                return;
            }
        }
        if self.link.complete() {
            self.outbox.complete(completion);
        }
    }
}

impl<P, D> Subscription for RetrySink<P, D>
where
    P: Publisher,
    D: Subscriber<Input = P::Output, Failure = P::Failure>,
{
    fn request(&self, demand: Demand) {
        self.link.forward(demand);
    }

    fn cancel(&self) {
        self.link.cancel();
        self.outbox.cancel();
    }
}
