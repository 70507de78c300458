//! Serialized delivery to a downstream subscriber.
//!
//! Every sink hands its outgoing signals to an `Outbox`. Signals are queued
//! under a short lock and the first thread that finds no delivery in progress
//! drains the queue, calling the downstream with no lock held. Signals raised
//! while a delivery runs, from another thread or re-entrantly from inside the
//! downstream, are picked up by that same drain loop.
//!
//! This gives three guarantees to every sink built on top of it:
//!
//! - downstream calls never overlap,
//! - a downstream may cancel or request from inside `receive` without
//!   deadlocking,
//! - nothing is accepted after a completion or a cancellation, so at most one
//!   terminal signal is ever delivered and it is the last one.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Mutex};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

/// A signal travelling downstream.
pub(crate) enum Signal<I, F> {
    Subscribe(Arc<dyn Subscription>),
    Value(I),
    Complete(Completion<F>),
}

struct State<S: Subscriber> {
    downstream: Option<Arc<S>>,
    queue: VecDeque<Signal<S::Input, S::Failure>>,
    draining: bool,
    closed: bool,
}

pub(crate) struct Outbox<S: Subscriber> {
    state: Mutex<State<S>>,
}

/// Releases the drain if a downstream call panics, so that later signals are
/// still delivered.
struct Unwinding<'a, S: Subscriber>(&'a Mutex<State<S>>);

impl<S: Subscriber> Drop for Unwinding<'_, S> {
    fn drop(&mut self) {
        log::warn!("downstream panicked while receiving a signal");
        lock(self.0).draining = false;
    }
}

impl<S: Subscriber> Outbox<S> {
    pub fn new(downstream: S) -> Outbox<S> {
        Outbox {
            state: Mutex::new(State {
                downstream: Some(Arc::new(downstream)),
                queue: VecDeque::new(),
                draining: false,
                closed: false,
            }),
        }
    }

    /// Queue a signal without delivering it.
    ///
    /// Returns `false` if the outbox no longer accepts signals. A completion
    /// closes the outbox.
    pub fn push(&self, signal: Signal<S::Input, S::Failure>) -> bool {
        let mut state = lock(&self.state);
        if state.closed {
            log::trace!("outbox closed, dropping signal");
            return false;
        }
        if let Signal::Complete(_) = signal {
            state.closed = true;
        }
        state.queue.push_back(signal);
        true
    }

    /// Deliver queued signals unless another call is already doing so.
    ///
    /// Returns the additional demand the downstream asked for while receiving
    /// the values delivered by this call.
    pub fn drain(&self) -> Demand {
        {
            let mut state = lock(&self.state);
            if state.draining {
                return Demand::none();
            }
            state.draining = true;
        }
        let unwinding = Unwinding(&self.state);
        let mut requested = Demand::none();
        loop {
            let (signal, downstream) = {
                let mut state = lock(&self.state);
                match state.queue.pop_front() {
                    Some(signal) => (signal, state.downstream.clone()),
                    None => {
                        state.draining = false;
                        mem::forget(unwinding);
                        return requested;
                    }
                }
            };
            let Some(downstream) = downstream else {
                continue;
            };
            match signal {
                Signal::Subscribe(subscription) => downstream.receive_subscription(subscription),
                Signal::Value(value) => requested += downstream.receive(value),
                Signal::Complete(completion) => {
                    let released = lock(&self.state).downstream.take();
                    downstream.receive_completion(completion);
                    drop(released);
                }
            }
        }
    }

    pub fn subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.push(Signal::Subscribe(subscription));
        self.drain();
    }

    pub fn send(&self, value: S::Input) -> bool {
        let accepted = self.push(Signal::Value(value));
        self.drain();
        accepted
    }

    pub fn complete(&self, completion: Completion<S::Failure>) -> bool {
        let accepted = self.push(Signal::Complete(completion));
        self.drain();
        accepted
    }

    /// Stop all delivery and release the downstream.
    ///
    /// Queued signals are discarded. A delivery running on another thread
    /// finishes its current call and then finds nothing left to do.
    pub fn cancel(&self) {
        let (released, discarded) = {
            let mut state = lock(&self.state);
            state.closed = true;
            (state.downstream.take(), mem::take(&mut state.queue))
        };
        drop(discarded);
        drop(released);
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}
