//! Recovering from a failure by switching to another publisher.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::operators::MapError;
use crate::outbox::Outbox;
use crate::publisher::{AnyPublisher, Publisher};
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

/// Replaces a failed upstream with the publisher returned by a handler.
///
/// Values of the upstream pass through until it fails. The handler then
/// turns the error into a replacement publisher, whose values and
/// completion are forwarded from that point on. A normal finish of the
/// upstream is forwarded as is.
///
/// ```
/// # use backflow::{Fail, Just, PublisherExt};
/// let values: Vec<_> = Fail::<i32, _>::new("offline")
///     .catch(|_| Just::new(0))
///     .events()
///     .collect();
/// assert_eq!(values, vec![Ok(0)]);
/// ```
#[derive(Clone)]
pub struct Catch<P, F> {
    upstream: P,
    handler: Arc<F>,
}

impl<P, F> Catch<P, F> {
    pub(crate) fn new(upstream: P, handler: F) -> Catch<P, F> {
        Catch {
            upstream,
            handler: Arc::new(handler),
        }
    }
}

impl<P, F, R> Publisher for Catch<P, F>
where
    P: Publisher,
    F: Fn(P::Failure) -> R + Send + Sync + 'static,
    R: Publisher<Output = P::Output>,
{
    type Output = P::Output;
    type Failure = R::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = R::Failure>,
    {
        let handler = self.handler.clone();
        let recover: Recover<P::Output, R::Failure, P::Failure> =
            Box::new(move |error| Ok(AnyPublisher::new(handler(error))));
        attach_catch(&self.upstream, subscriber, recover);
    }
}

/// Like `Catch`, with a handler that may fail.
///
/// Errors of the handler and of the replacement are erased to
/// `anyhow::Error`. A handler error ends the stream right away.
#[derive(Clone)]
pub struct TryCatch<P, F> {
    upstream: P,
    handler: Arc<F>,
}

impl<P, F> TryCatch<P, F> {
    pub(crate) fn new(upstream: P, handler: F) -> TryCatch<P, F> {
        TryCatch {
            upstream,
            handler: Arc::new(handler),
        }
    }
}

fn erase_error<E: Into<anyhow::Error>>(error: E) -> anyhow::Error {
    error.into()
}

impl<P, F, R> Publisher for TryCatch<P, F>
where
    P: Publisher,
    F: Fn(P::Failure) -> anyhow::Result<R> + Send + Sync + 'static,
    R: Publisher<Output = P::Output>,
    R::Failure: Into<anyhow::Error>,
{
    type Output = P::Output;
    type Failure = anyhow::Error;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = anyhow::Error>,
    {
        let handler = self.handler.clone();
        let recover: Recover<P::Output, anyhow::Error, P::Failure> = Box::new(move |error| {
            let replacement = handler(error)?;
            Ok(AnyPublisher::new(MapError::new(
                replacement,
                erase_error::<R::Failure>,
            )))
        });
        attach_catch(&self.upstream, subscriber, recover);
    }
}

/// Turns an upstream error into the replacement, or the final error.
type Recover<O, F, E> = Box<dyn Fn(E) -> Result<AnyPublisher<O, F>, F> + Send + Sync>;

enum Phase {
    AwaitingUpstream,
    Upstream(Arc<dyn Subscription>),
    AwaitingReplacement,
    Replacement(Arc<dyn Subscription>),
    Terminated,
}

struct CatchSink<D: Subscriber, E> {
    phase: Mutex<Phase>,
    /// Set once the downstream handshake is over.
    open: AtomicBool,
    outbox: Outbox<D>,
    recover: Recover<D::Input, D::Failure, E>,
    me: Weak<CatchSink<D, E>>,
}

fn attach_catch<P, D>(
    upstream: &P,
    downstream: D,
    recover: Recover<P::Output, D::Failure, P::Failure>,
) where
    P: Publisher,
    D: Subscriber<Input = P::Output>,
{
    let sink = Arc::new_cyclic(|me| CatchSink {
        phase: Mutex::new(Phase::AwaitingUpstream),
        open: AtomicBool::new(false),
        outbox: Outbox::new(downstream),
        recover,
        me: me.clone(),
    });
    upstream.subscribe(sink);
}

impl<D: Subscriber, E: Send + 'static> CatchSink<D, E> {
    /// Move from the waiting phase `from` to `to`, if still in `from`.
    fn advance(&self, from: Phase, to: Phase) -> bool {
        let mut phase = lock(&self.phase);
        if mem::discriminant(&*phase) == mem::discriminant(&from) {
            *phase = to;
            true
        } else {
            false
        }
    }

    fn in_phase(&self, replacement: bool) -> bool {
        match *lock(&self.phase) {
            Phase::Upstream(_) => !replacement,
            Phase::Replacement(_) => replacement,
            _ => false,
        }
    }

    fn forward(&self, replacement: bool, input: D::Input) {
        if self.in_phase(replacement) {
            self.outbox.send(input);
        } else {
            log::trace!("dropping a value from an inactive phase");
        }
    }

    fn finish(&self, completion: Completion<D::Failure>) {
        *lock(&self.phase) = Phase::Terminated;
        self.outbox.complete(completion);
    }

    fn replacement_subscribed(&self, subscription: Arc<dyn Subscription>) {
        if !self.advance(Phase::AwaitingReplacement, Phase::Replacement(subscription.clone())) {
            log::debug!("cancelling a replacement subscription that is no longer wanted");
            subscription.cancel();
            return;
        }
        subscription.request(Demand::Unlimited);
    }

    fn replacement_completed(&self, completion: Completion<D::Failure>) {
        if self.in_phase(true) {
            self.finish(completion);
        }
    }
}

impl<D: Subscriber, E: Send + 'static> Subscriber for CatchSink<D, E> {
    type Input = D::Input;
    type Failure = E;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if !self.advance(Phase::AwaitingUpstream, Phase::Upstream(subscription.clone())) {
            log::debug!("ignoring a subscription on an already linked sink");
            subscription.cancel();
            return;
        }
        if let Some(me) = self.me.upgrade() {
            self.outbox.subscribe(me);
        }
        self.open.store(true, Ordering::SeqCst);
        subscription.request(Demand::Unlimited);
    }

    fn receive(&self, input: D::Input) -> Demand {
        self.forward(false, input);
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<E>) {
        {
            let mut phase = lock(&self.phase);
            if !matches!(*phase, Phase::Upstream(_)) {
                return;
            }
            *phase = Phase::AwaitingReplacement;
        }
        let error = match completion {
            Completion::Finished => return self.finish(Completion::Finished),
            Completion::Failure(error) => error,
        };
        match (self.recover)(error) {
            Ok(replacement) => {
                if let Some(me) = self.me.upgrade() {
                    replacement.subscribe(ReplacementLane { sink: me });
                }
            }
            Err(error) => self.finish(Completion::Failure(error)),
        }
    }
}

impl<D: Subscriber, E: Send + 'static> Subscription for CatchSink<D, E> {
    fn request(&self, demand: Demand) {
        if !self.open.load(Ordering::SeqCst) {
            log::trace!("request for {} during the handshake, unlimited follows", demand);
            return;
        }
        let current = match &*lock(&self.phase) {
            Phase::Upstream(subscription) | Phase::Replacement(subscription) => {
                Some(subscription.clone())
            }
            _ => None,
        };
        if let Some(subscription) = current {
            subscription.request(demand);
        }
    }

    fn cancel(&self) {
        let previous = mem::replace(&mut *lock(&self.phase), Phase::Terminated);
        if let Phase::Upstream(subscription) | Phase::Replacement(subscription) = previous {
            subscription.cancel();
        }
        self.outbox.cancel();
    }
}

/// Subscribes the sink to the replacement publisher.
struct ReplacementLane<D: Subscriber, E> {
    sink: Arc<CatchSink<D, E>>,
}

impl<D: Subscriber, E: Send + 'static> Subscriber for ReplacementLane<D, E> {
    type Input = D::Input;
    type Failure = D::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        self.sink.replacement_subscribed(subscription);
    }

    fn receive(&self, input: D::Input) -> Demand {
        self.sink.forward(true, input);
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<D::Failure>) {
        self.sink.replacement_completed(completion);
    }
}
