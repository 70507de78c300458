//! Observing a pipeline without changing it.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::outbox::Outbox;
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

type Hook<A> = Option<Arc<dyn Fn(A) + Send + Sync>>;

/// Callbacks run by `HandleEvents` as signals pass through.
///
/// Every hook is optional. Hooks run on whatever thread carries the signal
/// and must not block.
///
/// ```
/// # use std::sync::{Arc, Mutex};
/// # use backflow::{PublisherExt, Sequence};
/// # use backflow::operators::EventHooks;
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let hooks = EventHooks::new().on_output(move |x: &i32| log.lock().unwrap().push(*x));
/// let _done = Sequence::new(vec![1, 2]).handle_events(hooks).sink_values(|_| ());
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// ```
pub struct EventHooks<O, F> {
    subscription: Hook<()>,
    output: Option<Arc<dyn Fn(&O) + Send + Sync>>,
    completion: Option<Arc<dyn Fn(&Completion<F>) + Send + Sync>>,
    cancel: Hook<()>,
    request: Hook<Demand>,
}

impl<O, F> Clone for EventHooks<O, F> {
    fn clone(&self) -> EventHooks<O, F> {
        EventHooks {
            subscription: self.subscription.clone(),
            output: self.output.clone(),
            completion: self.completion.clone(),
            cancel: self.cancel.clone(),
            request: self.request.clone(),
        }
    }
}

impl<O, F> Default for EventHooks<O, F> {
    fn default() -> EventHooks<O, F> {
        EventHooks {
            subscription: None,
            output: None,
            completion: None,
            cancel: None,
            request: None,
        }
    }
}

impl<O, F> EventHooks<O, F> {
    /// No hooks at all.
    pub fn new() -> EventHooks<O, F> {
        EventHooks::default()
    }

    /// Run `hook` when the upstream subscription arrives.
    pub fn on_subscription(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.subscription = Some(Arc::new(move |()| hook()));
        self
    }

    /// Run `hook` on every value.
    pub fn on_output(mut self, hook: impl Fn(&O) + Send + Sync + 'static) -> Self {
        self.output = Some(Arc::new(hook));
        self
    }

    /// Run `hook` on the completion.
    pub fn on_completion(mut self, hook: impl Fn(&Completion<F>) + Send + Sync + 'static) -> Self {
        self.completion = Some(Arc::new(hook));
        self
    }

    /// Run `hook` when the downstream cancels.
    pub fn on_cancel(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(move |()| hook()));
        self
    }

    /// Run `hook` whenever the downstream requests demand.
    pub fn on_request(mut self, hook: impl Fn(Demand) + Send + Sync + 'static) -> Self {
        self.request = Some(Arc::new(hook));
        self
    }
}

impl<O: fmt::Debug, F: fmt::Debug> EventHooks<O, F> {
    /// Hooks that log every signal at `info` level, prefixed by `prefix`.
    pub fn logging(prefix: impl Into<String>) -> EventHooks<O, F> {
        let prefix: Arc<str> = prefix.into().into();
        let (p1, p2, p3, p4, p5) = (
            prefix.clone(),
            prefix.clone(),
            prefix.clone(),
            prefix.clone(),
            prefix,
        );
        EventHooks::new()
            .on_subscription(move || log::info!("{}: received subscription", p1))
            .on_output(move |value| log::info!("{}: received value {:?}", p2, value))
            .on_completion(move |completion| match completion {
                Completion::Finished => log::info!("{}: finished", p3),
                Completion::Failure(error) => log::info!("{}: failed with {:?}", p3, error),
            })
            .on_cancel(move || log::info!("{}: cancelled", p4))
            .on_request(move |demand| log::info!("{}: requested {}", p5, demand))
    }
}

/// Runs `EventHooks` on every signal and forwards it unchanged.
///
/// `print` builds one of these with logging hooks.
pub struct HandleEvents<P: Publisher> {
    upstream: P,
    hooks: EventHooks<P::Output, P::Failure>,
}

impl<P: Publisher + Clone> Clone for HandleEvents<P> {
    fn clone(&self) -> HandleEvents<P> {
        HandleEvents {
            upstream: self.upstream.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<P: Publisher> HandleEvents<P> {
    pub(crate) fn new(upstream: P, hooks: EventHooks<P::Output, P::Failure>) -> HandleEvents<P> {
        HandleEvents { upstream, hooks }
    }
}

impl<P: Publisher> Publisher for HandleEvents<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let sink = Arc::new_cyclic(|me| HandleEventsSink {
            upstream: Upstream::new(),
            outbox: Outbox::new(subscriber),
            hooks: self.hooks.clone(),
            me: me.clone(),
        });
        self.upstream.subscribe(sink);
    }
}

struct HandleEventsSink<D: Subscriber> {
    upstream: Upstream,
    outbox: Outbox<D>,
    hooks: EventHooks<D::Input, D::Failure>,
    me: Weak<HandleEventsSink<D>>,
}

impl<D: Subscriber> Subscriber for HandleEventsSink<D> {
    type Input = D::Input;
    type Failure = D::Failure;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if !self.upstream.attach(subscription) {
            return;
        }
        if let Some(hook) = &self.hooks.subscription {
            hook(());
        }
        if let Some(me) = self.me.upgrade() {
            self.outbox.subscribe(me);
        }
        self.upstream.open();
    }

    fn receive(&self, input: D::Input) -> Demand {
        if !self.upstream.is_subscribed() {
            log::trace!("dropping a value received outside of a live subscription");
            return Demand::none();
        }
        if let Some(hook) = &self.hooks.output {
            hook(&input);
        }
        self.outbox.send(input);
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<D::Failure>) {
        if !self.upstream.complete() {
            log::trace!("dropping a completion received outside of a live subscription");
            return;
        }
        if let Some(hook) = &self.hooks.completion {
            hook(&completion);
        }
        self.outbox.complete(completion);
    }
}

impl<D: Subscriber> Subscription for HandleEventsSink<D> {
    fn request(&self, demand: Demand) {
        if let Some(hook) = &self.hooks.request {
            hook(demand);
        }
        self.upstream.forward(demand);
    }

    fn cancel(&self) {
        let cancelled = self.upstream.cancel();
        self.outbox.cancel();
        if !cancelled {
            return;
        }
        if let Some(hook) = &self.hooks.cancel {
            hook(());
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ext::PublisherExt;
    use crate::publishers::{PassthroughSubject, Sequence};
    use crate::testing::{init_logging, Event, Recorder};

    type Journal = Arc<Mutex<Vec<String>>>;

    fn journal() -> (Journal, EventHooks<i32, String>) {
        let entries: Journal = Arc::default();
        let write = |entries: &Journal| {
            let entries = entries.clone();
            move |entry: String| entries.lock().unwrap().push(entry)
        };
        let (a, b, c, d, e) = (
            write(&entries),
            write(&entries),
            write(&entries),
            write(&entries),
            write(&entries),
        );
        let hooks = EventHooks::new()
            .on_subscription(move || a("subscription".to_string()))
            .on_output(move |x| b(format!("value {}", x)))
            .on_completion(move |done| c(format!("completion {:?}", done)))
            .on_cancel(move || d("cancel".to_string()))
            .on_request(move |n| e(format!("request {}", n)));
        (entries, hooks)
    }

    #[test]
    fn hooks_see_every_signal() {
        let (entries, hooks) = journal();
        let subject = PassthroughSubject::<i32, String>::new();
        let recorder = Recorder::new();
        subject.clone().handle_events(hooks).subscribe(recorder.clone());
        subject.feed(vec![1, 2]);
        subject.send_completion(Completion::Finished);
        assert_eq!(recorder.values(), vec![1, 2]);
        assert_eq!(
            *entries.lock().unwrap(),
            vec![
                "subscription",
                "request unlimited",
                "value 1",
                "value 2",
                "completion Finished"
            ]
        );
    }

    #[test]
    fn cancel_hook_runs_once() {
        let (entries, hooks) = journal();
        let subject = PassthroughSubject::<i32, String>::new();
        let recorder = Recorder::new();
        subject.clone().handle_events(hooks).subscribe(recorder.clone());
        recorder.cancel();
        recorder.cancel();
        subject.send(5);
        let cancels = entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| *entry == "cancel")
            .count();
        assert_eq!(cancels, 1);
        assert!(recorder.values().is_empty());
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn cancel_from_completion_hook_stops_delivery() {
        let subject = PassthroughSubject::<i32, String>::new();
        let recorder = Recorder::new();
        let canceller = recorder.clone();
        subject
            .clone()
            .handle_events(EventHooks::new().on_completion(move |_| canceller.cancel()))
            .subscribe(recorder.clone());
        subject.send(1);
        subject.send_completion(Completion::Finished);
        assert_eq!(recorder.events(), vec![Event::Subscribed, Event::Value(1)]);
    }

    #[test]
    fn print_forwards_unchanged() {
        init_logging();
        let recorder = Recorder::new();
        Sequence::new(vec!["a", "b"])
            .print("letters")
            .subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec!["a", "b"]);
        assert!(recorder.is_finished());
    }
}
