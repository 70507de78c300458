use std::sync::{Arc, Mutex};

use crate::cancellable::Cancellable;
use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

type OnValue<I> = Arc<dyn Fn(I) + Send + Sync>;
type OnDone<F> = Box<dyn FnOnce(Completion<F>) + Send>;

/// A subscriber that runs closures on values and on the completion.
///
/// Requests unlimited demand as soon as it is subscribed. Cancelling it
/// cancels the subscription and drops both closures.
pub struct Sink<I, F> {
    link: Upstream,
    on_value: Mutex<Option<OnValue<I>>>,
    on_completion: Mutex<Option<OnDone<F>>>,
}

impl<I, F> Sink<I, F> {
    /// A sink calling `on_completion` once at the end and `on_value` for
    /// every value.
    pub fn new<C, V>(on_completion: C, on_value: V) -> Sink<I, F>
    where
        C: FnOnce(Completion<F>) + Send + 'static,
        V: Fn(I) + Send + Sync + 'static,
    {
        Sink {
            link: Upstream::new(),
            on_value: Mutex::new(Some(Arc::new(on_value))),
            on_completion: Mutex::new(Some(Box::new(on_completion))),
        }
    }

    fn release(&self) {
        let value = lock(&self.on_value).take();
        let completion = lock(&self.on_completion).take();
        drop((value, completion));
    }
}

impl<I: Send + 'static, F: Send + 'static> Subscriber for Sink<I, F> {
    type Input = I;
    type Failure = F;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.link.request(Demand::Unlimited);
        }
    }

    fn receive(&self, input: I) -> Demand {
        if !self.link.is_subscribed() {
            log::trace!("sink dropping a value received outside of a live subscription");
            return Demand::none();
        }
        let on_value = lock(&self.on_value).clone();
        if let Some(on_value) = on_value {
            on_value(input);
        }
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<F>) {
        if !self.link.complete() {
            return;
        }
        let on_completion = lock(&self.on_completion).take();
        lock(&self.on_value).take();
        if let Some(on_completion) = on_completion {
            on_completion(completion);
        }
    }
}

impl<I: Send + 'static, F: Send + 'static> Cancellable for Sink<I, F> {
    fn cancel(&self) {
        self.link.cancel();
        self.release();
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ext::PublisherExt;
    use crate::publisher::Publisher;
    use crate::publishers::{PassthroughSubject, Sequence};

    #[test]
    fn values_then_completion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (values, done) = (log.clone(), log.clone());
        let _handle = Sequence::new(vec![1, 2]).sink(
            move |completion| done.lock().unwrap().push(format!("{:?}", completion)),
            move |x| values.lock().unwrap().push(x.to_string()),
        );
        assert_eq!(*log.lock().unwrap(), vec!["1", "2", "Finished"]);
    }

    #[test]
    fn cancel_releases_closures() {
        let subject = PassthroughSubject::<i32, ()>::new();
        let token = Arc::new(());
        let held = token.clone();
        let sink = Arc::new(Sink::new(|_| (), move |_: i32| {
            let _ = &held;
        }));
        subject.subscribe(sink.clone());
        assert_eq!(Arc::strong_count(&token), 2);
        sink.cancel();
        assert_eq!(Arc::strong_count(&token), 1);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn handle_drop_cancels() {
        let subject = PassthroughSubject::<i32, ()>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let store = seen.clone();
        let handle = subject.sink(|_| (), move |x| store.lock().unwrap().push(x));
        subject.send(1);
        drop(handle);
        subject.send(2);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(subject.subscriber_count(), 0);
    }
}
