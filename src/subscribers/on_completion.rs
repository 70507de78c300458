use std::sync::{Arc, Mutex};

use crate::cancellable::Cancellable;
use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

type Callback<I, F> = Box<dyn FnOnce(Result<Option<I>, F>) + Send>;

/// A subscriber that reports the outcome of a stream once, at its end.
///
/// The callback receives `Ok` with the last value, if there was any, when
/// upstream finishes, and `Err` with the failure otherwise. Earlier values
/// are dropped. The callback runs at most once; cancelling before the end
/// means it never runs.
pub struct OnCompletion<I, F> {
    link: Upstream,
    last: Mutex<Option<I>>,
    callback: Mutex<Option<Callback<I, F>>>,
}

impl<I, F> OnCompletion<I, F> {
    /// Report the outcome to `callback`.
    pub fn new<C>(callback: C) -> OnCompletion<I, F>
    where
        C: FnOnce(Result<Option<I>, F>) + Send + 'static,
    {
        OnCompletion {
            link: Upstream::new(),
            last: Mutex::new(None),
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }
}

impl<I: Send + 'static, F: Send + 'static> Subscriber for OnCompletion<I, F> {
    type Input = I;
    type Failure = F;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.link.request(Demand::Unlimited);
        }
    }

    fn receive(&self, input: I) -> Demand {
        if self.link.is_subscribed() {
            *lock(&self.last) = Some(input);
        }
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<F>) {
        if !self.link.complete() {
            return;
        }
        let last = lock(&self.last).take();
        let callback = lock(&self.callback).take();
        if let Some(callback) = callback {
            callback(completion.into_result().map(|()| last));
        }
    }
}

impl<I: Send + 'static, F: Send + 'static> Cancellable for OnCompletion<I, F> {
    fn cancel(&self) {
        self.link.cancel();
        let callback = lock(&self.callback).take();
        let last = lock(&self.last).take();
        drop((callback, last));
    }
}

#[cfg(test)]
mod test {
    use std::sync::mpsc;

    use crate::completion::Completion;
    use crate::ext::PublisherExt;
    use crate::publishers::{Empty, Fail, PassthroughSubject, Sequence};

    #[test]
    fn reports_last_value() {
        let (tx, rx) = mpsc::channel();
        let _handle = Sequence::new(vec![1, 2, 3]).on_completion(move |result| {
            tx.send(result).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), Ok(Some(3)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reports_nothing_for_empty() {
        let (tx, rx) = mpsc::channel();
        let _handle = Empty::<i32>::new().on_completion(move |result| {
            tx.send(result).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), Ok(None));
    }

    #[test]
    fn reports_failure() {
        let (tx, rx) = mpsc::channel();
        let _handle = Fail::<i32, _>::new("denied").on_completion(move |result| {
            tx.send(result).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), Err("denied"));
    }

    #[test]
    fn cancelled_before_end_never_reports() {
        let subject = PassthroughSubject::<i32, ()>::new();
        let (tx, rx) = mpsc::channel();
        let handle = subject.on_completion(move |result| {
            tx.send(result).unwrap();
        });
        subject.send(1);
        drop(handle);
        subject.send_completion(Completion::Finished);
        assert!(rx.recv().is_err());
    }
}
