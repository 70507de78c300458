use std::fmt;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancellable::{AnyCancellable, Cancellable};
use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::subscription::{Subscription, Upstream};

/// A blocking iterator over the signals of a publisher.
///
/// Yields `Ok` for every value and a final `Err` if the publisher fails.
/// The iterator ends after the terminal signal. Values are buffered without
/// bound, so a fast publisher is never held back by a slow reader.
///
/// Dropping the iterator cancels the subscription.
///
/// ```
/// # use backflow::{PublisherExt, Sequence};
/// let squares: Vec<_> = Sequence::new(1..4)
///     .map(|x| x * x)
///     .events()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(squares, vec![1, 4, 9]);
/// ```
pub struct Events<O, F> {
    receiver: Receiver<Result<O, F>>,
    handle: AnyCancellable,
}

impl<O: Send + 'static, F: Send + 'static> Events<O, F> {
    pub(crate) fn subscribe<P>(publisher: &P) -> Events<O, F>
    where
        P: Publisher<Output = O, Failure = F> + ?Sized,
    {
        let (sender, receiver) = mpsc::channel();
        let channel = Arc::new(Channel {
            link: Upstream::new(),
            sender: Mutex::new(Some(sender)),
        });
        publisher.subscribe(channel.clone());
        Events {
            receiver,
            handle: AnyCancellable::new(channel),
        }
    }
}

impl<O, F> Events<O, F> {
    /// Wait at most `timeout` for the next signal.
    ///
    /// Returns `None` if nothing arrived in time, or if the stream has
    /// ended.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Result<O, F>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take every signal that has already arrived, without blocking.
    pub fn drain(&mut self) -> Vec<Result<O, F>> {
        self.receiver.try_iter().collect()
    }

    /// Stop the subscription. Signals already buffered can still be read.
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl<O, F> Iterator for Events<O, F> {
    type Item = Result<O, F>;

    fn next(&mut self) -> Option<Result<O, F>> {
        self.receiver.recv().ok()
    }
}

impl<O, F> fmt::Debug for Events<O, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Events")
            .field("cancelled", &self.handle.is_cancelled())
            .finish()
    }
}

/// The subscriber side of `Events`. Dropping the sender ends the iterator.
struct Channel<O, F> {
    link: Upstream,
    sender: Mutex<Option<Sender<Result<O, F>>>>,
}

impl<O, F> Channel<O, F> {
    fn send(&self, signal: Result<O, F>) {
        if let Some(sender) = lock(&self.sender).as_ref() {
            if sender.send(signal).is_err() {
                log::trace!("events iterator gone, dropping a signal");
            }
        }
    }
}

impl<O: Send + 'static, F: Send + 'static> Subscriber for Channel<O, F> {
    type Input = O;
    type Failure = F;

    fn receive_subscription(&self, subscription: Arc<dyn Subscription>) {
        if self.link.attach(subscription) {
            self.link.request(Demand::Unlimited);
        }
    }

    fn receive(&self, input: O) -> Demand {
        if self.link.is_subscribed() {
            self.send(Ok(input));
        }
        Demand::none()
    }

    fn receive_completion(&self, completion: Completion<F>) {
        if !self.link.complete() {
            return;
        }
        if let Completion::Failure(error) = completion {
            self.send(Err(error));
        }
        lock(&self.sender).take();
    }
}

impl<O: Send + 'static, F: Send + 'static> Cancellable for Channel<O, F> {
    fn cancel(&self) {
        self.link.cancel();
        lock(&self.sender).take();
    }
}

#[cfg(test)]
mod test {
    use std::thread;
    use std::time::Duration;

    use crate::completion::Completion;
    use crate::ext::PublisherExt;
    use crate::publishers::{Fail, PassthroughSubject, Sequence};

    #[test]
    fn collects_until_finished() {
        let events: Vec<_> = Sequence::new(vec!['a', 'b']).events().collect();
        assert_eq!(events, vec![Ok('a'), Ok('b')]);
    }

    #[test]
    fn failure_is_last_item() {
        let events: Vec<_> = Fail::<i32, _>::new("gone").events().collect();
        assert_eq!(events, vec![Err("gone")]);
    }

    #[test]
    fn blocks_for_values_from_another_thread() {
        let subject = PassthroughSubject::<u32, ()>::new();
        let events = subject.events();
        let producer = subject.clone();
        let worker = thread::spawn(move || {
            producer.feed(0..100);
            producer.send_completion(Completion::Finished);
        });
        let values: Vec<_> = events.map(Result::unwrap).collect();
        worker.join().unwrap();
        assert_eq!(values, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn timeout_and_cancel() {
        let subject = PassthroughSubject::<u32, ()>::new();
        let mut events = subject.events();
        assert_eq!(events.next_timeout(Duration::from_millis(5)), None);
        subject.send(7);
        events.cancel();
        subject.send(8);
        assert_eq!(events.drain(), vec![Ok(7)]);
        assert_eq!(events.next(), None);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn drop_cancels() {
        let subject = PassthroughSubject::<u32, ()>::new();
        drop(subject.events());
        assert_eq!(subject.subscriber_count(), 0);
    }
}
