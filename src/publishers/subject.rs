//! Publishers that values are pushed into.

use std::sync::{Arc, Mutex};
use std::thread;

use crate::completion::Completion;
use crate::lock;
use crate::publisher::Publisher;
use crate::source::{broadcast, finish_all, Overflow, Source};
use crate::subscriber::{erase, Subscriber};

/// A subject that broadcasts values to its current subscribers.
///
/// This is the way to get values into a pipeline imperatively. Every value
/// sent into the subject is delivered to every subscriber that has demand
/// for it, and dropped for those that have none. Subscribers that arrive
/// after the subject completed receive the completion right away.
///
/// ```
/// # use backflow::{Completion, Never, PassthroughSubject, PublisherExt};
/// let subject = PassthroughSubject::<i32, Never>::new();
/// let mut events = subject.events();
/// subject.send(5);
/// subject.send_completion(Completion::Finished);
/// assert_eq!(events.next(), Some(Ok(5)));
/// assert_eq!(events.next(), None);
/// ```
///
/// # Asynchronous calls
///
/// Values may be sent from a new thread with `send_async` and `feed_async`.
/// Ordering between separate asynchronous calls is not guaranteed. In this
/// example either value may come first:
///
/// ```
/// # use backflow::{Never, PassthroughSubject, PublisherExt};
/// let subject = PassthroughSubject::<i32, Never>::new();
/// let mut events = subject.events();
/// subject.send_async(13);
/// subject.send_async(22);
/// let first = events.next().unwrap().unwrap();
/// assert!(first == 13 || first == 22);
/// ```
///
/// `feed_async` preserves the order of the iterator it is given, although
/// values sent in the meantime may be interleaved with it.
pub struct PassthroughSubject<O: Send + 'static, F: Send + 'static> {
    source: Arc<Mutex<Source<O, F>>>,
}

impl<O: Send + 'static, F: Send + 'static> Clone for PassthroughSubject<O, F> {
    fn clone(&self) -> PassthroughSubject<O, F> {
        PassthroughSubject {
            source: self.source.clone(),
        }
    }
}

impl<O, F> Default for PassthroughSubject<O, F>
where
    O: Clone + Send + 'static,
    F: Clone + Send + 'static,
{
    fn default() -> PassthroughSubject<O, F> {
        PassthroughSubject::new()
    }
}

impl<O, F> PassthroughSubject<O, F>
where
    O: Clone + Send + 'static,
    F: Clone + Send + 'static,
{
    /// Create a new subject.
    pub fn new() -> PassthroughSubject<O, F> {
        PassthroughSubject {
            source: Arc::new(Mutex::new(Source::new())),
        }
    }

    /// Send a value to all subscribers.
    ///
    /// Does nothing once the subject has completed.
    pub fn send(&self, value: O) {
        let conduits = lock(&self.source).live();
        broadcast(conduits, value);
    }

    /// Complete the subject.
    ///
    /// Only the first completion has an effect.
    pub fn send_completion(&self, completion: Completion<F>) {
        let completed = lock(&self.source).complete(completion);
        if let Some((conduits, completion)) = completed {
            finish_all(conduits, completion);
        }
    }

    /// Send all values of an iterator, in order.
    pub fn feed<I: IntoIterator<Item = O>>(&self, values: I) {
        for value in values {
            self.send(value);
        }
    }

    /// Send a value from a new thread.
    pub fn send_async(&self, value: O) {
        let clone = self.clone();
        thread::spawn(move || clone.send(value));
    }

    /// Feed an iterator from a new thread.
    ///
    /// Useful if the iterator is large, infinite, or blocks, such as an I/O
    /// event loop.
    pub fn feed_async<I>(&self, values: I)
    where
        I: IntoIterator<Item = O> + Send + 'static,
    {
        let clone = self.clone();
        thread::spawn(move || clone.feed(values));
    }

    /// The number of subscribers still listening.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.source).live().len()
    }
}

impl<O, F> Publisher for PassthroughSubject<O, F>
where
    O: Clone + Send + 'static,
    F: Clone + Send + 'static,
{
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        let registration = lock(&self.source).register(erase(subscriber), None, Overflow::Drop);
        registration.start();
    }
}

struct Current<O: Send + 'static, F: Send + 'static> {
    source: Source<O, F>,
    value: O,
}

/// A subject that holds a current value.
///
/// New subscribers receive the current value first, as soon as they request
/// one. A subscriber without demand receives the newest value once it asks
/// for more, intermediate values are skipped.
///
/// ```
/// # use backflow::{CurrentValueSubject, Never, PublisherExt};
/// let subject = CurrentValueSubject::<_, Never>::new(1);
/// let mut events = subject.events();
/// subject.send(2);
/// assert_eq!(subject.value(), 2);
/// assert_eq!(events.next(), Some(Ok(1)));
/// assert_eq!(events.next(), Some(Ok(2)));
/// ```
pub struct CurrentValueSubject<O: Send + 'static, F: Send + 'static> {
    current: Arc<Mutex<Current<O, F>>>,
}

impl<O: Send + 'static, F: Send + 'static> Clone for CurrentValueSubject<O, F> {
    fn clone(&self) -> CurrentValueSubject<O, F> {
        CurrentValueSubject {
            current: self.current.clone(),
        }
    }
}

impl<O, F> CurrentValueSubject<O, F>
where
    O: Clone + Send + 'static,
    F: Clone + Send + 'static,
{
    /// Create a subject holding `value`.
    pub fn new(value: O) -> CurrentValueSubject<O, F> {
        CurrentValueSubject {
            current: Arc::new(Mutex::new(Current {
                source: Source::new(),
                value,
            })),
        }
    }

    /// The current value.
    pub fn value(&self) -> O {
        lock(&self.current).value.clone()
    }

    /// Replace the current value and send it to all subscribers.
    ///
    /// Does nothing once the subject has completed.
    pub fn send(&self, value: O) {
        let conduits = {
            let mut current = lock(&self.current);
            if current.source.is_completed() {
                return;
            }
            current.value = value.clone();
            current.source.live()
        };
        broadcast(conduits, value);
    }

    /// Complete the subject.
    ///
    /// Only the first completion has an effect.
    pub fn send_completion(&self, completion: Completion<F>) {
        let completed = lock(&self.current).source.complete(completion);
        if let Some((conduits, completion)) = completed {
            finish_all(conduits, completion);
        }
    }

    /// The number of subscribers still listening.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.current).source.live().len()
    }
}

impl<O, F> Publisher for CurrentValueSubject<O, F>
where
    O: Clone + Send + 'static,
    F: Clone + Send + 'static,
{
    type Output = O;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = O, Failure = F>,
    {
        let registration = {
            let mut current = lock(&self.current);
            let value = current.value.clone();
            current
                .source
                .register(erase(subscriber), Some(value), Overflow::KeepLatest)
        };
        registration.start();
    }
}
