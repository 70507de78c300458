use std::marker::PhantomData;

use crate::completion::{Completion, Never};
use crate::publisher::Publisher;
use crate::publishers::emitter::Emitter;
use crate::subscriber::Subscriber;

/// Emits the items of a collection, then finishes.
///
/// Every subscription iterates over a fresh clone of the collection, honoring
/// demand item by item.
///
/// ```
/// # use backflow::{PublisherExt, Sequence};
/// let doubled: Vec<_> = Sequence::new(vec![1, 2, 3])
///     .map(|x| x * 2)
///     .events()
///     .collect();
/// assert_eq!(doubled, vec![Ok(2), Ok(4), Ok(6)]);
/// ```
pub struct Sequence<C, F = Never> {
    items: C,
    marker: PhantomData<fn() -> F>,
}

impl<C: Clone, F> Clone for Sequence<C, F> {
    fn clone(&self) -> Sequence<C, F> {
        Sequence {
            items: self.items.clone(),
            marker: PhantomData,
        }
    }
}

impl<C> Sequence<C, Never> {
    /// A publisher of `items` that cannot fail.
    pub fn new(items: C) -> Sequence<C, Never> {
        Sequence::with_failure(items)
    }
}

impl<C, F> Sequence<C, F> {
    /// A publisher of `items` with an arbitrary failure type.
    pub fn with_failure(items: C) -> Sequence<C, F> {
        Sequence {
            items,
            marker: PhantomData,
        }
    }
}

impl<C, F> Publisher for Sequence<C, F>
where
    C: IntoIterator + Clone + Send + Sync + 'static,
    C::IntoIter: Send + 'static,
    C::Item: Send + 'static,
    F: Send + 'static,
{
    type Output = C::Item;
    type Failure = F;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = C::Item, Failure = F>,
    {
        Emitter::start(subscriber, self.items.clone().into_iter(), Completion::Finished);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::demand::Demand;
    use crate::testing::Recorder;

    #[test]
    fn every_subscription_starts_over() {
        let sequence = Sequence::new(vec!['a', 'b', 'c']);
        let first = Recorder::with_demand(Demand::max(2));
        let second = Recorder::new();
        sequence.subscribe(first.clone());
        sequence.subscribe(second.clone());
        assert_eq!(first.values(), vec!['a', 'b']);
        assert_eq!(second.values(), vec!['a', 'b', 'c']);
        assert_eq!(first.completions(), 0);
        assert_eq!(second.completions(), 1);
    }

    #[test]
    fn ranges_are_sequences() {
        let recorder = Recorder::<u32, ()>::new();
        Sequence::with_failure(1..4).subscribe(recorder.clone());
        assert_eq!(recorder.values(), vec![1, 2, 3]);
    }
}
