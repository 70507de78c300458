use std::collections::VecDeque;

use crate::combinators::{Join, JoinState};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;

/// Values in arrival order, waiting to be handed downstream.
struct Arrivals<O> {
    queue: VecDeque<O>,
}

impl<O> Arrivals<O> {
    fn new() -> Arrivals<O> {
        Arrivals {
            queue: VecDeque::new(),
        }
    }

    fn push(&mut self, value: O) {
        self.queue.push_back(value);
    }
}

impl<O: Send + 'static> JoinState for Arrivals<O> {
    type Output = O;

    fn poll(&mut self) -> Option<O> {
        self.queue.pop_front()
    }
}

macro_rules! merge {
    ($(#[$attr:meta])* $name:ident [$count:expr] { $($idx:tt $field:ident: $P:ident),+ }) => {
        $(#[$attr])*
        #[derive(Clone)]
        pub struct $name<$($P),+> {
            $($field: $P,)+
        }

        impl<$($P),+> $name<$($P),+> {
            pub(crate) fn new($($field: $P),+) -> $name<$($P),+> {
                $name { $($field),+ }
            }
        }

        impl<O, F, $($P),+> Publisher for $name<$($P),+>
        where
            O: Send + 'static,
            F: Send + 'static,
            $($P: Publisher<Output = O, Failure = F>,)+
        {
            type Output = O;
            type Failure = F;

            fn subscribe<S>(&self, subscriber: S)
            where
                S: Subscriber<Input = O, Failure = F>,
            {
                let join = Join::start(Arrivals::new(), $count, subscriber);
                $(self.$field.subscribe(join.lane($idx, Arrivals::push));)+
            }
        }
    };
}

merge! {
    /// Interleaves the values of two publishers as they arrive.
    ///
    /// Values of one branch keep their order, there is no order across
    /// branches. Finishes once both branches have finished.
    ///
    /// ```
    /// # use backflow::{PassthroughSubject, PublisherExt};
    /// let a = PassthroughSubject::<i32, ()>::new();
    /// let b = PassthroughSubject::<i32, ()>::new();
    /// let mut events = a.clone().merge(b.clone()).events();
    /// a.send(1);
    /// b.send(2);
    /// a.send(3);
    /// let seen: Vec<_> = events.by_ref().take(3).map(Result::unwrap).collect();
    /// assert_eq!(seen, vec![1, 2, 3]);
    /// ```
    Merge[2] { 0 a: A, 1 b: B }
}

merge! {
    /// Like `Merge`, with three publishers.
    Merge3[3] { 0 a: A, 1 b: B, 2 c: C }
}

merge! {
    /// Like `Merge`, with four publishers.
    Merge4[4] { 0 a: A, 1 b: B, 2 c: C, 3 d: D }
}

merge! {
    /// Like `Merge`, with five publishers.
    Merge5[5] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E }
}

merge! {
    /// Like `Merge`, with six publishers.
    Merge6[6] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E, 5 f: G }
}

merge! {
    /// Like `Merge`, with seven publishers.
    Merge7[7] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E, 5 f: G, 6 g: H }
}

merge! {
    /// Like `Merge`, with eight publishers.
    Merge8[8] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E, 5 f: G, 6 g: H, 7 h: J }
}

/// Merges any number of publishers of the same type.
///
/// More branches can be added with `merge` as long as the value has not been
/// subscribed. Each subscription merges the branches present at that time.
/// With no branches at all, it finishes right away.
///
/// ```
/// # use backflow::{AnyPublisher, Just, Never, PublisherExt, Sequence};
/// # use backflow::combinators::MergeMany;
/// let sources: Vec<AnyPublisher<i32, Never>> = vec![Just::new(1).erase()];
/// let merged = MergeMany::new(sources).merge(Sequence::new(vec![2, 3]).erase());
/// let values: Vec<_> = merged.events().map(Result::unwrap).collect();
/// assert_eq!(values, vec![1, 2, 3]);
/// ```
#[derive(Clone)]
pub struct MergeMany<P> {
    branches: Vec<P>,
}

impl<P: Publisher> MergeMany<P> {
    /// Merge every publisher of `branches`.
    pub fn new<I: IntoIterator<Item = P>>(branches: I) -> MergeMany<P> {
        MergeMany {
            branches: branches.into_iter().collect(),
        }
    }

    /// Add one more branch.
    pub fn merge(mut self, other: P) -> MergeMany<P> {
        self.branches.push(other);
        self
    }

    /// The number of branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Whether there are no branches.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl<P: Publisher> Publisher for MergeMany<P> {
    type Output = P::Output;
    type Failure = P::Failure;

    fn subscribe<S>(&self, subscriber: S)
    where
        S: Subscriber<Input = P::Output, Failure = P::Failure>,
    {
        let join = Join::start(Arrivals::new(), self.branches.len(), subscriber);
        for (index, branch) in self.branches.iter().enumerate() {
            branch.subscribe(join.lane(index, Arrivals::push));
        }
    }
}
