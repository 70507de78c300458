use crate::combinators::{Join, JoinState};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;

/// The latest value of every branch.
///
/// `fresh` records that a value arrived since the last output, so that each
/// value produces at most one output.
struct Latest<T> {
    slots: T,
    fresh: bool,
}

macro_rules! combine_latest {
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

        impl<$($P),+> JoinState for Latest<($(Option<$P>,)+)>
        where
            $($P: Clone + Send + 'static,)+
        {
            type Output = ($($P,)+);

            fn poll(&mut self) -> Option<Self::Output> {
                if !self.fresh {
                    return None;
                }
                self.fresh = false;
                Some(($(self.slots.$idx.clone()?,)+))
            }
        }

        impl<F, $($P),+> Publisher for $name<$($P),+>
        where
            F: Send + 'static,
            $($P: Publisher<Failure = F>, $P::Output: Clone,)+
        {
            type Output = ($($P::Output,)+);
            type Failure = F;

            fn subscribe<S>(&self, subscriber: S)
            where
                S: Subscriber<Input = Self::Output, Failure = F>,
            {
                let state = Latest {
                    slots: ($(None::<$P::Output>,)+),
                    fresh: false,
                };
                let join = Join::start(state, $count, subscriber);
                $(
                    self.$field.subscribe(join.lane($idx, |state, value| {
                        state.slots.$idx = Some(value);
                        state.fresh = true;
                    }));
                )+
            }
        }
    };
}

combine_latest! {
    /// Emits a tuple of the latest values of two publishers.
    ///
    /// Nothing is emitted until every branch has produced a value. From then
    /// on every new value, from any branch, emits the tuple of the most
    /// recent value of each branch. A branch that finishes without a value
    /// therefore prevents any output.
    ///
    /// ```
    /// # use backflow::{PassthroughSubject, PublisherExt};
    /// let letters = PassthroughSubject::<&str, ()>::new();
    /// let numbers = PassthroughSubject::<i32, ()>::new();
    /// let mut events = letters.clone().combine_latest(numbers.clone()).events();
    /// letters.send("a");
    /// numbers.send(1);
    /// numbers.send(2);
    /// letters.send("b");
    /// let seen: Vec<_> = events.by_ref().take(3).map(Result::unwrap).collect();
    /// assert_eq!(seen, vec![("a", 1), ("a", 2), ("b", 2)]);
    /// ```
    CombineLatest[2] { 0 a: A, 1 b: B }
}

combine_latest! {
    /// Like `CombineLatest`, with three publishers.
    CombineLatest3[3] { 0 a: A, 1 b: B, 2 c: C }
}

combine_latest! {
    /// Like `CombineLatest`, with four publishers.
    CombineLatest4[4] { 0 a: A, 1 b: B, 2 c: C, 3 d: D }
}

combine_latest! {
    /// Like `CombineLatest`, with five publishers.
    CombineLatest5[5] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E }
}
