use std::collections::VecDeque;

use crate::combinators::{Join, JoinState};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;

/// One queue of unpaired values per branch.
struct Queues<T> {
    queues: T,
}

macro_rules! zip {
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

        impl<$($P),+> JoinState for Queues<($(VecDeque<$P>,)+)>
        where
            $($P: Send + 'static,)+
        {
            type Output = ($($P,)+);

            fn poll(&mut self) -> Option<Self::Output> {
                if $(self.queues.$idx.is_empty())||+ {
                    return None;
                }
                Some(($(self.queues.$idx.pop_front()?,)+))
            }

            fn exhausted(&self, finished: &[bool]) -> bool {
                $((finished[$idx] && self.queues.$idx.is_empty()))||+
            }
        }

        impl<F, $($P),+> Publisher for $name<$($P),+>
        where
            F: Send + 'static,
            $($P: Publisher<Failure = F>,)+
        {
            type Output = ($($P::Output,)+);
            type Failure = F;

            fn subscribe<S>(&self, subscriber: S)
            where
                S: Subscriber<Input = Self::Output, Failure = F>,
            {
                let state = Queues {
                    queues: ($(VecDeque::<$P::Output>::new(),)+),
                };
                let join = Join::start(state, $count, subscriber);
                $(
                    self.$field.subscribe(join.lane($idx, |state, value| {
                        state.queues.$idx.push_back(value);
                    }));
                )+
            }
        }
    };
}

zip! {
    /// Pairs up the values of two publishers by position.
    ///
    /// The n-th output holds the n-th value of each branch, however far
    /// apart they arrive. Unpaired values wait in a queue. The zip finishes
    /// as soon as a finished branch has no value left to pair, dropping
    /// whatever the other branches still hold.
    ///
    /// ```
    /// # use backflow::{PublisherExt, Sequence};
    /// let pairs: Vec<_> = Sequence::new(vec![1, 2, 3])
    ///     .zip(Sequence::new(vec!["one", "two"]))
    ///     .events()
    ///     .collect();
    /// assert_eq!(pairs, vec![Ok((1, "one")), Ok((2, "two"))]);
    /// ```
    Zip[2] { 0 a: A, 1 b: B }
}

zip! {
    /// Like `Zip`, with three publishers.
    Zip3[3] { 0 a: A, 1 b: B, 2 c: C }
}

zip! {
    /// Like `Zip`, with four publishers.
    Zip4[4] { 0 a: A, 1 b: B, 2 c: C, 3 d: D }
}

zip! {
    /// Like `Zip`, with five publishers.
    Zip5[5] { 0 a: A, 1 b: B, 2 c: C, 3 d: D, 4 e: E }
}
