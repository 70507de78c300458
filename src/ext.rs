//! Fluent construction of pipelines.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cancellable::AnyCancellable;
use crate::combinators::{
    CombineLatest, CombineLatest3, CombineLatest4, CombineLatest5, Merge, Merge3, Merge4, Merge5,
    Merge6, Merge7, Merge8, Zip, Zip3, Zip4, Zip5,
};
use crate::completion::{Completion, Never};
use crate::operators::{
    AllSatisfy, Catch, CompactMap, Contains, ContainsWhere, Count, Debounce, Decode, Decoder,
    EventHooks, Filter, HandleEvents, IgnoreOutput, Map, MapError, ReceiveOn, Reduce,
    RemoveDuplicates, ReplaceEmpty, ReplaceError, ReplaceNil, Retry, Scan, TryAllSatisfy, TryCatch,
    TryCompactMap, TryContainsWhere, TryFilter, TryMap, TryReduce, TryRemoveDuplicates, TryScan,
};
#[cfg(feature = "regex")]
use crate::operators::{FirstMatch, Matches};
use crate::publisher::{AnyPublisher, Publisher};
use crate::scheduler::Scheduler;
use crate::subscribers::{Assign, Events, OnCompletion, Sink};

/// Operators and terminal subscribers available on every publisher.
///
/// Operators consume the publisher and wrap it. Terminal methods borrow it,
/// subscribe, and hand back what controls the subscription: an
/// `AnyCancellable`, or the `Events` iterator.
///
/// ```
/// # use backflow::{PublisherExt, Sequence};
/// let total = Sequence::new(vec![3, 4, 5])
///     .filter(|x| x % 2 == 1)
///     .map(|x| x * 10)
///     .reduce(0, |acc, x| acc + x)
///     .events()
///     .next();
/// assert_eq!(total, Some(Ok(80)));
/// ```
pub trait PublisherExt: Publisher + Sized {
    /// Transform every value.
    fn map<O, F>(self, transform: F) -> Map<Self, F>
    where
        F: Fn(Self::Output) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(self, transform)
    }

    /// Transform every value with a closure that may fail.
    ///
    /// The first error cancels upstream and fails the stream.
    fn try_map<O, F>(self, transform: F) -> TryMap<Self, F>
    where
        F: Fn(Self::Output) -> anyhow::Result<O> + Send + Sync + 'static,
        O: Send + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryMap::new(self, transform)
    }

    /// Transform the failure, leaving values untouched.
    fn map_error<E, F>(self, transform: F) -> MapError<Self, F>
    where
        F: Fn(Self::Failure) -> E + Send + Sync + 'static,
        E: Send + 'static,
    {
        MapError::new(self, transform)
    }

    /// Replace `None` values with `default`.
    fn replace_nil<O>(self, default: O) -> ReplaceNil<Self, O>
    where
        Self: Publisher<Output = Option<O>>,
        O: Clone + Send + Sync + 'static,
    {
        ReplaceNil::new(self, default)
    }

    /// Keep only the values matching `predicate`.
    fn filter<F>(self, predicate: F) -> Filter<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        Filter::new(self, predicate)
    }

    /// Keep only the values matching a predicate that may fail.
    fn try_filter<F>(self, predicate: F) -> TryFilter<Self, F>
    where
        F: Fn(&Self::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryFilter::new(self, predicate)
    }

    /// Transform every value and drop the `None` results.
    fn compact_map<O, F>(self, transform: F) -> CompactMap<Self, F>
    where
        F: Fn(Self::Output) -> Option<O> + Send + Sync + 'static,
        O: Send + 'static,
    {
        CompactMap::new(self, transform)
    }

    /// Like `compact_map`, with a closure that may fail.
    fn try_compact_map<O, F>(self, transform: F) -> TryCompactMap<Self, F>
    where
        F: Fn(Self::Output) -> anyhow::Result<Option<O>> + Send + Sync + 'static,
        O: Send + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryCompactMap::new(self, transform)
    }

    /// Fold all values into one, emitted when upstream finishes.
    fn reduce<A, F>(self, initial: A, fold: F) -> Reduce<Self, A, F>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, Self::Output) -> A + Send + Sync + 'static,
    {
        Reduce::new(self, initial, fold)
    }

    /// Like `reduce`, with a fold that may fail.
    fn try_reduce<A, F>(self, initial: A, fold: F) -> TryReduce<Self, A, F>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, Self::Output) -> anyhow::Result<A> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryReduce::new(self, initial, fold)
    }

    /// Emit every intermediate result of a fold.
    ///
    /// ```
    /// # use backflow::{PublisherExt, Sequence};
    /// let totals: Vec<_> = Sequence::new(1..=4)
    ///     .scan(0, |acc, x| acc + x)
    ///     .events()
    ///     .map(Result::unwrap)
    ///     .collect();
    /// assert_eq!(totals, vec![1, 3, 6, 10]);
    /// ```
    fn scan<A, F>(self, initial: A, fold: F) -> Scan<Self, A, F>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(&A, Self::Output) -> A + Send + Sync + 'static,
    {
        Scan::new(self, initial, fold)
    }

    /// Like `scan`, with a fold that may fail.
    fn try_scan<A, F>(self, initial: A, fold: F) -> TryScan<Self, A, F>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(&A, Self::Output) -> anyhow::Result<A> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryScan::new(self, initial, fold)
    }

    /// Count the values, emitted when upstream finishes.
    fn count(self) -> Count<Self> {
        Count::new(self)
    }

    /// Emit whether every value matches `predicate`.
    ///
    /// The first mismatch emits `false` right away and cancels upstream.
    fn all_satisfy<F>(self, predicate: F) -> AllSatisfy<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        AllSatisfy::new(self, predicate)
    }

    /// Like `all_satisfy`, with a predicate that may fail.
    fn try_all_satisfy<F>(self, predicate: F) -> TryAllSatisfy<Self, F>
    where
        F: Fn(&Self::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryAllSatisfy::new(self, predicate)
    }

    /// Emit whether `value` shows up, stopping at the first match.
    fn contains(self, value: Self::Output) -> Contains<Self>
    where
        Self::Output: PartialEq + Sync,
    {
        Contains::new(self, value)
    }

    /// Emit whether any value matches `predicate`, stopping at the first
    /// match.
    fn contains_where<F>(self, predicate: F) -> ContainsWhere<Self, F>
    where
        F: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        ContainsWhere::new(self, predicate)
    }

    /// Like `contains_where`, with a predicate that may fail.
    fn try_contains_where<F>(self, predicate: F) -> TryContainsWhere<Self, F>
    where
        F: Fn(&Self::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryContainsWhere::new(self, predicate)
    }

    /// Drop values equal to the one before.
    #[allow(clippy::type_complexity)]
    fn remove_duplicates(
        self,
    ) -> RemoveDuplicates<Self, fn(&Self::Output, &Self::Output) -> bool>
    where
        Self::Output: PartialEq + Clone,
    {
        let equal: fn(&Self::Output, &Self::Output) -> bool = PartialEq::eq;
        RemoveDuplicates::new(self, equal)
    }

    /// Drop values that `equivalent` considers equal to the one before.
    fn remove_duplicates_by<F>(self, equivalent: F) -> RemoveDuplicates<Self, F>
    where
        Self::Output: Clone,
        F: Fn(&Self::Output, &Self::Output) -> bool + Send + Sync + 'static,
    {
        RemoveDuplicates::new(self, equivalent)
    }

    /// Like `remove_duplicates_by`, with a comparison that may fail.
    fn try_remove_duplicates_by<F>(self, equivalent: F) -> TryRemoveDuplicates<Self, F>
    where
        Self::Output: Clone,
        F: Fn(&Self::Output, &Self::Output) -> anyhow::Result<bool> + Send + Sync + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        TryRemoveDuplicates::new(self, equivalent)
    }

    /// Emit `fallback` if upstream finishes without a value.
    fn replace_empty(self, fallback: Self::Output) -> ReplaceEmpty<Self>
    where
        Self::Output: Clone + Sync,
    {
        ReplaceEmpty::new(self, fallback)
    }

    /// Turn a failure into `fallback` followed by a normal finish.
    fn replace_error(self, fallback: Self::Output) -> ReplaceError<Self>
    where
        Self::Output: Clone + Sync,
    {
        ReplaceError::new(self, fallback)
    }

    /// Drop every value, keeping only the completion.
    fn ignore_output(self) -> IgnoreOutput<Self> {
        IgnoreOutput::new(self)
    }

    /// Run side effects on the signals passing through.
    fn handle_events(self, hooks: EventHooks<Self::Output, Self::Failure>) -> HandleEvents<Self> {
        HandleEvents::new(self, hooks)
    }

    /// Log every signal passing through at `info` level.
    fn print(self, prefix: impl Into<String>) -> HandleEvents<Self>
    where
        Self::Output: fmt::Debug,
        Self::Failure: fmt::Debug,
    {
        HandleEvents::new(self, EventHooks::logging(prefix))
    }

    /// On failure, continue with the publisher built by `handler`.
    ///
    /// ```
    /// # use backflow::{Fail, Just, PublisherExt};
    /// let recovered: Vec<_> = Fail::<i32, _>::new("offline")
    ///     .catch(|_| Just::new(0))
    ///     .events()
    ///     .collect();
    /// assert_eq!(recovered, vec![Ok(0)]);
    /// ```
    fn catch<R, F>(self, handler: F) -> Catch<Self, F>
    where
        F: Fn(Self::Failure) -> R + Send + Sync + 'static,
        R: Publisher<Output = Self::Output>,
    {
        Catch::new(self, handler)
    }

    /// Like `catch`, with a handler that may fail itself.
    fn try_catch<R, F>(self, handler: F) -> TryCatch<Self, F>
    where
        F: Fn(Self::Failure) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Publisher<Output = Self::Output>,
        R::Failure: Into<anyhow::Error>,
    {
        TryCatch::new(self, handler)
    }

    /// Resubscribe after a failure, at most `budget` times.
    ///
    /// `None` retries forever.
    fn retry(self, budget: Option<usize>) -> Retry<Self> {
        Retry::new(self, budget)
    }

    /// Decode every value into a `T`.
    fn decode<T, D>(self, decoder: D) -> Decode<Self, D, T>
    where
        D: Decoder<Self::Output, T>,
        T: Send + 'static,
        Self::Failure: Into<anyhow::Error>,
    {
        Decode::new(self, decoder)
    }

    /// Emit the list of all matches of a regular expression in every value.
    #[cfg(feature = "regex")]
    fn matches(self, pattern: &str) -> Matches<Self>
    where
        Self::Output: AsRef<str>,
        Self::Failure: Into<anyhow::Error>,
    {
        Matches::new(self, pattern)
    }

    /// Emit for every value whether a regular expression occurs in it.
    #[cfg(feature = "regex")]
    fn first_match(self, pattern: &str) -> FirstMatch<Self>
    where
        Self::Output: AsRef<str>,
        Self::Failure: Into<anyhow::Error>,
    {
        FirstMatch::new(self, pattern)
    }

    /// Deliver signals downstream through `scheduler`.
    fn receive_on<S: Scheduler>(self, scheduler: S) -> ReceiveOn<Self, S> {
        ReceiveOn::new(self, scheduler)
    }

    /// Emit a value only once `delay` has passed without a newer one.
    fn debounce<S: Scheduler>(self, delay: Duration, scheduler: S) -> Debounce<Self, S> {
        Debounce::new(self, delay, scheduler)
    }

    /// Combine with the latest value of another publisher.
    fn combine_latest<B>(self, b: B) -> CombineLatest<Self, B>
    where
        B: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
    {
        CombineLatest::new(self, b)
    }

    /// `combine_latest`, then transform the tuple.
    fn combine_latest_map<B, O, F>(self, b: B, transform: F) -> Map<CombineLatest<Self, B>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        F: Fn((Self::Output, B::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(CombineLatest::new(self, b), transform)
    }

    /// Combine with the latest values of two other publishers.
    fn combine_latest3<B, C>(self, b: B, c: C) -> CombineLatest3<Self, B, C>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
    {
        CombineLatest3::new(self, b, c)
    }

    /// `combine_latest3`, then transform the tuple.
    fn combine_latest3_map<B, C, O, F>(
        self,
        b: B,
        c: C,
        transform: F,
    ) -> Map<CombineLatest3<Self, B, C>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
        F: Fn((Self::Output, B::Output, C::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(CombineLatest3::new(self, b, c), transform)
    }

    /// Combine with the latest values of three other publishers.
    fn combine_latest4<B, C, D>(self, b: B, c: C, d: D) -> CombineLatest4<Self, B, C, D>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
        D::Output: Clone,
    {
        CombineLatest4::new(self, b, c, d)
    }

    /// `combine_latest4`, then transform the tuple.
    fn combine_latest4_map<B, C, D, O, F>(
        self,
        b: B,
        c: C,
        d: D,
        transform: F,
    ) -> Map<CombineLatest4<Self, B, C, D>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
        D::Output: Clone,
        F: Fn((Self::Output, B::Output, C::Output, D::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(CombineLatest4::new(self, b, c, d), transform)
    }

    /// Combine with the latest values of four other publishers.
    fn combine_latest5<B, C, D, E>(
        self,
        b: B,
        c: C,
        d: D,
        e: E,
    ) -> CombineLatest5<Self, B, C, D, E>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        E: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
        D::Output: Clone,
        E::Output: Clone,
    {
        CombineLatest5::new(self, b, c, d, e)
    }

    /// `combine_latest5`, then transform the tuple.
    #[allow(clippy::type_complexity)]
    fn combine_latest5_map<B, C, D, E, O, F>(
        self,
        b: B,
        c: C,
        d: D,
        e: E,
        transform: F,
    ) -> Map<CombineLatest5<Self, B, C, D, E>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        E: Publisher<Failure = Self::Failure>,
        Self::Output: Clone,
        B::Output: Clone,
        C::Output: Clone,
        D::Output: Clone,
        E::Output: Clone,
        F: Fn((Self::Output, B::Output, C::Output, D::Output, E::Output)) -> O
            + Send
            + Sync
            + 'static,
        O: Send + 'static,
    {
        Map::new(CombineLatest5::new(self, b, c, d, e), transform)
    }

    /// Pair values with those of another publisher, by position.
    fn zip<B>(self, b: B) -> Zip<Self, B>
    where
        B: Publisher<Failure = Self::Failure>,
    {
        Zip::new(self, b)
    }

    /// `zip`, then transform the pair.
    fn zip_map<B, O, F>(self, b: B, transform: F) -> Map<Zip<Self, B>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        F: Fn((Self::Output, B::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(Zip::new(self, b), transform)
    }

    /// Zip with two other publishers.
    fn zip3<B, C>(self, b: B, c: C) -> Zip3<Self, B, C>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
    {
        Zip3::new(self, b, c)
    }

    /// `zip3`, then transform the triple.
    fn zip3_map<B, C, O, F>(self, b: B, c: C, transform: F) -> Map<Zip3<Self, B, C>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        F: Fn((Self::Output, B::Output, C::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(Zip3::new(self, b, c), transform)
    }

    /// Zip with three other publishers.
    fn zip4<B, C, D>(self, b: B, c: C, d: D) -> Zip4<Self, B, C, D>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
    {
        Zip4::new(self, b, c, d)
    }

    /// `zip4`, then transform the tuple.
    fn zip4_map<B, C, D, O, F>(
        self,
        b: B,
        c: C,
        d: D,
        transform: F,
    ) -> Map<Zip4<Self, B, C, D>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        F: Fn((Self::Output, B::Output, C::Output, D::Output)) -> O + Send + Sync + 'static,
        O: Send + 'static,
    {
        Map::new(Zip4::new(self, b, c, d), transform)
    }

    /// Zip with four other publishers.
    fn zip5<B, C, D, E>(self, b: B, c: C, d: D, e: E) -> Zip5<Self, B, C, D, E>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        E: Publisher<Failure = Self::Failure>,
    {
        Zip5::new(self, b, c, d, e)
    }

    /// `zip5`, then transform the tuple.
    #[allow(clippy::type_complexity)]
    fn zip5_map<B, C, D, E, O, F>(
        self,
        b: B,
        c: C,
        d: D,
        e: E,
        transform: F,
    ) -> Map<Zip5<Self, B, C, D, E>, F>
    where
        B: Publisher<Failure = Self::Failure>,
        C: Publisher<Failure = Self::Failure>,
        D: Publisher<Failure = Self::Failure>,
        E: Publisher<Failure = Self::Failure>,
        F: Fn((Self::Output, B::Output, C::Output, D::Output, E::Output)) -> O
            + Send
            + Sync
            + 'static,
        O: Send + 'static,
    {
        Map::new(Zip5::new(self, b, c, d, e), transform)
    }

    /// Interleave with another publisher of the same type.
    fn merge<B>(self, b: B) -> Merge<Self, B>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge::new(self, b)
    }

    /// Interleave with two other publishers.
    fn merge3<B, C>(self, b: B, c: C) -> Merge3<Self, B, C>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge3::new(self, b, c)
    }

    /// Interleave with three other publishers.
    fn merge4<B, C, D>(self, b: B, c: C, d: D) -> Merge4<Self, B, C, D>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
        D: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge4::new(self, b, c, d)
    }

    /// Interleave with four other publishers.
    fn merge5<B, C, D, E>(self, b: B, c: C, d: D, e: E) -> Merge5<Self, B, C, D, E>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
        D: Publisher<Output = Self::Output, Failure = Self::Failure>,
        E: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge5::new(self, b, c, d, e)
    }

    /// Interleave with five other publishers.
    fn merge6<B, C, D, E, G>(self, b: B, c: C, d: D, e: E, g: G) -> Merge6<Self, B, C, D, E, G>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
        D: Publisher<Output = Self::Output, Failure = Self::Failure>,
        E: Publisher<Output = Self::Output, Failure = Self::Failure>,
        G: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge6::new(self, b, c, d, e, g)
    }

    /// Interleave with six other publishers.
    #[allow(clippy::too_many_arguments)]
    fn merge7<B, C, D, E, G, H>(
        self,
        b: B,
        c: C,
        d: D,
        e: E,
        g: G,
        h: H,
    ) -> Merge7<Self, B, C, D, E, G, H>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
        D: Publisher<Output = Self::Output, Failure = Self::Failure>,
        E: Publisher<Output = Self::Output, Failure = Self::Failure>,
        G: Publisher<Output = Self::Output, Failure = Self::Failure>,
        H: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge7::new(self, b, c, d, e, g, h)
    }

    /// Interleave with seven other publishers.
    #[allow(clippy::too_many_arguments)]
    fn merge8<B, C, D, E, G, H, J>(
        self,
        b: B,
        c: C,
        d: D,
        e: E,
        g: G,
        h: H,
        j: J,
    ) -> Merge8<Self, B, C, D, E, G, H, J>
    where
        B: Publisher<Output = Self::Output, Failure = Self::Failure>,
        C: Publisher<Output = Self::Output, Failure = Self::Failure>,
        D: Publisher<Output = Self::Output, Failure = Self::Failure>,
        E: Publisher<Output = Self::Output, Failure = Self::Failure>,
        G: Publisher<Output = Self::Output, Failure = Self::Failure>,
        H: Publisher<Output = Self::Output, Failure = Self::Failure>,
        J: Publisher<Output = Self::Output, Failure = Self::Failure>,
    {
        Merge8::new(self, b, c, d, e, g, h, j)
    }

    /// Erase the concrete type of the pipeline.
    fn erase(self) -> AnyPublisher<Self::Output, Self::Failure> {
        AnyPublisher::new(self)
    }

    /// Subscribe with closures for the completion and for every value.
    fn sink<C, V>(&self, on_completion: C, on_value: V) -> AnyCancellable
    where
        C: FnOnce(Completion<Self::Failure>) + Send + 'static,
        V: Fn(Self::Output) + Send + Sync + 'static,
    {
        let sink = Arc::new(Sink::new(on_completion, on_value));
        self.subscribe(sink.clone());
        AnyCancellable::new(sink)
    }

    /// Subscribe with a closure for every value of a publisher that cannot
    /// fail.
    fn sink_values<V>(&self, on_value: V) -> AnyCancellable
    where
        Self: Publisher<Failure = Never>,
        V: Fn(Self::Output) + Send + Sync + 'static,
    {
        self.sink(|_| (), on_value)
    }

    /// Write every value into a field of `target`.
    ///
    /// `field` selects the place to write. See `Assign`.
    fn assign<T, A>(&self, target: &Arc<Mutex<T>>, field: A) -> AnyCancellable
    where
        Self: Publisher<Failure = Never>,
        T: Send + 'static,
        A: Fn(&mut T) -> &mut Self::Output + Send + Sync + 'static,
    {
        let assign = Arc::new(Assign::new(target, field));
        self.subscribe(assign.clone());
        AnyCancellable::new(assign)
    }

    /// Report the last value or the failure once the stream ends.
    fn on_completion<C>(&self, callback: C) -> AnyCancellable
    where
        C: FnOnce(Result<Option<Self::Output>, Self::Failure>) + Send + 'static,
    {
        let subscriber = Arc::new(OnCompletion::new(callback));
        self.subscribe(subscriber.clone());
        AnyCancellable::new(subscriber)
    }

    /// Iterate over the signals, blocking for each.
    fn events(&self) -> Events<Self::Output, Self::Failure> {
        Events::subscribe(self)
    }
}

impl<P: Publisher> PublisherExt for P {}
