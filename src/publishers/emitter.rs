//! A subscription that emits from an iterator as demand allows.

use std::iter::Peekable;
use std::mem;
use std::sync::{Arc, Mutex};

use crate::completion::Completion;
use crate::demand::Demand;
use crate::lock;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;

struct State<S: Subscriber, It: Iterator> {
    downstream: Option<Arc<S>>,
    items: Peekable<It>,
    completion: Option<Completion<S::Failure>>,
    demand: Demand,
    emitting: bool,
}

enum Next<I, F> {
    Value(I),
    Complete(Completion<F>),
}

/// Emits the items of an iterator, then a completion.
///
/// The completion does not need demand. It is sent as soon as the iterator
/// is exhausted, even right after subscribing to an empty iterator.
pub(crate) struct Emitter<S: Subscriber, It: Iterator> {
    state: Mutex<State<S, It>>,
}

impl<S, It> Emitter<S, It>
where
    S: Subscriber,
    It: Iterator<Item = S::Input> + Send + 'static,
{
    /// Subscribe `downstream` to `items` followed by `completion`.
    pub fn start(downstream: S, items: It, completion: Completion<S::Failure>) {
        let downstream = Arc::new(downstream);
        let emitter = Arc::new(Emitter {
            state: Mutex::new(State {
                downstream: Some(downstream.clone()),
                items: items.peekable(),
                completion: Some(completion),
                demand: Demand::none(),
                emitting: false,
            }),
        });
        downstream.receive_subscription(emitter.clone());
        emitter.drive(Demand::none());
    }

    fn drive(&self, demand: Demand) {
        {
            let mut state = lock(&self.state);
            if state.downstream.is_none() {
                return;
            }
            state.demand += demand;
            if state.emitting {
                return;
            }
            state.emitting = true;
        }
        loop {
            let (downstream, next) = {
                let mut state = lock(&self.state);
                let Some(downstream) = state.downstream.clone() else {
                    state.emitting = false;
                    return;
                };
                if state.items.peek().is_none() {
                    state.downstream = None;
                    state.emitting = false;
                    let completion = state.completion.take().unwrap_or(Completion::Finished);
                    (downstream, Next::Complete(completion))
                } else if state.demand.consume() {
                    match state.items.next() {
                        Some(item) => (downstream, Next::Value(item)),
                        None => continue,
                    }
                } else {
                    state.emitting = false;
                    return;
                }
            };
            match next {
                Next::Value(item) => {
                    let more = downstream.receive(item);
                    let mut state = lock(&self.state);
                    if state.downstream.is_some() {
                        state.demand += more;
                    }
                }
                Next::Complete(completion) => {
                    downstream.receive_completion(completion);
                    return;
                }
            }
        }
    }
}

impl<S, It> Subscription for Emitter<S, It>
where
    S: Subscriber,
    It: Iterator<Item = S::Input> + Send + 'static,
{
    fn request(&self, demand: Demand) {
        if demand.is_zero() {
            log::debug!("ignoring a request for no values");
            return;
        }
        self.drive(demand);
    }

    fn cancel(&self) {
        let released = {
            let mut state = lock(&self.state);
            state.completion = None;
            mem::take(&mut state.downstream)
        };
        drop(released);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{Event, Recorder};

    #[test]
    fn emits_only_on_demand() {
        let recorder = Recorder::<i32, ()>::with_demand(Demand::max(2));
        Emitter::start(recorder.clone(), 1..=5, Completion::Finished);
        assert_eq!(recorder.values(), vec![1, 2]);
        recorder.request(Demand::max(1));
        assert_eq!(recorder.values(), vec![1, 2, 3]);
        recorder.request(Demand::max(5));
        assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5]);
        assert_eq!(recorder.completion(), Some(Completion::Finished));
    }

    #[test]
    fn empty_iterator_completes_without_demand() {
        let recorder = Recorder::<i32, &str>::with_demand(Demand::none());
        Emitter::start(recorder.clone(), std::iter::empty(), Completion::Failure("nope"));
        assert_eq!(
            recorder.events(),
            vec![Event::Subscribed, Event::Completed(Completion::Failure("nope"))]
        );
    }

    #[test]
    fn completes_right_after_last_value() {
        let recorder = Recorder::<i32, ()>::with_demand(Demand::max(3));
        Emitter::start(recorder.clone(), 1..=3, Completion::Finished);
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn replenished_demand_keeps_emitting() {
        let recorder = Recorder::<u8, ()>::replenishing(Demand::max(1), Demand::max(1));
        Emitter::start(recorder.clone(), 0..10, Completion::Finished);
        assert_eq!(recorder.values(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn cancel_stops_emission() {
        let recorder = Recorder::<u32, ()>::new().cancel_after(3);
        Emitter::start(recorder.clone(), 0.., Completion::Finished);
        assert_eq!(recorder.values(), vec![0, 1, 2]);
        assert_eq!(recorder.completions(), 0);
        recorder.request(Demand::max(1));
        assert_eq!(recorder.values().len(), 3);
    }
}
