//! A demand-driven reactive streams library
//!
//! *Backflow* provides the publisher/subscriber protocol of reactive streams in
//! Rust, together with a library of composable operators. It follows the
//! design of Apple's Combine framework and the Reactive Streams protocol.
//!
//! A `Publisher` produces values over time and ends with at most one terminal
//! `Completion`. A `Subscriber` consumes them. Between the two sits a
//! `Subscription`, which the subscriber uses to request a `Demand` of values
//! or to cancel the flow. Every call to `subscribe` creates an independent
//! subscription, so publishers are plain values that may be shared and
//! subscribed to any number of times.
//!
//!
//! # Example
//!
//! ```
//! use backflow::{PassthroughSubject, PublisherExt};
//! use std::sync::{Arc, Mutex};
//!
//! let subject = PassthroughSubject::<i32, backflow::Never>::new();
//! let seen = Arc::new(Mutex::new(vec![]));
//!
//! let store = seen.clone();
//! let _subscription = subject
//!     .clone()
//!     .map(|x| x * 10)
//!     .filter(|x| *x > 10)
//!     .sink_values(move |x| store.lock().unwrap().push(x));
//!
//! subject.feed(vec![1, 2, 3]);
//! assert_eq!(*seen.lock().unwrap(), vec![20, 30]);
//! ```
//!
//! Combinators join several publishers into one:
//!
//! ```
//! use backflow::{Just, PublisherExt, Sequence};
//!
//! let pairs: Vec<_> = Sequence::new(vec![1, 2, 3])
//!     .zip(Sequence::new(vec!["a", "b"]))
//!     .events()
//!     .collect();
//! assert_eq!(pairs, vec![Ok((1, "a")), Ok((2, "b"))]);
//! ```
//!
//!
//! # Backpressure
//!
//! Demand is cumulative: each request adds to what is outstanding. Source
//! publishers never deliver more values than were requested. Operators in
//! between request unlimited demand from their upstream as soon as they are
//! subscribed and forward every value immediately, so precise flow control
//! only applies between a source and the subscriber directly attached to it.
//! The terminal subscribers of this crate request unlimited demand as well.
//!
//!
//! # Threads
//!
//! Nothing in this crate spawns a thread on its own, except
//! `ThreadScheduler` and the `*_async` helpers of subjects. Pipelines run on
//! whatever thread sends a value into them. Every stage may be driven from
//! several threads at once. Its deliveries downstream are serialized and a
//! subscriber may cancel from within its own callbacks at any time.

#![warn(missing_docs)]

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use anyhow::{Error, Result};

pub use crate::cancellable::{AnyCancellable, Cancellable};
pub use crate::completion::{Completion, Never};
pub use crate::demand::Demand;
pub use crate::ext::PublisherExt;
#[cfg(feature = "json")]
pub use crate::operators::JsonDecoder;
pub use crate::operators::Decoder;
pub use crate::publisher::{AnyPublisher, Publisher};
pub use crate::publishers::{
    CurrentValueSubject, Empty, Fail, Just, Once, PassthroughSubject, Sequence,
};
pub use crate::scheduler::{ImmediateScheduler, Scheduler, ThreadScheduler};
pub use crate::subscriber::{AnySubscriber, Subscriber};
pub use crate::subscribers::Events;
pub use crate::subscription::{EmptySubscription, Subscription};

mod cancellable;
mod completion;
mod demand;
mod ext;
mod outbox;
mod publisher;
mod sink;
mod source;
mod subscriber;
mod subscription;

pub mod combinators;
pub mod operators;
pub mod publishers;
pub mod scheduler;
pub mod subscribers;
pub mod testing;

/// Lock a mutex, recovering the data if a panicking callback poisoned it.
///
/// A panic inside one user closure must not turn every later signal of the
/// pipeline into a panic as well.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
