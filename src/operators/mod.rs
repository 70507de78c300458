//! Operators with a single upstream.
//!
//! Every operator is a publisher wrapping its upstream, built through the
//! methods of `PublisherExt`. Subscribing to an operator subscribes a fresh
//! sink to the upstream, so one operator value can serve any number of
//! independent subscriptions.
//!
//! Operators request unlimited demand from their upstream and do not buffer.
//! Demand is honored precisely only at the sources.
//!
//! The `try_` variants take closures returning `anyhow::Result`. The first
//! error cancels upstream and ends the stream with that error.

pub use self::catch::{Catch, TryCatch};
pub use self::debounce::Debounce;
#[cfg(feature = "json")]
pub use self::decode::JsonDecoder;
pub use self::decode::{Decode, Decoder};
pub use self::filter::{Filter, RemoveDuplicates, TryFilter, TryRemoveDuplicates};
pub use self::handle_events::{EventHooks, HandleEvents};
pub use self::map::{CompactMap, Map, MapError, ReplaceNil, TryCompactMap, TryMap};
#[cfg(feature = "regex")]
pub use self::matches::{FirstMatch, Matches};
pub use self::predicate::{AllSatisfy, Contains, ContainsWhere, TryAllSatisfy, TryContainsWhere};
pub use self::receive_on::ReceiveOn;
pub use self::reduce::{Count, Reduce, Scan, TryReduce, TryScan};
pub use self::replace::{IgnoreOutput, ReplaceEmpty, ReplaceError};
pub use self::retry::Retry;

mod catch;
mod debounce;
mod decode;
mod filter;
mod handle_events;
mod map;
#[cfg(feature = "regex")]
mod matches;
mod predicate;
mod receive_on;
mod reduce;
mod replace;
mod retry;
