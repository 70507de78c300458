//! Publishers that originate values.
//!
//! The sources here honor demand precisely: no value is sent that was not
//! requested. `Just`, `Empty`, `Fail`, `Once` and `Sequence` are cold, every
//! subscription replays the same values. The subjects are hot, values are
//! pushed into them imperatively and shared by all current subscribers.

pub use self::just::{Empty, Fail, Just, Once};
pub use self::sequence::Sequence;
pub use self::subject::{CurrentValueSubject, PassthroughSubject};

mod emitter;
mod just;
mod sequence;
mod subject;
