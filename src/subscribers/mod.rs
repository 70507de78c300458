//! Subscribers that end a pipeline.
//!
//! These are usually created through the terminal methods of
//! `PublisherExt`: `sink`, `sink_values`, `assign`, `on_completion` and
//! `events`. All of them request unlimited demand and stop when cancelled.

pub use self::assign::Assign;
pub use self::events::Events;
pub use self::on_completion::OnCompletion;
pub use self::sink::Sink;

mod assign;
mod events;
mod on_completion;
mod sink;
