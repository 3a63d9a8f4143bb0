//! Story logic: turning model replies into story segments and keeping the
//! conversation replayable.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod api;
pub mod conversation;
mod error;
mod fallback;
mod model_client;
pub mod parser;
mod prompt;
mod teller;

pub use error::StoryError;
pub use model_client::{CallOutcome, FailureReason};
pub use parser::{StorySegment, parse};
pub use teller::{StoryStep, StoryTeller, StoryTellerBuilder};
