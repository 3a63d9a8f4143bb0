//! An abstraction layer for the generative models that tell the stories.
//!
//! This crate establishes a unified protocol for the storyteller to talk
//! with various supported LLMs, so that the story logic can switch between
//! them without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to. The conversation
//! types ([`Turn`], [`TextPart`], [`Role`]) double as the history format
//! that callers keep between requests.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;
mod turn;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
pub use turn::*;
