//! An interactive storyteller for children, backed by a generative model.
//!
//! The crate includes a CLI tool for playing in the terminal. And you can also
//! use it as a library to bring stories into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod session;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`adventure_tale_core`] crate.
pub mod core {
    pub use adventure_tale_core::*;
}
