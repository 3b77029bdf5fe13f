//! A terminal chat loop around a hosted model that can search the web.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the same loop into your own host apps, with
//! any model provider and search backend.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod config;
pub mod render;
mod repl;
mod session;
pub mod tools;

pub use render::{RenderStyle, Renderer};
pub use repl::{
    EXIT_KEYWORDS, FALLBACK_QUESTION, Repl, ReplExit, is_exit_keyword,
};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`scout_core`] crate.
pub mod core {
    pub use scout_core::*;
}
