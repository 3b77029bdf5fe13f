//! An abstraction layer for the chat models `scout` talks to.
//!
//! This crate establishes an unified protocol for the agent to interact
//! with a hosted model, so that the conversation loop can be driven by a
//! real provider in production and by a scripted fake one in tests.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
