//! Core logic including the agent loop, tool execution and checkpoints.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod checkpoint;
pub mod conversation;
mod error;
mod model_client;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentEvent, DEFAULT_MAX_TOOL_ROUNDS};
pub use error::{Error, ErrorKind};
