//! Conversation-related types.

use scout_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// Represents a conversation, the ordered history of one session.
///
/// The history only grows, and it only grows by whole turns: the agent
/// stages the messages of a running turn elsewhere and commits them once
/// the turn produced its final answer.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    session_id: String,
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates an empty conversation for the session.
    #[inline]
    pub fn new<S: Into<String>>(session_id: S) -> Self {
        Self {
            session_id: session_id.into(),
            messages: vec![],
        }
    }

    /// Returns the identifier of the session this conversation belongs to.
    #[inline]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the committed messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the number of committed messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been committed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[inline]
    pub(crate) fn commit(&mut self, turn: Vec<ModelMessage>) {
        self.messages.extend(turn);
    }
}
