use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ToolCallRequest;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The system instructions, if any.
    pub system: Option<String>,
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human operator.
    User,
    /// The model.
    Assistant,
    /// A tool that ran on behalf of the model.
    Tool,
}

/// A complete message in the conversation.
///
/// The variant is decided when the message is constructed, so consumers
/// never need to guess what kind of message they are looking at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum ModelMessage {
    /// A user input text.
    User(String),
    /// A final answer from the assistant.
    Assistant(String),
    /// An assistant message asking for tools to be called.
    ToolRequest(ToolRequestMessage),
    /// A tool call result.
    Tool(ToolCallResult),
}

impl ModelMessage {
    /// Returns the author of this message.
    #[inline]
    pub fn role(&self) -> Role {
        match self {
            ModelMessage::User(_) => Role::User,
            ModelMessage::Assistant(_) | ModelMessage::ToolRequest(_) => {
                Role::Assistant
            }
            ModelMessage::Tool(_) => Role::Tool,
        }
    }

    /// Returns `true` if this message is a final answer.
    #[inline]
    pub fn is_final_answer(&self) -> bool {
        matches!(self, ModelMessage::Assistant(_))
    }
}

/// An assistant message that requests tool calls instead of answering.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolRequestMessage {
    /// Text the model produced before requesting the tools, may be empty.
    pub text: String,
    /// The requested calls, in the order the model emitted them.
    pub calls: Vec<ToolCallRequest>,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// Name of the tool that produced this result.
    pub name: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
