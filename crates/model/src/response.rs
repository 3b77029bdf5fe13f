use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::provider::ModelProviderError;

/// A streamed answer to one [`ModelRequest`](crate::ModelRequest).
///
/// The agent drains a response event by event: text deltas are printed
/// after the `Assistant:` tag as they arrive, and tool calls (like a web
/// search) are collected and run once the response completes with
/// [`ModelFinishReason::ToolCalls`].
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Pulls the next event out of the stream.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` when the next event has not arrived yet. The
    ///   current task is woken once it may have.
    /// - `Poll::Ready(Ok(Some(event)))` for each event, in the order the
    ///   provider sent them. The last one is always a
    ///   [`ModelResponseEvent::Completed`].
    /// - `Poll::Ready(Ok(None))` once the stream is drained. Any later call
    ///   returns this again.
    /// - `Poll::Ready(Err(error))` when the stream broke or carried an
    ///   error, like an overloaded or rate limited upstream. No events
    ///   follow an error.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// How a model response ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model is waiting for the results of the tool calls it made.
    ToolCalls,
    /// The model gave its final answer for this turn.
    Stop,
}

/// A tool the model wants to run, e.g. a web search with its query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider assigned id, echoed back by the matching tool result.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool, usually a JSON object.
    pub arguments: Value,
}

/// One item of a streamed model response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The response ended for the given reason.
    Completed(ModelFinishReason),
    /// A piece of the assistant's text.
    MessageDelta(String),
    /// A complete tool call, with all of its arguments received.
    ToolCall(ToolCallRequest),
}
