use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use scout_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use serde_json::{Map, Value};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ContentBlockDelta, ContentBlockStart, StreamEvent};

enum Block {
    Text,
    ToolUse {
        id: String,
        name: String,
        input_json: String,
    },
    Other,
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Open content blocks keyed by their index in the message.
    blocks: HashMap<usize, Block>,
    // This field will be cleared after the response returns the complete event.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct AnthropicResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        message_id: Option<String>,
    }
}

impl AnthropicResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            blocks: Default::default(),
            pending_finish_reason: Default::default(),
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
            message_id: None,
        }
    }

    /// Returns the id the server assigned to this message, once known.
    #[inline]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

impl ModelResponse for AnthropicResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.message_id = partial_state.id;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };
        if this.message_id.is_none() {
            this.message_id.clone_from(&partial_state.id);
        }

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event:?}");

        let stream_event = serde_json::from_str::<StreamEvent>(&sse_event.data)
            .map_err(|err| {
                Error::new(format!("{err}"), ErrorKind::InvalidResponse)
            })?;

        match stream_event {
            StreamEvent::MessageStart { message } => {
                partial_state.id = Some(message.id);
            }
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                let (block, initial_text) = match content_block {
                    ContentBlockStart::Text { text } => (Block::Text, text),
                    ContentBlockStart::ToolUse { id, name } => (
                        Block::ToolUse {
                            id,
                            name,
                            input_json: String::new(),
                        },
                        String::new(),
                    ),
                    ContentBlockStart::Other => (Block::Other, String::new()),
                };
                partial_state.blocks.insert(index, block);
                if !initial_text.is_empty() {
                    return Ok((
                        Some(ModelResponseEvent::MessageDelta(initial_text)),
                        partial_state,
                    ));
                }
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentBlockDelta::TextDelta { text } => {
                    if !text.is_empty() {
                        return Ok((
                            Some(ModelResponseEvent::MessageDelta(text)),
                            partial_state,
                        ));
                    }
                }
                ContentBlockDelta::InputJsonDelta { partial_json } => {
                    let Some(Block::ToolUse { input_json, .. }) =
                        partial_state.blocks.get_mut(&index)
                    else {
                        return Err(Error::new(
                            format!("input delta for non tool block {index}"),
                            ErrorKind::InvalidResponse,
                        ));
                    };
                    input_json.push_str(&partial_json);
                }
                ContentBlockDelta::Other => {}
            },
            StreamEvent::ContentBlockStop { index } => {
                let Some(Block::ToolUse {
                    id,
                    name,
                    input_json,
                }) = partial_state.blocks.remove(&index)
                else {
                    continue;
                };
                let arguments = parse_tool_input(&input_json)?;
                return Ok((
                    Some(ModelResponseEvent::ToolCall(ToolCallRequest {
                        id,
                        name,
                        arguments,
                    })),
                    partial_state,
                ));
            }
            StreamEvent::MessageDelta { delta } => {
                if let Some(stop_reason) = delta.stop_reason {
                    let finish_reason = if stop_reason == "tool_use" {
                        ModelFinishReason::ToolCalls
                    } else {
                        ModelFinishReason::Stop
                    };
                    partial_state.pending_finish_reason = Some(finish_reason);
                }
            }
            StreamEvent::MessageStop => {
                let finish_reason = partial_state
                    .pending_finish_reason
                    .take()
                    .unwrap_or(ModelFinishReason::Stop);
                return Ok((
                    Some(ModelResponseEvent::Completed(finish_reason)),
                    partial_state,
                ));
            }
            StreamEvent::Error { error } => {
                let kind = crate::error_kind_for(&error.kind);
                return Err(Error::new(error.message, kind));
            }
            StreamEvent::Ping | StreamEvent::Unknown => {}
        }
    }

    // The stream ended without `message_stop`, still report how it finished.
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

fn parse_tool_input(input_json: &str) -> Result<Value, Error> {
    // Tools without parameters stream no input at all.
    if input_json.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(input_json).map_err(|err| {
        Error::new(
            format!("invalid tool input: {err}"),
            ErrorKind::InvalidResponse,
        )
    })
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    async fn collect_events(
        chunks: Vec<Bytes>,
    ) -> Result<Vec<ModelResponseEvent>, Error> {
        let sse = Sse::new(Chunks::from_vec_deque(chunks.into()));
        let mut resp = pin!(AnthropicResponse::from_sse(sse));
        let mut events = vec![];
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            events.push(event);
        }
        assert_eq!(resp.message_id(), Some("msg_01Xk9"));
        Ok(events)
    }

    #[tokio::test]
    async fn test_tool_use_events() {
        let events = collect_events(vec![Bytes::from_static(include_bytes!(
            "../fixtures/test_response.txt"
        ))])
        .await
        .unwrap();

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Let me search ".to_owned()),
                ModelResponseEvent::MessageDelta("for that.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "toolu_01A".to_owned(),
                    name: "tavily_search".to_owned(),
                    arguments: json!({ "query": "weather today" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );
    }

    #[tokio::test]
    async fn test_byte_by_byte() {
        let fixture = include_bytes!("../fixtures/test_response.txt");
        let chunks = fixture
            .chunks(7)
            .map(Bytes::copy_from_slice)
            .collect::<Vec<_>>();
        let events = collect_events(chunks).await.unwrap();
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_error_event() {
        let sse = Sse::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"rate_limit_error\",\"message\":\"Slow down\"}}\n\n",
            )]
            .into(),
        ));
        let mut resp = pin!(AnthropicResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Slow down");
        assert_eq!(
            scout_model::ModelProviderError::kind(&err),
            ErrorKind::RateLimitExceeded
        );
    }

    #[tokio::test]
    async fn test_invalid_tool_input() {
        let sse = Sse::new(Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"t\",\"name\":\"tavily_search\",\"input\":{}}}\n\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"query\\\": \"}}\n\n\
data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
            )]
            .into(),
        ));
        let mut resp = pin!(AnthropicResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(
            scout_model::ModelProviderError::kind(&err),
            ErrorKind::InvalidResponse
        );
    }
}
