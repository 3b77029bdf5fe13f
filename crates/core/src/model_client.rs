use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use scout_model::{
    ErrorKind as ModelErrorKind, ModelFinishReason, ModelProvider,
    ModelRequest, ModelResponse, ModelResponseEvent, ToolCallRequest,
    ToolRequestMessage,
};
use tracing::Instrument;

use crate::error::{Error, ErrorKind};

type SendRequestResult = Result<ModelClientResponse, Error>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that maintains an execution
/// environment for the provider and provides a type-erased interface
/// for the other modules.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and returns the completely received response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        (self.handler_fn)(req).await
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    pub transcript: String,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

/// What the model replied with, decided once the response is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    FinalAnswer(String),
    ToolRequest(ToolRequestMessage),
}

impl ModelClientResponse {
    pub fn into_reply(self) -> Result<Reply, Error> {
        if !self.tool_calls.is_empty() {
            return Ok(Reply::ToolRequest(ToolRequestMessage {
                text: self.transcript,
                calls: self.tool_calls,
            }));
        }
        if self.finish_reason == Some(ModelFinishReason::ToolCalls) {
            return Err(Error::new(
                ErrorKind::Model(ModelErrorKind::InvalidResponse),
                "the model asked for tools without naming any",
            ));
        }
        Ok(Reply::FinalAnswer(self.transcript))
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Error::model(err));
        }
    };

    let mut transcript = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Error::model(err));
            }
        };

        let Some(event) = event else {
            // The request has been handled gracefully without errors.
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::ToolCall(req) => {
                tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        tool_calls,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use scout_model::ModelMessage;
    use scout_test_model::{PresetEvent, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    fn hello_request() -> ModelRequest {
        ModelRequest {
            system: None,
            messages: vec![ModelMessage::User("Hi".to_owned())],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider.add_assistant_response_step(
            PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]),
        );

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let resp =
                model_client.send_request(hello_request()).await.unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
            assert_eq!(
                resp.into_reply().unwrap(),
                Reply::FinalAnswer("How are you?".to_owned())
            );
        }
    }

    #[tokio::test]
    async fn test_tool_request_reply() {
        let call = ToolCallRequest {
            id: "tool:1".to_owned(),
            name: "tavily_search".to_owned(),
            arguments: json!({ "query": "weather today" }),
        };
        let mut model_provider = TestModelProvider::default();
        model_provider.add_user_input_step();
        model_provider.add_assistant_response_step(
            PresetResponse::with_events([PresetEvent::ToolCall(call.clone())]),
        );

        let resp = ModelClient::new(model_provider)
            .send_request(hello_request())
            .await
            .unwrap();
        assert_eq!(
            resp.into_reply().unwrap(),
            Reply::ToolRequest(ToolRequestMessage {
                text: String::new(),
                calls: vec![call],
            })
        );
    }

    #[test]
    fn test_tool_calls_without_calls() {
        let resp = ModelClientResponse {
            transcript: String::new(),
            tool_calls: vec![],
            finish_reason: Some(ModelFinishReason::ToolCalls),
        };
        let err = resp.into_reply().unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::Model(ModelErrorKind::InvalidResponse)
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let resp_or_err = model_client.send_request(hello_request()).await;
        assert!(matches!(
            resp_or_err.map(|_| ()).unwrap_err().kind(),
            ErrorKind::Model(_)
        ));
    }
}
