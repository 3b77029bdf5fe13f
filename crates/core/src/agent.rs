mod builder;

use std::error::Error as StdError;
use std::sync::Arc;

use scout_model::{
    ModelMessage, ModelRequest, ToolCallResult, ToolRequestMessage,
};
use tracing::Instrument;

use crate::checkpoint::CheckpointStore;
use crate::conversation::Conversation;
use crate::error::{Error, ErrorKind};
use crate::model_client::{ModelClient, Reply};
use crate::tool::Executor as ToolExecutor;
pub use builder::AgentBuilder;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The default number of tool round-trips allowed in a single turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Things that happen while the agent runs a turn, in the order they
/// happen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentEvent<'a> {
    /// The user input that started the turn.
    UserMessage(&'a str),
    /// A request is about to be sent to the model.
    Thinking,
    /// The model asked for tools to be called.
    ToolRequest(&'a ToolRequestMessage),
    /// A tool call finished.
    ToolResult(&'a ToolCallResult),
    /// The model answered, the turn is about to be committed.
    FinalAnswer(&'a str),
}

/// An agent instance, which maintains a session, a model client, the
/// registered tools and the committed conversation.
///
/// Turns run strictly one after another: [`Agent::run_turn`] borrows the
/// agent mutably until the turn resolves.
pub struct Agent {
    model_client: ModelClient,
    tool_executor: ToolExecutor,
    system_prompt: Option<String>,
    max_tool_rounds: usize,
    conversation: Conversation,
    checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            system_prompt,
            tools,
            max_tool_rounds,
            session_id,
            checkpoint_store,
        } = builder;

        let session_id =
            session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            model_client,
            tool_executor: ToolExecutor::with_tools(tools),
            system_prompt,
            max_tool_rounds,
            conversation: Conversation::new(session_id),
            checkpoint_store,
        }
    }

    /// Returns the committed conversation.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the identifier of the current session.
    #[inline]
    pub fn session_id(&self) -> &str {
        self.conversation.session_id()
    }

    /// Loads the conversation of the current session from the checkpoint
    /// store.
    ///
    /// Returns `true` if a checkpoint was found. Without a checkpoint
    /// store, this is a no-op returning `false`.
    pub async fn restore(&mut self) -> Result<bool, Error> {
        let Some(store) = &self.checkpoint_store else {
            return Ok(false);
        };
        let Some(conversation) = store.load(self.session_id()).await? else {
            debug!("nothing to restore for session {}", self.session_id());
            return Ok(false);
        };
        debug!(
            "restored {} messages for session {}",
            conversation.len(),
            conversation.session_id()
        );
        self.conversation = conversation;
        Ok(true)
    }

    /// Runs one turn for the user input and returns the final answer.
    ///
    /// `on_event` observes the turn as it progresses. If it returns an
    /// error, the turn is aborted with [`ErrorKind::Observer`].
    ///
    /// The messages of the turn are committed to the conversation only
    /// when the final answer arrives. A failed turn leaves the
    /// conversation as it was.
    pub async fn run_turn<F, E>(
        &mut self,
        input: &str,
        mut on_event: F,
    ) -> Result<String, Error>
    where
        F: FnMut(AgentEvent<'_>) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let span = debug_span!("turn", session = %self.session_id());
        let mut staged = vec![];
        let answer = match self
            .drive_turn(input, &mut staged, &mut on_event)
            .instrument(span)
            .await
        {
            Ok(answer) => answer,
            Err(err) => {
                debug!(
                    "turn failed, dropping {} staged messages: {err}",
                    staged.len()
                );
                return Err(err);
            }
        };

        self.conversation.commit(staged);
        trace!("state: {:?}", self.conversation);

        if let Some(store) = &self.checkpoint_store {
            if let Err(err) = store.save(&self.conversation).await {
                warn!("failed to save checkpoint: {err}");
            }
        }

        Ok(answer)
    }

    async fn drive_turn<F, E>(
        &self,
        input: &str,
        staged: &mut Vec<ModelMessage>,
        on_event: &mut F,
    ) -> Result<String, Error>
    where
        F: FnMut(AgentEvent<'_>) -> Result<(), E>,
        E: Into<BoxError>,
    {
        staged.push(ModelMessage::User(input.to_owned()));
        emit(on_event, AgentEvent::UserMessage(input))?;

        let tools = self.tool_executor.definitions();
        let mut tool_rounds = 0;
        loop {
            emit(on_event, AgentEvent::Thinking)?;

            let req = ModelRequest {
                system: self.system_prompt.clone(),
                messages: self
                    .conversation
                    .messages()
                    .iter()
                    .chain(staged.iter())
                    .cloned()
                    .collect(),
                tools: tools.clone(),
            };
            let reply =
                self.model_client.send_request(req).await?.into_reply()?;

            let tool_request = match reply {
                Reply::FinalAnswer(answer) => {
                    emit(on_event, AgentEvent::FinalAnswer(&answer))?;
                    staged.push(ModelMessage::Assistant(answer.clone()));
                    return Ok(answer);
                }
                Reply::ToolRequest(tool_request) => tool_request,
            };

            if tool_rounds >= self.max_tool_rounds {
                return Err(Error::new(
                    ErrorKind::ToolRoundsExceeded,
                    format!(
                        "the model still asked for tools after {} round-trips",
                        self.max_tool_rounds
                    ),
                ));
            }
            tool_rounds += 1;

            emit(on_event, AgentEvent::ToolRequest(&tool_request))?;
            let calls = tool_request.calls.clone();
            staged.push(ModelMessage::ToolRequest(tool_request));

            for call in calls {
                let result = self
                    .tool_executor
                    .execute(call)
                    .await
                    .map_err(Error::tool)?;
                emit(on_event, AgentEvent::ToolResult(&result))?;
                staged.push(ModelMessage::Tool(result));
            }
        }
    }
}

#[inline]
fn emit<F, E>(on_event: &mut F, event: AgentEvent<'_>) -> Result<(), Error>
where
    F: FnMut(AgentEvent<'_>) -> Result<(), E>,
    E: Into<BoxError>,
{
    on_event(event).map_err(Error::observer)
}
