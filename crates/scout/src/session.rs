use std::error::Error as StdError;

use scout_core::checkpoint::CheckpointStore;
use scout_core::conversation::Conversation;
use scout_core::{Agent, AgentBuilder, AgentEvent, Error};
use scout_model::ModelProvider;

use crate::tools::{SearchBackend, WebSearchTool};

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let agent_builder = AgentBuilder::with_model_provider(provider);
        Self { agent_builder }
    }

    /// Sets the system prompt for the agent.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.agent_builder = self.agent_builder.with_system_prompt(prompt);
        self
    }

    /// Gives the agent a web search tool.
    #[inline]
    pub fn with_web_search<B: SearchBackend>(
        mut self,
        tool: WebSearchTool<B>,
    ) -> Self {
        self.agent_builder = self.agent_builder.with_tool(tool);
        self
    }

    /// Sets how many tool round-trips a single turn may take.
    #[inline]
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.agent_builder =
            self.agent_builder.with_max_tool_rounds(max_tool_rounds);
        self
    }

    /// Names the session, so that it can be resumed later.
    #[inline]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.agent_builder = self.agent_builder.with_session_id(session_id);
        self
    }

    /// Sets where the conversation is saved after every turn.
    #[inline]
    pub fn with_checkpoint_store<S: CheckpointStore + 'static>(
        mut self,
        store: S,
    ) -> Self {
        self.agent_builder = self.agent_builder.with_checkpoint_store(store);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let agent = self.agent_builder.build();
        Session { agent }
    }
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds a fully configured agent that you can use directly, and it
/// is basically a wrapper around [`Agent`].
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Returns the identifier of this session.
    #[inline]
    pub fn session_id(&self) -> &str {
        self.agent.session_id()
    }

    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        self.agent.conversation()
    }

    /// Picks up the conversation saved by an earlier run, returns `true`
    /// if there was one.
    #[inline]
    pub async fn restore(&mut self) -> Result<bool, Error> {
        self.agent.restore().await
    }

    /// Sends a message to the session and waits for the answer.
    ///
    /// `on_event` is called for everything that happens in between.
    #[inline]
    pub async fn send_message<F, E>(
        &mut self,
        message: &str,
        on_event: F,
    ) -> Result<String, Error>
    where
        F: FnMut(AgentEvent<'_>) -> Result<(), E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        self.agent.run_turn(message, on_event).await
    }
}
