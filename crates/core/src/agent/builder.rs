use std::sync::Arc;

use scout_model::ModelProvider;

use super::{Agent, DEFAULT_MAX_TOOL_ROUNDS};
use crate::checkpoint::CheckpointStore;
use crate::model_client::ModelClient;
use crate::tool::{DynTool, ErasedTool, Tool};

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) model_client: ModelClient,
    pub(crate) system_prompt: Option<String>,
    pub(crate) tools: Vec<Box<dyn DynTool>>,
    pub(crate) max_tool_rounds: usize,
    pub(crate) session_id: Option<String>,
    pub(crate) checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            system_prompt: None,
            tools: vec![],
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            session_id: None,
            checkpoint_store: None,
        }
    }

    /// Sets the system prompt sent along with every request.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        let tool = Box::new(ErasedTool(tool));
        self.tools.push(tool);
        self
    }

    /// Sets how many tool round-trips a single turn may take.
    ///
    /// Defaults to [`DEFAULT_MAX_TOOL_ROUNDS`].
    #[inline]
    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Names the session. A random one is generated if not set.
    #[inline]
    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Attaches a store that the agent saves its conversation into after
    /// every completed turn.
    #[inline]
    pub fn with_checkpoint_store<S: CheckpointStore + 'static>(
        mut self,
        store: S,
    ) -> Self {
        self.checkpoint_store = Some(Arc::new(store));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
