//! Tools the model may call while answering, such as a web search.

mod error;
mod executor;

use std::future::ready;
use std::pin::Pin;

use scout_model::ModelTool;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;

/// The result of a tool call: the text handed back to the model, usually
/// serialized JSON.
pub type ToolResult = Result<String, Error>;

/// A tool that is advertised to the model and run when the model asks for
/// it.
///
/// The model picks a tool by [`name`](Tool::name) and fills in its
/// arguments from [`parameter_schema`](Tool::parameter_schema), so both
/// should stay fixed for the lifetime of the tool. Anything a call needs
/// beyond its arguments, like the API key of a search service or a shared
/// HTTP client, belongs in the tool itself and is cloned into the future
/// returned by [`execute`](Tool::execute).
pub trait Tool: Send + Sync + 'static {
    /// The arguments the model passes, deserialized from JSON.
    type Input: DeserializeOwned;

    /// The name the model calls this tool by.
    fn name(&self) -> &str;

    /// Tells the model when the tool is worth calling.
    fn description(&self) -> &str;

    /// JSON schema of [`Self::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Runs the tool.
    ///
    /// This method must return a future that is fully independent of `self`.
    /// A failure ends the current turn with a tool error.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}

/// A [`Tool`] with its input type erased, so tools of different types can
/// be registered on one agent.
pub(crate) trait DynTool: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Describes the tool in the shape a model request carries.
    fn definition(&self) -> ModelTool;

    fn call(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ErasedTool<T>(pub T);

impl<T: Tool> DynTool for ErasedTool<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.0.name().to_owned(),
            description: self.0.description().to_owned(),
            parameters: self.0.parameter_schema().clone(),
        }
    }

    fn call(
        &self,
        arguments: Value,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => Box::pin(self.0.execute(input)),
            Err(err) => {
                let reason =
                    format!("bad arguments for `{}`: {err}", self.0.name());
                let err = Error::invalid_input().with_reason(reason);
                Box::pin(ready(Err(err)))
            }
        }
    }
}
