use std::collections::BTreeMap;

use scout_model::{ModelTool, ToolCallRequest, ToolCallResult};
use tracing::Instrument;

use crate::tool::{DynTool, Error};

/// An executor that handles tool call requests from the model.
pub struct Executor {
    tools: BTreeMap<String, Box<dyn DynTool>>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn DynTool>>) -> Self {
        let mut tool_map = BTreeMap::new();
        for tool in tools {
            let name = tool.name().to_owned();
            if tool_map.insert(name, tool).is_some() {
                warn!("a tool with the same name was replaced");
            }
        }
        let tools = tool_map;
        Self { tools }
    }

    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Runs one tool call to completion.
    pub async fn execute(
        &self,
        req: ToolCallRequest,
    ) -> Result<ToolCallResult, Error> {
        let Some(tool) = self.tools.get(&req.name) else {
            warn!("tool not found: {}", req.name);
            return Err(Error::not_found().with_reason(format!(
                "the model asked for an unknown tool `{}`",
                req.name
            )));
        };

        let span = debug_span!("tool execute", name = %req.name, id = %req.id);
        trace!("running a tool ({}) with args: {:?}", req.id, req.arguments);
        let content = tool.call(req.arguments).instrument(span).await?;

        Ok(ToolCallResult {
            id: req.id,
            name: req.name,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::future::ready;

    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;
    use crate::tool::{ErasedTool, Tool, ToolResult};

    static EMPTY_SCHEMA: Value = Value::Null;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    struct EchoTool;

    impl Tool for EchoTool {
        type Input = EchoInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the text back"
        }

        fn parameter_schema(&self) -> &Value {
            &EMPTY_SCHEMA
        }

        fn execute(
            &self,
            input: Self::Input,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            ready(Ok(input.text))
        }
    }

    fn executor() -> Executor {
        Executor::with_tools(vec![Box::new(ErasedTool(EchoTool))])
    }

    #[test]
    fn test_definitions() {
        let definitions = executor().definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "echo");
        assert_eq!(definitions[0].description, "Echoes the text back");
    }

    #[tokio::test]
    async fn test_execute() {
        let result = executor()
            .execute(ToolCallRequest {
                id: "tool:1".to_owned(),
                name: "echo".to_owned(),
                arguments: json!({ "text": "ping" }),
            })
            .await
            .unwrap();
        assert_eq!(result.id, "tool:1");
        assert_eq!(result.name, "echo");
        assert_eq!(result.content, "ping");
    }

    #[tokio::test]
    async fn test_execute_errors() {
        let err = executor()
            .execute(ToolCallRequest {
                id: "tool:1".to_owned(),
                name: "read_file".to_owned(),
                arguments: json!({}),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::tool::ErrorKind::NotFound);

        let err = executor()
            .execute(ToolCallRequest {
                id: "tool:2".to_owned(),
                name: "echo".to_owned(),
                arguments: json!({ "txt": "ping" }),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::tool::ErrorKind::InvalidInput);
    }
}
