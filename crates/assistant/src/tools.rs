use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::messages::ToolDefinition;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

/// The functions the model may call, dispatched by name.
#[async_trait]
pub trait ToolBox: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run `name` with decoded JSON arguments and return the text handed back to the model.
    async fn call(&self, name: &str, arguments: Value) -> Result<String, ToolError>;
}
