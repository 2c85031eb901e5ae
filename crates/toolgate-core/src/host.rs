//! Host environment boundary.
//!
//! The dispatcher performs side effects and surfaces UI events only
//! through this trait, which the embedding application implements. The
//! core never touches the file system, subprocesses, or MCP transports
//! directly except for the read-only probes of the budget guard.

use crate::ask::AskEvent;
use crate::invocation::ToolInvocation;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Result of executing one tool invocation.
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Title/summary of the operation.
    pub title: String,
    /// Output text fed back to the model.
    pub output: String,
    /// Tool-specific metadata.
    pub metadata: Value,
}

impl ExecutionOutput {
    /// Create a new output.
    pub fn new(title: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            output: output.into(),
            metadata: Value::Null,
        }
    }

    /// Add metadata to the output.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// The environment a dispatcher runs against.
#[async_trait]
pub trait Host: Send + Sync {
    /// Surface an escalated ask to the human. The response arrives
    /// separately through the ask broker; this call only displays it.
    async fn notify_ask(&self, event: &AskEvent);

    /// Render a partial preview of a still-streaming tool call.
    async fn show_partial(&self, name: &str, arguments_fragment: &str);

    /// Perform the tool's side effect.
    ///
    /// Errors are surfaced to the conversation as tool errors; they never
    /// abort the dispatcher loop.
    async fn execute(
        &self,
        invocation: &ToolInvocation,
        abort: &CancellationToken,
    ) -> anyhow::Result<ExecutionOutput>;

    /// Whether the target file of a write already exists.
    async fn file_exists(&self, path: &str) -> bool {
        let _ = path;
        false
    }
}
