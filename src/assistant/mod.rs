// src/assistant/mod.rs
// Remote assistant service: the API seam and its OpenAI implementation

mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
pub use client::{OpenAIClient, build_http_client};
pub use types::{
    MessageRole, Run, RunStatus, Thread, ThreadMessage, ToolCall, ToolOutput, is_valid_id,
};

/// Thread/run operations the run loop needs from the assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to a thread
    async fn add_message(&self, thread_id: &str, content: &str) -> Result<()>;

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Submit every output for a `requires_action` run in one batch
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Most recent messages first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}
