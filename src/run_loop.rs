//! Assistant run loop
//!
//! One conversation turn: append the user's message to the thread, start a
//! run, wait for it to finish while answering tool calls, then read back the
//! assistant's latest reply. Shared by the HTTP endpoint and the REPL.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::assistant::{
    AssistantApi, MessageRole, OpenAIClient, Run, RunStatus, ToolOutput, build_http_client,
};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::tools::{ToolRegistry, failure};

/// How long to wait between polls, and for how long overall
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    /// Bound on the whole wait, tool calls included
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(8),
            backoff_factor: 2.0,
            deadline: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Next wait after `current`, saturating at `max_interval`
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// A conversation, identified by its remote thread
#[derive(Debug, Clone, Default)]
pub struct Session {
    thread_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
        }
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    pub thread_id: String,
}

pub struct AssistantRunLoop {
    api: Arc<dyn AssistantApi>,
    tools: ToolRegistry,
    assistant_id: String,
    poll: PollPolicy,
}

impl AssistantRunLoop {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        tools: ToolRegistry,
        assistant_id: impl Into<String>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            api,
            tools,
            assistant_id: assistant_id.into(),
            poll,
        }
    }

    /// OpenAI client plus the default tools, sharing one HTTP client
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let http = build_http_client(config.http_timeout)?;
        let api = OpenAIClient::from_config(http.clone(), config);
        let tools = ToolRegistry::with_defaults(http, config);
        info!("Registered tools: {}", tools.names().join(", "));
        Ok(Self::new(
            Arc::new(api),
            tools,
            config.assistant_id.clone(),
            config.poll.clone(),
        ))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Return the session's thread, creating it on first use
    pub async fn ensure_thread(&self, session: &mut Session) -> Result<String> {
        if let Some(thread_id) = &session.thread_id {
            info!("Using existing thread: {}", thread_id);
            return Ok(thread_id.clone());
        }

        let thread = self.api.create_thread().await?;
        info!("New thread created: {}", thread.id);
        session.thread_id = Some(thread.id.clone());
        Ok(thread.id)
    }

    pub async fn execute(
        &self,
        session: &mut Session,
        user_message: &str,
    ) -> Result<AssistantReply> {
        self.execute_with_cancel(session, user_message, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but `cancel` aborts the wait for the run.
    pub async fn execute_with_cancel(
        &self,
        session: &mut Session,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> Result<AssistantReply> {
        let thread_id = self.ensure_thread(session).await?;
        let span = info_span!("turn", thread_id = %thread_id, turn_id = %Uuid::new_v4());

        async {
            self.api.add_message(&thread_id, user_message).await?;

            let run = self.api.create_run(&thread_id, &self.assistant_id).await?;
            info!(run_id = %run.id, status = %run.status, "Run created");
            let run_id = run.id.clone();

            let deadline = self.poll.deadline;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(BridgeError::Cancelled),
                waited = tokio::time::timeout(deadline, self.wait_for_run(&thread_id, run)) => {
                    waited.unwrap_or(Err(BridgeError::Timeout(deadline)))
                }
            };

            if let Err(err @ (BridgeError::Cancelled | BridgeError::Timeout(_))) = &outcome {
                warn!(run_id = %run_id, "Abandoning run: {}", err);
                self.cancel_remote_run(&thread_id, &run_id).await;
            }
            outcome?;

            let text = self.latest_reply(&thread_id).await?;
            Ok::<_, BridgeError>(AssistantReply {
                text,
                thread_id: thread_id.clone(),
            })
        }
        .instrument(span)
        .await
    }

    /// Poll until the run is terminal, answering tool calls on the way.
    async fn wait_for_run(&self, thread_id: &str, mut run: Run) -> Result<Run> {
        let mut interval = self.poll.initial_interval;

        loop {
            match run.status {
                RunStatus::Completed => return Ok(run),
                status if status.is_terminal() => {
                    if let Some(last_error) = &run.last_error {
                        warn!(code = %last_error.code, "Run error: {}", last_error.message);
                    }
                    return Err(BridgeError::RunEnded {
                        status: status.to_string(),
                    });
                }
                RunStatus::RequiresAction if !run.pending_tool_calls().is_empty() => {
                    let outputs = self.run_tool_calls(&run).await;
                    run = self
                        .api
                        .submit_tool_outputs(thread_id, &run.id, outputs)
                        .await?;
                    debug!(status = %run.status, "Tool outputs submitted");
                    interval = self.poll.initial_interval;
                }
                status => {
                    if status == RunStatus::RequiresAction {
                        warn!(run_id = %run.id, "Run requires action but lists no tool calls");
                    }
                    debug!(%status, wait_ms = interval.as_millis() as u64, "Run pending");
                    tokio::time::sleep(interval).await;
                    interval = self.poll.next_interval(interval);
                    run = self.api.retrieve_run(thread_id, &run.id).await?;
                }
            }
        }
    }

    /// One output per pending call, in the order the service listed them
    async fn run_tool_calls(&self, run: &Run) -> Vec<ToolOutput> {
        let calls = run.pending_tool_calls();
        info!(count = calls.len(), "Assistant requires action (tool calls)");

        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let name = &call.function.name;
            let result = match call.function.parse_arguments() {
                Ok(arguments) => self.tools.dispatch(name, arguments).await,
                Err(e) => {
                    warn!(call_id = %call.id, "Invalid arguments for {}: {}", name, e);
                    failure(format!("Invalid arguments for {name}: {e}"))
                }
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output: result.to_string(),
            });
        }
        outputs
    }

    /// Best effort; the turn has already failed
    async fn cancel_remote_run(&self, thread_id: &str, run_id: &str) {
        if let Err(e) = self.api.cancel_run(thread_id, run_id).await {
            warn!(run_id, "Failed to cancel run: {}", e);
        }
    }

    /// First text block of the newest assistant message, or empty
    async fn latest_reply(&self, thread_id: &str) -> Result<String> {
        let messages = self.api.list_messages(thread_id).await?;
        Ok(messages
            .iter()
            .find(|message| message.role == MessageRole::Assistant)
            .and_then(|message| message.first_text())
            .unwrap_or_default()
            .to_string())
    }
}
