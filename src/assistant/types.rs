// src/assistant/types.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message role in a thread
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// Response from creating a thread
#[derive(Deserialize, Debug, Clone)]
pub struct Thread {
    pub id: String,
}

/// Request to create a message in a thread
#[derive(Serialize, Debug)]
pub struct CreateMessageRequest<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

/// A message as returned by the list endpoint
#[derive(Deserialize, Debug, Clone)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Value of the first text block, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            MessageContent::Text { text } => Some(text.value.as_str()),
            MessageContent::Other => None,
        })
    }
}

/// Content within a message. Only text blocks are read.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

/// Text content details
#[derive(Deserialize, Debug, Clone)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// List messages response
#[derive(Deserialize, Debug)]
pub struct ListMessagesResponse {
    pub data: Vec<ThreadMessage>,
    #[serde(default)]
    pub has_more: bool,
}

/// Request to create a run
#[derive(Serialize, Debug)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

/// Run object returned by create/retrieve/submit/cancel
#[derive(Deserialize, Debug, Clone)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    /// Tool calls awaiting output, empty unless status is `requires_action`
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .and_then(|action| action.submit_tool_outputs.as_ref())
            .map(|outputs| outputs.tool_calls.as_slice())
            .unwrap_or_default()
    }
}

/// Thread and run ids are opaque tokens like `thread_abc123`; anything
/// else is refused before it reaches a request path.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Run status values
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Other,
}

impl RunStatus {
    /// Anything other than queued / in_progress / requires_action
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Other => "other",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputsAction>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SubmitToolOutputsAction {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

/// A function call requested by the assistant
#[derive(Deserialize, Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments object
    pub arguments: String,
}

impl FunctionCall {
    /// Decode the arguments string; it must hold a JSON object.
    pub fn parse_arguments(&self) -> Result<Value, String> {
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => Err("expected a JSON object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Output for one tool call; `output` is a JSON-serialized string
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Serialize, Debug)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_status_parses_known_and_unknown_values() {
        let parse = |s: &str| serde_json::from_value::<RunStatus>(json!(s)).unwrap();
        assert_eq!(parse("requires_action"), RunStatus::RequiresAction);
        assert_eq!(parse("in_progress"), RunStatus::InProgress);
        assert_eq!(parse("something_new"), RunStatus::Other);
    }

    #[test]
    fn ids_are_plain_tokens() {
        assert!(is_valid_id("thread_abc123"));
        assert!(is_valid_id("run-XYZ_9"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(".."));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id("t?evil=1#"));
        assert!(!is_valid_id("thread 1"));
    }

    #[test]
    fn only_three_statuses_are_pending() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(!RunStatus::RequiresAction.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Expired.is_terminal());
        assert!(RunStatus::Other.is_terminal());
    }

    #[test]
    fn run_exposes_pending_tool_calls() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "submit_order", "arguments": "{\"quantity\":2}" }
                    }]
                }
            }
        }))
        .unwrap();

        let calls = run.pending_tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "submit_order");
        assert_eq!(
            calls[0].function.parse_arguments().unwrap(),
            json!({ "quantity": 2 })
        );
    }

    #[test]
    fn run_without_action_has_no_calls() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "queued",
            "required_action": null
        }))
        .unwrap();
        assert!(run.pending_tool_calls().is_empty());
    }

    #[test]
    fn arguments_must_be_an_object() {
        let call = FunctionCall {
            name: "submit_order".into(),
            arguments: "[1, 2]".into(),
        };
        assert_eq!(call.parse_arguments().unwrap_err(), "expected a JSON object");

        let broken = FunctionCall {
            name: "submit_order".into(),
            arguments: "{quantity".into(),
        };
        assert!(broken.parse_arguments().is_err());
    }

    #[test]
    fn first_text_skips_non_text_blocks() {
        let message: ThreadMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                { "type": "image_file", "image_file": { "file_id": "file_1" } },
                { "type": "text", "text": { "value": "Your order is in!", "annotations": [] } },
                { "type": "text", "text": { "value": "second", "annotations": [] } }
            ]
        }))
        .unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.first_text(), Some("Your order is in!"));
    }

    #[test]
    fn create_message_serializes_user_role() {
        let body = serde_json::to_value(CreateMessageRequest {
            role: MessageRole::User,
            content: "hello",
        })
        .unwrap();
        assert_eq!(body, json!({ "role": "user", "content": "hello" }));
    }
}
