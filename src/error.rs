// src/error.rs
// Error types shared by the run loop, the assistant client and config loading

use std::time::Duration;

use reqwest::StatusCode;

/// Errors that end a conversation turn (or start-up)
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Assistant API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Assistant API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Invalid thread or run id: {0:?}")]
    InvalidId(String),

    #[error("Run ended with status: {status}")]
    RunEnded { status: String },

    #[error("Run did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised by a tool handler. Never leave the registry.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid webhook response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ended_carries_status_verbatim() {
        let err = BridgeError::RunEnded {
            status: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "Run ended with status: failed");
    }

    #[test]
    fn missing_config_lists_every_key() {
        let err = BridgeError::MissingConfig(vec!["OPENAI_API_KEY", "ASSISTANT_ID"]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration: OPENAI_API_KEY, ASSISTANT_ID"
        );
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = BridgeError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Run did not finish within 300s");
    }
}
