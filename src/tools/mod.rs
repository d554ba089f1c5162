//! Tool registry for assistant function calls
//!
//! The assistant decides when to call a tool; the run loop hands the call to
//! [`ToolRegistry::dispatch`], which always produces a JSON value so there is
//! an output to submit even when the tool fails.

mod submit_order;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::ToolError;

pub use submit_order::{OrderRequest, SUBMIT_ORDER, SubmitOrder};

/// A callable tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Function name the assistant uses
    fn name(&self) -> &'static str;

    /// Function definition (OpenAI tool format) to configure on the assistant
    fn definition(&self) -> Value;

    async fn call(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Name → handler map
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the order webhook tool
    pub fn with_defaults(client: Client, config: &BridgeConfig) -> Self {
        let mut registry = Self::new();
        registry.register(SubmitOrder::new(client, config.webhook_url.clone()));
        registry
    }

    /// Add a handler, replacing any handler with the same name
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> &mut Self {
        let name = handler.name();
        if self.handlers.insert(name, Arc::new(handler)).is_some() {
            warn!("Replaced tool handler: {}", name);
        }
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.definition())
            .collect()
    }

    /// Run a tool by name. Never fails: errors become `{success: false, error}`.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Value {
        let Some(handler) = self.handlers.get(name) else {
            warn!("Assistant requested unknown function: {}", name);
            return failure(format!("Unknown function: {name}"));
        };

        info!(tool = name, "Dispatching tool call");
        match handler.call(arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                failure(e.to_string())
            }
        }
    }
}

/// Structured failure payload submitted back to the assistant
pub fn failure(message: impl Into<String>) -> Value {
    json!({ "success": false, "error": message.into() })
}
