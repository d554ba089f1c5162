// src/config/mod.rs
// Resolved, immutable bridge configuration. Built once at start-up and passed
// explicitly to the client, the tool registry and the run loop.

mod file;

pub use file::{FileConfig, PollSection, default_path};

use reqwest::Url;
use std::fmt;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::run_loop::PollPolicy;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_WEBHOOK_URL: &str = "GOOGLE_APPS_SCRIPT_WEB_APP_URL";
pub const ENV_ASSISTANT_ID: &str = "ASSISTANT_ID";

/// Values that come from CLI flags or the environment (clap reads both).
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub openai_api_key: Option<String>,
    pub webhook_url: Option<String>,
    pub assistant_id: Option<String>,
    pub api_base: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone)]
pub struct BridgeConfig {
    pub openai_api_key: String,
    pub webhook_url: Url,
    pub assistant_id: String,
    pub api_base: Url,
    pub host: String,
    pub port: u16,
    pub http_timeout: Duration,
    pub poll: PollPolicy,
}

impl BridgeConfig {
    /// Layer overrides over the file and defaults, then validate.
    ///
    /// All three required values are checked together so the error names
    /// every missing key at once.
    pub fn resolve(overrides: ConfigOverrides, file: FileConfig) -> Result<Self> {
        let openai_api_key = non_empty(overrides.openai_api_key).or(non_empty(file.openai_api_key));
        let webhook_url = non_empty(overrides.webhook_url).or(non_empty(file.webhook_url));
        let assistant_id = non_empty(overrides.assistant_id).or(non_empty(file.assistant_id));

        let (Some(openai_api_key), Some(webhook_url), Some(assistant_id)) =
            (openai_api_key.clone(), webhook_url.clone(), assistant_id.clone())
        else {
            let mut missing = Vec::new();
            if openai_api_key.is_none() {
                missing.push(ENV_API_KEY);
            }
            if webhook_url.is_none() {
                missing.push(ENV_WEBHOOK_URL);
            }
            if assistant_id.is_none() {
                missing.push(ENV_ASSISTANT_ID);
            }
            return Err(BridgeError::MissingConfig(missing));
        };

        let webhook_url = parse_url("webhook_url", &webhook_url)?;
        let api_base = overrides
            .api_base
            .or(file.api_base)
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = parse_url("api_base", &api_base)?;

        let poll = poll_policy(&file.poll)?;

        Ok(Self {
            openai_api_key,
            webhook_url,
            assistant_id,
            api_base,
            host: overrides
                .host
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            http_timeout: Duration::from_secs(
                file.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            poll,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Keep the API key out of logs
impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("openai_api_key", &"<redacted>")
            .field("webhook_url", &self.webhook_url.as_str())
            .field("assistant_id", &self.assistant_id)
            .field("api_base", &self.api_base.as_str())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("http_timeout", &self.http_timeout)
            .field("poll", &self.poll)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_url(key: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| BridgeError::InvalidConfig(format!("{key} '{value}': {e}")))
}

fn poll_policy(section: &PollSection) -> Result<PollPolicy> {
    let defaults = PollPolicy::default();
    let policy = PollPolicy {
        initial_interval: section
            .initial_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_interval),
        max_interval: section
            .max_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_interval),
        backoff_factor: section.backoff_factor.unwrap_or(defaults.backoff_factor),
        deadline: section
            .deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.deadline),
    };

    if policy.initial_interval.is_zero() {
        return Err(BridgeError::InvalidConfig(
            "poll.initial_interval_ms must be positive".into(),
        ));
    }
    if policy.max_interval < policy.initial_interval {
        return Err(BridgeError::InvalidConfig(
            "poll.max_interval_ms must be >= poll.initial_interval_ms".into(),
        ));
    }
    if !policy.backoff_factor.is_finite() || policy.backoff_factor < 1.0 {
        return Err(BridgeError::InvalidConfig(
            "poll.backoff_factor must be a finite number >= 1.0".into(),
        ));
    }
    if policy.deadline.is_zero() {
        return Err(BridgeError::InvalidConfig(
            "poll.deadline_secs must be positive".into(),
        ));
    }
    Ok(policy)
}
