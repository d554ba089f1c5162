//! Optional TOML config file
//!
//! Loaded from `--config <path>`, or `~/.assistant-bridge/config.toml` when present.
//! Every field is optional; CLI flags and environment variables take precedence.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{BridgeError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub openai_api_key: Option<String>,
    pub webhook_url: Option<String>,
    pub assistant_id: Option<String>,
    pub api_base: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Per-request timeout for both the assistant API and the webhook
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub poll: PollSection,
}

/// `[poll]` table
#[derive(Debug, Default, Deserialize)]
pub struct PollSection {
    pub initial_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub deadline_secs: Option<u64>,
}

impl FileConfig {
    /// Load an explicitly requested file. Missing or malformed files are errors.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content, path)
    }

    /// Load the default file if it exists; problems only produce a warning.
    pub fn load_default() -> Self {
        let path = default_path();
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content, &path).unwrap_or_else(|e| {
                warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            BridgeError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })
    }
}

/// `~/.assistant-bridge/config.toml`
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".assistant-bridge")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
assistant_id = "asst_123"
port = 8080

[poll]
deadline_secs = 30
"#
        )
        .unwrap();

        let config = FileConfig::load_from(file.path()).unwrap();
        assert_eq!(config.assistant_id.as_deref(), Some("asst_123"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.poll.deadline_secs, Some(30));
        assert!(config.poll.initial_interval_ms.is_none());
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        let err = FileConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn default_path_is_under_home() {
        let path = default_path();
        assert!(path.to_string_lossy().contains(".assistant-bridge"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
