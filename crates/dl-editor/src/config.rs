//! Layout pipeline configuration.
//!
//! Loaded from a JSON file, then overridden by `DL_*` environment
//! variables, then validated.

use dl_agent::{
    CannedAgent, HttpAgentClient, HttpImageTransport, ImageTransport, InlineTransport, LayoutAgent,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Where layouts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Real agent: analyze the upload, then compute the layout.
    #[default]
    Agent,
    /// Fixed margins after a delay; no agent deployment needed.
    Canned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Image upload endpoint. May be empty in canned mode (image stays inline).
    pub upload_url: String,
    /// Agent endpoint for `analyze_image` and `autolayout`.
    pub agent_url: String,
    /// Bound on each raster/network step.
    pub step_timeout_ms: u64,
    pub mode: LayoutMode,
    pub canned_delay_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            upload_url: String::new(),
            agent_url: String::new(),
            step_timeout_ms: 20_000,
            mode: LayoutMode::Agent,
            canned_delay_ms: 3_000,
            jpeg_quality: 100,
        }
    }
}

impl LayoutConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `DL_*` overrides from `lookup`. Unparseable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DL_UPLOAD_URL") {
            self.upload_url = url;
        }
        if let Some(url) = lookup("DL_AGENT_URL") {
            self.agent_url = url;
        }
        if let Some(raw) = lookup("DL_STEP_TIMEOUT_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.step_timeout_ms = ms,
                Err(_) => log::warn!("ignoring DL_STEP_TIMEOUT_MS={raw:?}: not a number"),
            }
        }
        if let Some(raw) = lookup("DL_LAYOUT_MODE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "agent" => self.mode = LayoutMode::Agent,
                "canned" => self.mode = LayoutMode::Canned,
                _ => log::warn!("ignoring DL_LAYOUT_MODE={raw:?}: expected agent or canned"),
            }
        }
        if let Some(raw) = lookup("DL_CANNED_DELAY_MS") {
            match raw.trim().parse() {
                Ok(ms) => self.canned_delay_ms = ms,
                Err(_) => log::warn!("ignoring DL_CANNED_DELAY_MS={raw:?}: not a number"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.step_timeout_ms == 0 {
            errors.push("step_timeout_ms must be greater than zero".to_string());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            errors.push(format!(
                "jpeg_quality must be within 1..=100 (got {})",
                self.jpeg_quality
            ));
        }
        if self.mode == LayoutMode::Agent {
            if self.upload_url.trim().is_empty() {
                errors.push("upload_url is required in agent mode".to_string());
            }
            if self.agent_url.trim().is_empty() {
                errors.push("agent_url is required in agent mode".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn canned_delay(&self) -> Duration {
        Duration::from_millis(self.canned_delay_ms)
    }

    pub fn transport(&self) -> Arc<dyn ImageTransport> {
        if self.upload_url.trim().is_empty() {
            Arc::new(InlineTransport)
        } else {
            Arc::new(HttpImageTransport::new(self.upload_url.clone()))
        }
    }

    pub fn agent(&self) -> Arc<dyn LayoutAgent> {
        match self.mode {
            LayoutMode::Agent => Arc::new(HttpAgentClient::new(self.agent_url.clone())),
            LayoutMode::Canned => Arc::new(CannedAgent::new(self.canned_delay())),
        }
    }
}
