//! `ragloop.toml` loading.

use anyhow::Context;
use ragloop_agent::{AgentConfig, ModelConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The whole config file. Every section is optional; `chat` needs `[model]`.
#[derive(Debug, Default, Deserialize)]
pub struct RagloopConfig {
    #[serde(default)]
    pub model: Option<ModelConfig>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// The `[knowledge]` section.
#[derive(Debug, Default, Deserialize)]
pub struct KnowledgeConfig {
    /// JSON fixture loaded into the in-memory store. Relative paths resolve
    /// against the config file's directory.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

impl RagloopConfig {
    /// Parses a config document.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads `path`. A missing file yields the defaults so commands that need
    /// no model still work.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        if let Some(fixture) = config.knowledge.fixture.take() {
            config.knowledge.fixture = Some(if fixture.is_relative() {
                base.join(fixture)
            } else {
                fixture
            });
        }
        Ok(config)
    }

    /// The `[model]` section, or an error naming what is missing.
    pub fn require_model(&self) -> anyhow::Result<&ModelConfig> {
        self.model
            .as_ref()
            .context("a [model] section with model_name is required for this command")
    }
}
