use crate::options::ChatOptions;
use crate::provider::{ModelCapability, ProviderName, ProviderRegistry};
use ragloop_core::{RagloopError, RagloopResult};
use ragloop_tools::ToolFilter;
use serde::{Deserialize, Serialize};

/// The `[model]` section: which endpoint to talk to and how to sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider id (`aliyun`, `deepseek`, ...). Detected from `base_url` when absent.
    #[serde(default)]
    pub provider: Option<String>,
    /// Explicit base URL; overrides the provider default.
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key, inline.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key; used when `api_key` is unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model name sent on the wire.
    pub model_name: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Sampling seed.
    #[serde(default)]
    pub seed: Option<i64>,
    /// Output token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    /// Output token cap under its newer name.
    #[serde(default)]
    pub max_completion_tokens: Option<u32>,
    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    /// Reasoning toggle.
    #[serde(default)]
    pub thinking: Option<bool>,
    /// Stream responses instead of waiting for the full completion.
    #[serde(default)]
    pub stream: bool,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_tokens() -> Option<u32> {
    Some(4096)
}

fn default_timeout_secs() -> u64 {
    120
}

impl ModelConfig {
    /// A config for `model_name` with every optional field unset.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            provider: None,
            base_url: None,
            api_key: None,
            api_key_env: None,
            model_name: model_name.into(),
            temperature: None,
            top_p: None,
            seed: None,
            max_tokens: default_max_tokens(),
            max_completion_tokens: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking: None,
            stream: false,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// The API key, read from `api_key_env` when not given inline.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// The provider this config talks to.
    pub fn provider_name(&self, providers: &ProviderRegistry) -> ProviderName {
        providers.resolve(self.provider.as_deref(), self.base_url.as_deref())
    }

    /// Validates against the provider's requirements and returns the chat
    /// endpoint base URL.
    pub fn chat_endpoint(&self, providers: &ProviderRegistry) -> RagloopResult<String> {
        let name = self.provider_name(providers);
        let descriptor = providers
            .get(name)
            .ok_or_else(|| RagloopError::Config(format!("Provider '{name}' is not registered")))?;
        descriptor.validate(self.resolve_api_key().as_deref(), &self.model_name)?;
        providers
            .endpoint(name, ModelCapability::Chat, self.base_url.as_deref())
            .ok_or_else(|| {
                RagloopError::Config(format!(
                    "Provider '{name}' has no chat endpoint; set model.base_url"
                ))
            })
    }

    /// Request options carrying the configured sampling fields.
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            seed: self.seed,
            max_tokens: self.max_tokens,
            max_completion_tokens: self.max_completion_tokens,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            thinking: self.thinking,
            ..ChatOptions::default()
        }
    }
}

/// The `[agent]` section: loop bounds and tool enable lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model round trips before the loop gives up.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// System prompt prepended to every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Tools advertised to the model. Absent means every registered tool.
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
    /// Tools the loop will execute. Absent means every registered tool.
    #[serde(default)]
    pub executable_tools: Option<Vec<String>>,
    /// Knowledge bases searched when a call names none.
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,
}

fn default_max_turns() -> u32 {
    20
}

fn default_system_prompt() -> String {
    "You are a retrieval assistant. Answer from the knowledge bases available through your \
     tools. For questions that need several lookups, write a plan with todo_write first and \
     keep it updated. Cite the source documents you used."
        .to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            system_prompt: default_system_prompt(),
            allowed_tools: None,
            executable_tools: None,
            knowledge_base_ids: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Filter for tools advertised to the model.
    pub fn advertise_filter(&self) -> ToolFilter {
        ToolFilter::from_config(self.allowed_tools.as_deref())
    }

    /// Filter for tools the loop executes.
    pub fn execute_filter(&self) -> ToolFilter {
        ToolFilter::from_config(self.executable_tools.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_defaults() {
        let config: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_turns, 20);
        assert!(config.system_prompt.contains("todo_write"));
        assert_eq!(config.advertise_filter(), ToolFilter::All);
    }

    #[test]
    fn test_model_defaults() {
        let config: ModelConfig = serde_json::from_str(r#"{"model_name": "qwen3-32b"}"#).unwrap();
        assert_eq!(config.max_tokens, Some(4096));
        assert_eq!(config.timeout_secs, 120);
        assert!(!config.stream);
        assert!(config.chat_options().tools.is_empty());
    }

    #[test]
    fn test_chat_endpoint_validates() {
        let providers = ProviderRegistry::builtin().unwrap();

        let mut config = ModelConfig::new("qwen-plus");
        config.base_url = Some("https://dashscope.aliyuncs.com/compatible-mode/v1".into());
        let err = config.chat_endpoint(&providers).unwrap_err();
        assert!(err.to_string().contains("API key is required"));

        config.api_key = Some("sk-test".into());
        assert_eq!(
            config.chat_endpoint(&providers).unwrap(),
            "https://dashscope.aliyuncs.com/compatible-mode/v1"
        );

        let mut local = ModelConfig::new("llama3");
        assert!(local.chat_endpoint(&providers).is_err());
        local.base_url = Some("http://localhost:11434/v1".into());
        assert_eq!(local.chat_endpoint(&providers).unwrap(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_agent_from_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
max_turns = 6
allowed_tools = ["knowledge_search", "todo_write"]
knowledge_base_ids = ["kb-1"]
"#,
        )
        .unwrap();
        assert_eq!(config.max_turns, 6);
        assert!(config.advertise_filter().allows("todo_write"));
        assert!(!config.advertise_filter().allows("thinking"));
        assert_eq!(config.execute_filter(), ToolFilter::All);
        assert_eq!(config.knowledge_base_ids, vec!["kb-1"]);
    }

    #[test]
    fn test_api_key_from_env() {
        let mut config = ModelConfig::new("gpt-4o");
        config.api_key_env = Some("RAGLOOP_TEST_KEY_THAT_IS_NOT_SET".into());
        assert_eq!(config.resolve_api_key(), None);
        config.api_key = Some("inline".into());
        assert_eq!(config.resolve_api_key().as_deref(), Some("inline"));
    }
}
