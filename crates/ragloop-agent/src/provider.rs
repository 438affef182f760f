//! Provider descriptor table and model-family quirk rules.
//!
//! Vendor differences are data: a [`ProviderDescriptor`] per vendor (default
//! endpoints, base-URL detection patterns, auth requirement) and a list of
//! [`ModelFamily`] rules keyed by model-name regex (thinking style,
//! `tool_choice` support). The wire encoder consults both; nothing else in the
//! crate branches on a vendor name.

use ragloop_core::{RagloopError, RagloopResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Known model vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// Any self-hosted OpenAI-compatible server.
    Generic,
    /// Alibaba DashScope.
    Aliyun,
    /// ZhipuAI (GLM series).
    Zhipu,
    /// Volcengine Ark.
    Volcengine,
    /// Tencent Hunyuan.
    Hunyuan,
    /// SiliconFlow.
    SiliconFlow,
    /// DeepSeek.
    DeepSeek,
    /// MiniMax.
    MiniMax,
    /// OpenAI.
    OpenAi,
    /// Google Gemini through its OpenAI-compatible surface.
    Gemini,
    /// OpenRouter.
    OpenRouter,
    /// Jina AI (embedding and rerank only).
    Jina,
    /// Xiaomi MiMo.
    Mimo,
}

impl ProviderName {
    /// Every provider, in listing order.
    pub const ALL: [ProviderName; 13] = [
        ProviderName::Generic,
        ProviderName::Aliyun,
        ProviderName::Zhipu,
        ProviderName::Volcengine,
        ProviderName::Hunyuan,
        ProviderName::SiliconFlow,
        ProviderName::DeepSeek,
        ProviderName::MiniMax,
        ProviderName::OpenAi,
        ProviderName::Gemini,
        ProviderName::OpenRouter,
        ProviderName::Jina,
        ProviderName::Mimo,
    ];

    /// Config and wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Generic => "generic",
            ProviderName::Aliyun => "aliyun",
            ProviderName::Zhipu => "zhipu",
            ProviderName::Volcengine => "volcengine",
            ProviderName::Hunyuan => "hunyuan",
            ProviderName::SiliconFlow => "siliconflow",
            ProviderName::DeepSeek => "deepseek",
            ProviderName::MiniMax => "minimax",
            ProviderName::OpenAi => "openai",
            ProviderName::Gemini => "gemini",
            ProviderName::OpenRouter => "openrouter",
            ProviderName::Jina => "jina",
            ProviderName::Mimo => "mimo",
        }
    }

    /// Parses a configured provider name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of model an endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCapability {
    /// Chat completions.
    Chat,
    /// Text embeddings.
    Embedding,
    /// Passage reranking.
    Rerank,
    /// Vision-language chat.
    Vision,
}

impl fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelCapability::Chat => "chat",
            ModelCapability::Embedding => "embedding",
            ModelCapability::Rerank => "rerank",
            ModelCapability::Vision => "vision",
        })
    }
}

/// Static description of one vendor.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Provider id.
    pub name: ProviderName,
    /// Human-readable vendor name.
    pub display_name: &'static str,
    /// Example models.
    pub description: &'static str,
    /// Default base URL per capability.
    pub default_urls: Vec<(ModelCapability, &'static str)>,
    /// Capabilities the vendor serves.
    pub capabilities: Vec<ModelCapability>,
    /// Base-URL substrings that identify the vendor.
    pub url_patterns: Vec<&'static str>,
    /// Whether an API key is mandatory.
    pub requires_auth: bool,
}

impl ProviderDescriptor {
    fn new(name: ProviderName, display_name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            display_name,
            description,
            default_urls: Vec::new(),
            capabilities: Vec::new(),
            url_patterns: Vec::new(),
            requires_auth: true,
        }
    }

    fn url(mut self, capability: ModelCapability, url: &'static str) -> Self {
        self.default_urls.push((capability, url));
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    fn detect_on(mut self, patterns: &[&'static str]) -> Self {
        self.url_patterns.extend_from_slice(patterns);
        self
    }

    fn open(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// Default base URL for `capability`, falling back to the chat URL.
    pub fn default_url(&self, capability: ModelCapability) -> Option<&'static str> {
        let lookup = |cap: ModelCapability| {
            self.default_urls
                .iter()
                .find(|(c, _)| *c == cap)
                .map(|(_, url)| *url)
        };
        lookup(capability).or_else(|| lookup(ModelCapability::Chat))
    }

    /// Whether the vendor serves `capability`.
    pub fn supports(&self, capability: ModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether `base_url` points at this vendor.
    pub fn matches_url(&self, base_url: &str) -> bool {
        let url = base_url.to_ascii_lowercase();
        self.url_patterns.iter().any(|p| url.contains(p))
    }

    /// Checks the fields this vendor needs before any request is made.
    pub fn validate(&self, api_key: Option<&str>, model_name: &str) -> RagloopResult<()> {
        let has_key = api_key.is_some_and(|k| !k.trim().is_empty());
        if self.requires_auth && !has_key {
            return Err(RagloopError::Config(format!(
                "API key is required for {}",
                self.display_name
            )));
        }
        if model_name.trim().is_empty() {
            return Err(RagloopError::Config("model name is required".to_string()));
        }
        Ok(())
    }
}

/// How a model family expects the reasoning toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingStyle {
    /// No toggle; the option is stripped.
    Unsupported,
    /// Top-level `"enable_thinking": bool`.
    EnableThinkingFlag,
    /// `"thinking": {"type": "enabled" | "disabled"}`.
    ThinkingObject,
}

/// Quirk rule for model names matching a pattern.
#[derive(Debug, Clone)]
pub struct ModelFamily {
    /// Rule name, for logs and listings.
    pub name: &'static str,
    pattern: Option<Regex>,
    /// Reasoning toggle encoding.
    pub thinking: ThinkingStyle,
    /// Value sent when the caller leaves thinking unset.
    pub thinking_default: Option<bool>,
    /// Whether the family accepts `tool_choice`.
    pub supports_tool_choice: bool,
}

impl ModelFamily {
    /// Builds a rule; `pattern` is a regex matched against the model name.
    pub fn new(
        name: &'static str,
        pattern: &str,
        thinking: ThinkingStyle,
        supports_tool_choice: bool,
    ) -> RagloopResult<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| RagloopError::Config(format!("invalid model family '{name}': {e}")))?;
        Ok(Self {
            name,
            pattern: Some(pattern),
            thinking,
            thinking_default: None,
            supports_tool_choice,
        })
    }

    /// Sends `value` when the caller leaves thinking unset.
    pub fn with_thinking_default(mut self, value: bool) -> Self {
        self.thinking_default = Some(value);
        self
    }

    /// Whether the rule applies to `model_name`.
    pub fn matches(&self, model_name: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(model_name))
    }

    /// Rule applied to models no other rule matches. Matches nothing itself.
    pub fn fallback() -> Self {
        Self {
            name: "default",
            pattern: None,
            thinking: ThinkingStyle::Unsupported,
            thinking_default: None,
            supports_tool_choice: true,
        }
    }

    /// Resolves the thinking toggle into the top-level fields to merge into
    /// the wire body.
    pub fn thinking_fields(&self, requested: Option<bool>) -> Vec<(&'static str, serde_json::Value)> {
        let Some(enabled) = requested.or(self.thinking_default) else {
            return Vec::new();
        };
        match self.thinking {
            ThinkingStyle::Unsupported => Vec::new(),
            ThinkingStyle::EnableThinkingFlag => {
                vec![("enable_thinking", serde_json::Value::Bool(enabled))]
            }
            ThinkingStyle::ThinkingObject => vec![(
                "thinking",
                serde_json::json!({"type": if enabled { "enabled" } else { "disabled" }}),
            )],
        }
    }
}

/// Read-only table of providers and model families.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
    families: Vec<ModelFamily>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in vendor table and quirk rules.
    pub fn builtin() -> RagloopResult<Self> {
        use ModelCapability::{Chat, Embedding, Rerank, Vision};

        let aliyun_chat = "https://dashscope.aliyuncs.com/compatible-mode/v1";
        let mut registry = Self::new();

        // Detection walks providers in registration order; order matters.
        registry.register(
            ProviderDescriptor::new(ProviderName::Aliyun, "Alibaba DashScope", "qwen-plus, qwen3-rerank, etc.")
                .url(Chat, aliyun_chat)
                .url(Embedding, aliyun_chat)
                .url(
                    Rerank,
                    "https://dashscope.aliyuncs.com/api/v1/services/rerank/text-rerank/text-rerank",
                )
                .url(Vision, aliyun_chat)
                .detect_on(&["dashscope.aliyuncs.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Zhipu, "ZhipuAI", "glm-4.5, embedding-3, etc.")
                .url(Chat, "https://open.bigmodel.cn/api/paas/v4")
                .url(Embedding, "https://open.bigmodel.cn/api/paas/v4")
                .url(Vision, "https://open.bigmodel.cn/api/paas/v4")
                .detect_on(&["open.bigmodel.cn", "zhipu"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::OpenRouter, "OpenRouter", "routes to many vendors")
                .url(Chat, "https://openrouter.ai/api/v1")
                .url(Vision, "https://openrouter.ai/api/v1")
                .detect_on(&["openrouter.ai"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::SiliconFlow, "SiliconFlow", "Qwen, DeepSeek, BGE, etc.")
                .url(Chat, "https://api.siliconflow.cn/v1")
                .url(Embedding, "https://api.siliconflow.cn/v1")
                .url(Rerank, "https://api.siliconflow.cn/v1")
                .url(Vision, "https://api.siliconflow.cn/v1")
                .detect_on(&["siliconflow.cn"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Jina, "Jina AI", "jina-embeddings-v3, jina-reranker-v2, etc.")
                .url(Embedding, "https://api.jina.ai/v1")
                .url(Rerank, "https://api.jina.ai/v1")
                .detect_on(&["api.jina.ai"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::OpenAi, "OpenAI", "gpt-4o, text-embedding-3-small, etc.")
                .url(Chat, "https://api.openai.com/v1")
                .url(Embedding, "https://api.openai.com/v1")
                .url(Vision, "https://api.openai.com/v1")
                .detect_on(&["api.openai.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::DeepSeek, "DeepSeek", "deepseek-chat, deepseek-reasoner")
                .url(Chat, "https://api.deepseek.com/v1")
                .detect_on(&["api.deepseek.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Gemini, "Google Gemini", "gemini-2.5-pro, gemini-2.5-flash, etc.")
                .url(Chat, "https://generativelanguage.googleapis.com/v1beta/openai")
                .detect_on(&["generativelanguage.googleapis.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Volcengine, "Volcengine Ark", "doubao-seed-1.6, doubao-embedding, etc.")
                .url(Chat, "https://ark.cn-beijing.volces.com/api/v3")
                .url(Embedding, "https://ark.cn-beijing.volces.com/api/v3")
                .url(Vision, "https://ark.cn-beijing.volces.com/api/v3")
                .detect_on(&["volces.com", "volcengine"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Hunyuan, "Tencent Hunyuan", "hunyuan-turbos, hunyuan-embedding, etc.")
                .url(Chat, "https://api.hunyuan.cloud.tencent.com/v1")
                .url(Embedding, "https://api.hunyuan.cloud.tencent.com/v1")
                .detect_on(&["hunyuan.cloud.tencent.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::MiniMax, "MiniMax", "MiniMax-M1, abab6.5s, etc.")
                .url(Chat, "https://api.minimax.io/v1")
                .detect_on(&["minimax.io", "minimaxi.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Mimo, "Xiaomi MiMo", "mimo-v2-flash")
                .url(Chat, "https://api.xiaomimimo.com/v1")
                .detect_on(&["xiaomimimo.com"]),
        )?;
        registry.register(
            ProviderDescriptor::new(ProviderName::Generic, "OpenAI-compatible", "vLLM, Ollama, LocalAI, etc.")
                .open(),
        )?;

        registry.add_family(
            ModelFamily::new("qwen3", r"^qwen3-", ThinkingStyle::EnableThinkingFlag, true)?
                .with_thinking_default(false),
        );
        registry.add_family(ModelFamily::new(
            "deepseek",
            r"(?i)deepseek",
            ThinkingStyle::Unsupported,
            false,
        )?);
        registry.add_family(ModelFamily::new(
            "doubao",
            r"(?i)^doubao-seed",
            ThinkingStyle::ThinkingObject,
            true,
        )?);
        registry.add_family(ModelFamily::new(
            "glm",
            r"(?i)^glm-4\.[5-9]",
            ThinkingStyle::ThinkingObject,
            true,
        )?);

        Ok(registry)
    }

    /// Adds a provider. Names are unique.
    pub fn register(&mut self, descriptor: ProviderDescriptor) -> RagloopResult<()> {
        if self.get(descriptor.name).is_some() {
            return Err(RagloopError::Config(format!(
                "Provider '{}' is already registered",
                descriptor.name
            )));
        }
        self.providers.push(descriptor);
        Ok(())
    }

    /// Appends a model-family rule. The first matching rule wins.
    pub fn add_family(&mut self, family: ModelFamily) {
        self.families.push(family);
    }

    /// Looks up a provider by name.
    pub fn get(&self, name: ProviderName) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// All providers, in registration order.
    pub fn list(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    /// Providers serving `capability`.
    pub fn list_by_capability(&self, capability: ModelCapability) -> Vec<&ProviderDescriptor> {
        self.providers
            .iter()
            .filter(|p| p.supports(capability))
            .collect()
    }

    /// Identifies the vendor behind `base_url`; `generic` when nothing matches.
    pub fn detect(&self, base_url: &str) -> ProviderName {
        self.providers
            .iter()
            .find(|p| p.matches_url(base_url))
            .map_or(ProviderName::Generic, |p| p.name)
    }

    /// Picks the provider for a config: the configured name when registered,
    /// else URL detection, else `generic`.
    pub fn resolve(&self, configured: Option<&str>, base_url: Option<&str>) -> ProviderName {
        if let Some(name) = configured.and_then(ProviderName::parse) {
            if self.get(name).is_some() {
                return name;
            }
        }
        base_url.map_or(ProviderName::Generic, |url| self.detect(url))
    }

    /// Base URL for `capability`. An explicit URL wins over the defaults.
    pub fn endpoint(
        &self,
        provider: ProviderName,
        capability: ModelCapability,
        explicit: Option<&str>,
    ) -> Option<String> {
        if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.get(provider)
            .and_then(|p| p.default_url(capability))
            .map(str::to_string)
    }

    /// The quirk rule for `model_name`.
    pub fn family(&self, model_name: &str) -> ModelFamily {
        self.families
            .iter()
            .find(|f| f.matches(model_name))
            .cloned()
            .unwrap_or_else(ModelFamily::fallback)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::builtin().unwrap()
    }

    #[test]
    fn test_detection_order() {
        let r = registry();
        assert_eq!(
            r.detect("https://dashscope.aliyuncs.com/compatible-mode/v1"),
            ProviderName::Aliyun
        );
        assert_eq!(r.detect("https://open.bigmodel.cn/api/paas/v4"), ProviderName::Zhipu);
        assert_eq!(r.detect("https://my-zhipu-proxy.local/v1"), ProviderName::Zhipu);
        assert_eq!(r.detect("https://OPENROUTER.ai/api/v1"), ProviderName::OpenRouter);
        assert_eq!(r.detect("https://api.deepseek.com"), ProviderName::DeepSeek);
        assert_eq!(
            r.detect("https://generativelanguage.googleapis.com/v1beta/openai"),
            ProviderName::Gemini
        );
        assert_eq!(r.detect("https://ark.cn-beijing.volces.com/api/v3"), ProviderName::Volcengine);
        assert_eq!(r.detect("https://api.minimaxi.com/v1"), ProviderName::MiniMax);
        assert_eq!(r.detect("https://api.xiaomimimo.com/v1"), ProviderName::Mimo);
        assert_eq!(r.detect("http://localhost:11434/v1"), ProviderName::Generic);
    }

    #[test]
    fn test_resolve_prefers_configured_name() {
        let r = registry();
        assert_eq!(
            r.resolve(Some("DeepSeek"), Some("https://api.openai.com/v1")),
            ProviderName::DeepSeek
        );
        assert_eq!(
            r.resolve(Some("not-a-vendor"), Some("https://api.openai.com/v1")),
            ProviderName::OpenAi
        );
        assert_eq!(r.resolve(None, None), ProviderName::Generic);
    }

    #[test]
    fn test_endpoint_fallback() {
        let r = registry();
        assert_eq!(
            r.endpoint(ProviderName::Gemini, ModelCapability::Embedding, None).unwrap(),
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
        assert!(r
            .endpoint(ProviderName::Aliyun, ModelCapability::Rerank, None)
            .unwrap()
            .ends_with("text-rerank/text-rerank"));
        assert_eq!(
            r.endpoint(ProviderName::Aliyun, ModelCapability::Chat, Some("http://proxy/v1/")),
            Some("http://proxy/v1".to_string())
        );
        assert_eq!(r.endpoint(ProviderName::Jina, ModelCapability::Chat, None), None);
        assert_eq!(r.endpoint(ProviderName::Generic, ModelCapability::Chat, None), None);
    }

    #[test]
    fn test_validate() {
        let r = registry();
        let aliyun = r.get(ProviderName::Aliyun).unwrap();
        let err = aliyun.validate(None, "qwen-plus").unwrap_err();
        assert!(err.to_string().contains("API key is required"));
        assert!(aliyun.validate(Some("sk"), " ").is_err());
        assert!(aliyun.validate(Some("sk"), "qwen-plus").is_ok());

        let generic = r.get(ProviderName::Generic).unwrap();
        assert!(generic.validate(None, "llama3").is_ok());
    }

    #[test]
    fn test_model_families() {
        let r = registry();
        let qwen = r.family("qwen3-32b");
        assert_eq!(qwen.thinking_fields(None), vec![("enable_thinking", serde_json::json!(false))]);
        assert_eq!(qwen.thinking_fields(Some(true)), vec![("enable_thinking", serde_json::json!(true))]);

        let deepseek = r.family("DeepSeek-V3");
        assert!(!deepseek.supports_tool_choice);
        assert!(deepseek.thinking_fields(Some(true)).is_empty());

        let doubao = r.family("doubao-seed-1-6");
        assert_eq!(
            doubao.thinking_fields(Some(false)),
            vec![("thinking", serde_json::json!({"type": "disabled"}))]
        );
        assert!(doubao.thinking_fields(None).is_empty());

        let other = r.family("gpt-4o");
        assert_eq!(other.name, "default");
        assert!(other.supports_tool_choice);
        // Prefix rule: a qwen3 name in the middle does not match.
        assert_eq!(r.family("my-qwen3-finetune").name, "default");
    }

    #[test]
    fn test_duplicate_provider_rejected() {
        let mut r = registry();
        let dup = ProviderDescriptor::new(ProviderName::Jina, "again", "");
        assert!(r.register(dup).is_err());
    }

    #[test]
    fn test_list_by_capability() {
        let r = registry();
        let rerank: Vec<_> = r
            .list_by_capability(ModelCapability::Rerank)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(
            rerank,
            vec![ProviderName::Aliyun, ProviderName::SiliconFlow, ProviderName::Jina]
        );
    }
}
