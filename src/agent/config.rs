use std::fmt;

use serde::{Deserialize, Serialize};

/// 未指定時使用的最大輸出 token 數。
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
/// 未指定時使用的取樣溫度。
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// 支援的 LLM 供應商。
///
/// 新增供應商時，只需要增加一個變體，並在 `providers::http` 中提供對應的 adapter。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI 相容的 chat completions 介面。
    #[default]
    OpenAi,
    /// Google Gemini 的 generateContent 介面。
    Gemini,
}

impl Provider {
    /// 線上格式與錯誤訊息中使用的識別字。
    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// 回傳供應商的顯示名稱。
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Google Gemini",
        }
    }

    /// 代理未指定模型時使用的預設模型。
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::Gemini => "gemini-2.0-flash",
        }
    }

    /// 服務資訊中宣傳的最新模型。
    pub fn latest_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4-turbo",
            Provider::Gemini => "gemini-2.0-flash",
        }
    }

    /// 設定頁面可供選擇的模型清單。
    pub fn available_models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4", "gpt-4-turbo", "gpt-3.5-turbo", "gpt-3.5-turbo-16k"],
            Provider::Gemini => &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"],
        }
    }

    pub fn all() -> &'static [Provider] {
        &[Provider::OpenAi, Provider::Gemini]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// 單次請求的代理設定，由呼叫端擁有，核心只讀取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 描述代理行為的自由文字，不可為空。
    pub personality: String,
    /// 附加到系統提示詞中的知識庫內容（可選）。
    #[serde(default)]
    pub knowledge_base: Option<String>,
    #[serde(default)]
    pub provider: Provider,
    /// 呼叫端提供的 API 金鑰。缺少時會改用預設的供應商與金鑰。
    #[serde(default)]
    pub api_key: Option<String>,
    /// 要使用的模型名稱；缺少時使用供應商的預設模型。
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// 介於 0 到 2 之間。
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl AgentConfig {
    /// 以預設的供應商與生成參數建立設定。
    pub fn new(personality: impl Into<String>) -> Self {
        Self {
            personality: personality.into(),
            knowledge_base: None,
            provider: Provider::default(),
            api_key: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_knowledge_base(mut self, knowledge_base: impl Into<String>) -> Self {
        self.knowledge_base = Some(knowledge_base.into());
        self
    }
}

/// 請求未帶生成參數時採用的預設值，可由服務設定覆寫。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_uses_lowercase_wire_ids() {
        assert_eq!(serde_json::to_string(&Provider::OpenAi).unwrap(), "\"openai\"");
        let parsed: Provider = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(parsed, Provider::Gemini);
        assert_eq!(Provider::Gemini.to_string(), "gemini");
        assert_eq!(Provider::Gemini.display_name(), "Google Gemini");
    }

    #[test]
    fn agent_config_fills_generation_defaults() {
        let config: AgentConfig = serde_json::from_str(r#"{"personality":"calm"}"#).unwrap();
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn every_provider_lists_its_default_and_latest_model() {
        for provider in Provider::all() {
            let models = provider.available_models();
            assert!(models.contains(&provider.default_model()));
            assert!(models.contains(&provider.latest_model()));
        }
    }
}
