use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agent::config::{GenerationDefaults, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::agent::providers::http::{DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL};
use crate::agent::providers::ProviderEndpoints;

/// 預設設定檔的相對路徑。
pub const DEFAULT_CONFIG_PATH: &str = "config/agentchat.toml";
/// 讀取預設金鑰的環境變數。
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY_GEMINI_DEFAULT";

/// 服務層級的設定，通常從 `config/agentchat.toml` 載入。
///
/// 所有欄位都有預設值，設定檔可以只寫需要覆寫的部分。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// 直接寫在設定中的預設 Gemini 金鑰。
    pub default_api_key: Option<String>,
    /// 用於讀取預設金鑰的環境變數名稱。
    pub default_api_key_env: Option<String>,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    /// 傳輸層逾時秒數；未設定時不限制。
    pub request_timeout_secs: Option<u64>,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    /// `env_logger` 的預設過濾層級，`RUST_LOG` 會覆寫它。
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_api_key: None,
            default_api_key_env: Some(DEFAULT_API_KEY_ENV.into()),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.into(),
            request_timeout_secs: None,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            default_temperature: DEFAULT_TEMPERATURE,
            log_level: String::from("info"),
        }
    }
}

impl ServiceSettings {
    /// 讀取設定檔。檔案不存在時回傳預設設定。
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("讀取服務設定失敗: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("解析服務設定失敗: {}", path.display()))
    }

    /// 解析並回傳最終的預設金鑰。
    /// 優先順序：`default_api_key` 欄位 > `default_api_key_env` 環境變數。空白值視為未設定。
    pub fn resolved_default_key(&self) -> Option<String> {
        self.resolved_default_key_with(|var| env::var(var).ok())
    }

    /// 與 `resolved_default_key` 相同，但由呼叫端提供環境變數查詢。
    pub fn resolved_default_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: String| (!value.trim().is_empty()).then_some(value);
        self.default_api_key
            .clone()
            .and_then(non_blank)
            .or_else(|| {
                self.default_api_key_env
                    .as_deref()
                    .and_then(|var| lookup(var))
                    .and_then(non_blank)
            })
    }

    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            openai_base_url: self.openai_base_url.clone(),
            gemini_base_url: self.gemini_base_url.clone(),
        }
    }

    pub fn generation_defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            max_tokens: self.default_max_tokens,
            temperature: self.default_temperature,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
