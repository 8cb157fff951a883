//! 代理回覆流程的錯誤類型。
//!
//! 「沒有可用金鑰」並不在這裡：它是正常的終止狀態，會產生罐頭回覆。

use std::fmt;

use crate::agent::config::Provider;

/// 在任何網路活動之前就被拒絕的輸入錯誤。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Message is required")]
    EmptyMessage,
    #[error("Agent personality is required")]
    EmptyPersonality,
    #[error("maxTokens must be a positive integer")]
    ZeroMaxTokens,
    #[error("temperature must be between 0 and 2, got {0}")]
    TemperatureOutOfRange(f32),
}

/// 供應商失敗的分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    InvalidCredential,
    QuotaExceeded,
    NetworkError,
    ModelNotFound,
    /// 主要模型回報找不到，且備援模型也失敗。
    BothModelsFailed,
    Unknown,
}

impl ProviderErrorKind {
    /// 依錯誤訊息的關鍵字（不分大小寫）判斷錯誤類型。
    ///
    /// 第三方 SDK 的措辭隨時可能改變；若供應商提供結構化的錯誤碼，應在此處改為比對錯誤碼。
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|keyword| lower.contains(keyword));

        if has_any(&["api key"]) {
            ProviderErrorKind::InvalidCredential
        } else if has_any(&["quota", "limit"]) {
            ProviderErrorKind::QuotaExceeded
        } else if has_any(&["network", "timeout"]) {
            ProviderErrorKind::NetworkError
        } else if has_any(&["not found", "404"]) {
            ProviderErrorKind::ModelNotFound
        } else {
            ProviderErrorKind::Unknown
        }
    }

    /// 供傳輸層診斷用的機器可讀代碼。
    pub fn code(&self) -> &'static str {
        match self {
            ProviderErrorKind::InvalidCredential => "invalid_credential",
            ProviderErrorKind::QuotaExceeded => "quota_exceeded",
            ProviderErrorKind::NetworkError => "network_error",
            ProviderErrorKind::ModelNotFound => "model_not_found",
            ProviderErrorKind::BothModelsFailed => "both_models_failed",
            ProviderErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 用盡重試次數後仍無法取得回覆的供應商錯誤。
///
/// `detail` 保留原始的供應商訊息，只用於日誌；顯示給使用者的文字請用 [`ProviderError::user_message`]。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider} request failed ({kind}): {detail}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub provider: Provider,
    pub detail: String,
}

impl ProviderError {
    pub fn new(provider: Provider, kind: ProviderErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            provider,
            detail: detail.into(),
        }
    }

    /// 由原始錯誤描述建立，並透過 [`ProviderErrorKind::classify`] 分類。
    pub fn from_raw(provider: Provider, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let kind = ProviderErrorKind::classify(&detail);
        Self::new(provider, kind, detail)
    }

    pub fn both_models_failed(provider: Provider, primary: &ProviderError, fallback: &ProviderError) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::BothModelsFailed,
            format!(
                "Both primary and fallback models failed. {} (fallback: {})",
                primary.detail, fallback.detail
            ),
        )
    }

    /// 可以安全顯示給終端使用者的訊息，不包含原始供應商錯誤。
    pub fn user_message(&self) -> String {
        let provider = self.provider;
        match self.kind {
            ProviderErrorKind::InvalidCredential => format!(
                "Invalid or missing API key for {provider}. Please check your API key and try again."
            ),
            ProviderErrorKind::QuotaExceeded => format!(
                "{provider} API quota exceeded. Please check your usage limits or try again later."
            ),
            ProviderErrorKind::NetworkError => format!(
                "Network error connecting to {provider}. Please check your internet connection and try again."
            ),
            ProviderErrorKind::ModelNotFound => format!(
                "The requested model is not available on {provider}. Please choose a different model and try again."
            ),
            ProviderErrorKind::BothModelsFailed => format!(
                "Both primary and fallback models failed on {provider}. Please try again later."
            ),
            ProviderErrorKind::Unknown => {
                format!("Error generating response from {provider}. Please try again later.")
            }
        }
    }
}

/// `generate_reply` 對外的錯誤。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
