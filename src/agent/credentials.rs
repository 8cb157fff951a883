use log::{debug, info};

use crate::agent::config::Provider;

/// 呼叫端沒有金鑰時改用的供應商。
pub const FALLBACK_PROVIDER: Provider = Provider::Gemini;
/// 呼叫端沒有金鑰時改用的模型。
pub const FALLBACK_MODEL: &str = "gemini-2.0-flash";

/// 呼叫端要求的供應商、金鑰與模型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// 決定後的供應商、金鑰與模型，三者永遠一起替換。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub provider: Provider,
    pub api_key: String,
    pub model: Option<String>,
    pub used_fallback: bool,
}

/// 金鑰解析的結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// 有可用的金鑰，可以呼叫供應商。
    Ready(ResolvedCredential),
    /// 呼叫端與服務設定都沒有金鑰。這不是錯誤，流程會改回覆罐頭訊息。
    NoCredential,
}

/// 在派送前決定要使用哪一組金鑰。
///
/// 預設金鑰在建構時注入，解析時不會讀取環境變數。
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    default_api_key: Option<String>,
}

impl CredentialResolver {
    pub fn new(default_api_key: Option<String>) -> Self {
        Self { default_api_key }
    }

    /// 是否設定了可用的預設金鑰。
    pub fn has_default_key(&self) -> bool {
        usable(self.default_api_key.as_deref()).is_some()
    }

    pub fn resolve(&self, requested: CredentialRequest) -> Resolution {
        if let Some(api_key) = requested.api_key
            && !api_key.trim().is_empty()
        {
            debug!("使用呼叫端提供的 {} 金鑰", requested.provider);
            return Resolution::Ready(ResolvedCredential {
                provider: requested.provider,
                api_key,
                model: requested.model,
                used_fallback: false,
            });
        }

        match usable(self.default_api_key.as_deref()) {
            Some(default_key) => {
                info!(
                    "未提供 API 金鑰，改用預設的 {} / {}",
                    FALLBACK_PROVIDER, FALLBACK_MODEL
                );
                Resolution::Ready(ResolvedCredential {
                    provider: FALLBACK_PROVIDER,
                    api_key: default_key.to_string(),
                    model: Some(FALLBACK_MODEL.to_string()),
                    used_fallback: true,
                })
            }
            None => {
                info!("呼叫端與服務設定皆無可用的 API 金鑰");
                Resolution::NoCredential
            }
        }
    }
}

fn usable(key: Option<&str>) -> Option<&str> {
    key.filter(|key| !key.trim().is_empty())
}
