//! `providers` 模組負責把組合好的訊息派送給不同的 LLM 供應商。
//!
//! 每個供應商都實作 `ProviderAdapter` trait，隱藏各自的請求與回應格式；
//! `Dispatcher` 負責選擇 adapter、正規化模型名稱，以及在模型不存在時改用備援模型重試一次。

// --- 子模組宣告 ---

/// `http` 模組：透過 HTTPS API 與 OpenAI、Gemini 通訊的 adapter 實作。
pub mod http;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use crate::agent::config::Provider;
use crate::agent::error::{ProviderError, ProviderErrorKind};
use crate::agent::message::ChatMessage;

use self::http::{GeminiAdapter, OpenAiAdapter};

/// 供應商回傳成功但沒有任何文字時使用的替代回覆。
pub const EMPTY_REPLY_PLACEHOLDER: &str = "Sorry, I could not generate a response.";

/// 單次呼叫的生成參數。
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// 已正規化、供應商實際接受的模型識別字。
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// 所有供應商 adapter 都必須遵守的通用介面。
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// 此 adapter 對應的供應商。
    fn provider(&self) -> Provider;

    /// 將友善的模型別名轉換成 API 實際需要的識別字。未知名稱原樣回傳。
    fn normalize_model(&self, model: &str) -> String {
        model.to_string()
    }

    /// 模型不存在時改用的模型。回傳 `None` 表示不重試。
    fn fallback_model(&self) -> Option<&'static str> {
        None
    }

    /// 呼叫供應商一次，並回傳主要候選回覆的文字。
    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;
}

/// 派送一次請求所需的供應商、金鑰與生成參數。
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions<'a> {
    pub provider: Provider,
    pub api_key: &'a str,
    /// 缺少時使用供應商的預設模型。
    pub model: Option<&'a str>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// 各供應商 API 的基礎 URL。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub openai_base_url: String,
    pub gemini_base_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai_base_url: http::DEFAULT_OPENAI_BASE_URL.into(),
            gemini_base_url: http::DEFAULT_GEMINI_BASE_URL.into(),
        }
    }
}

/// 依供應商選擇 adapter 並執行呼叫。
///
/// 內部的 `reqwest::Client` 可以安全地在多個並行請求間共用。
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    endpoints: ProviderEndpoints,
}

impl Dispatcher {
    pub fn new(client: Client, endpoints: ProviderEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// 為指定的供應商與金鑰建立 adapter。
    pub fn adapter(&self, provider: Provider, api_key: &str) -> Box<dyn ProviderAdapter> {
        match provider {
            Provider::OpenAi => Box::new(OpenAiAdapter::new(
                self.client.clone(),
                &self.endpoints.openai_base_url,
                api_key,
            )),
            Provider::Gemini => Box::new(GeminiAdapter::new(
                self.client.clone(),
                &self.endpoints.gemini_base_url,
                api_key,
            )),
        }
    }

    pub async fn dispatch(
        &self,
        messages: &[ChatMessage],
        options: DispatchOptions<'_>,
    ) -> Result<String, ProviderError> {
        let adapter = self.adapter(options.provider, options.api_key);
        let model = options
            .model
            .filter(|model| !model.trim().is_empty())
            .unwrap_or(options.provider.default_model());
        run_with_fallback(
            adapter.as_ref(),
            messages,
            model,
            options.max_tokens,
            options.temperature,
        )
        .await
    }
}

/// 執行一次呼叫；若供應商回報模型不存在，改用備援模型再試一次，且只試一次。
pub async fn run_with_fallback(
    adapter: &dyn ProviderAdapter,
    messages: &[ChatMessage],
    model: &str,
    max_tokens: u32,
    temperature: f32,
) -> Result<String, ProviderError> {
    let provider = adapter.provider();
    let params = GenerationParams {
        model: adapter.normalize_model(model),
        max_tokens,
        temperature,
    };
    debug!("派送至 {} (模型 {})", provider.display_name(), params.model);

    let primary = match adapter.complete(messages, &params).await {
        Ok(text) => return Ok(text),
        Err(err) => err,
    };

    let fallback = match (primary.kind, adapter.fallback_model()) {
        (ProviderErrorKind::ModelNotFound, Some(fallback)) => fallback,
        _ => return Err(primary),
    };

    warn!(
        "模型 {} 在 {} 上無法使用，改用備援模型 {}",
        params.model,
        provider.display_name(),
        fallback
    );
    let retry = GenerationParams {
        model: fallback.to_string(),
        ..params
    };
    adapter
        .complete(messages, &retry)
        .await
        .map_err(|err| ProviderError::both_models_failed(provider, &primary, &err))
}

/// 取出回覆文字；缺少或空白時回傳替代訊息，而不是視為錯誤。
pub(crate) fn text_or_placeholder(text: Option<String>) -> String {
    match text {
        Some(text) if !text.trim().is_empty() => text,
        _ => EMPTY_REPLY_PLACEHOLDER.to_string(),
    }
}
