use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::agent::config::Provider;
use crate::agent::error::ProviderError;

mod gemini;
mod models;
mod openai;

pub use gemini::{reshape_history, GeminiAdapter, GeminiConversation, GeminiRole};
pub use openai::OpenAiAdapter;

/// OpenAI 相容 API 的預設基礎 URL。
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
/// Gemini API 的預設基礎 URL。
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// 建構共用的 JSON 標頭，並以指定的標頭名稱附上金鑰。
fn build_headers(
    provider: Provider,
    key_header: HeaderName,
    key_value: &str,
) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let value = HeaderValue::from_str(key_value).map_err(|err| {
        ProviderError::from_raw(provider, format!("API key is not a valid header value: {err}"))
    })?;
    headers.insert(key_header, value);
    Ok(headers)
}

/// 送出 JSON 請求並解析回應，將各種失敗轉換為已分類的 `ProviderError`。
async fn send_json<B, T>(provider: Provider, request: RequestBuilder, body: &B) -> Result<T, ProviderError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|err| transport_error(provider, &err))?;
    decode_response(provider, response).await
}

async fn decode_response<T: DeserializeOwned>(
    provider: Provider,
    response: Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        debug!("{} 回應錯誤 {}: {}", provider, status, text);
        return Err(ProviderError::from_raw(provider, format!("HTTP {status}: {text}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| ProviderError::from_raw(provider, format!("malformed response: {err}")))
}

fn transport_error(provider: Provider, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::from_raw(provider, format!("request timeout: {err}"))
    } else {
        ProviderError::from_raw(provider, format!("network failure: {err}"))
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
