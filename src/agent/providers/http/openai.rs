use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;

use crate::agent::config::Provider;
use crate::agent::error::ProviderError;
use crate::agent::message::ChatMessage;
use crate::agent::providers::{text_or_placeholder, GenerationParams, ProviderAdapter};

use super::models::{OpenAiChatPayload, OpenAiChatResponse, OpenAiMessage};
use super::{build_headers, join_url, send_json};

/// 模型不存在時改用的 OpenAI 模型。
pub const OPENAI_FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI 相容 chat completions API 的 adapter。
///
/// 模型名稱原樣送出。
pub struct OpenAiAdapter {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiAdapter {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: join_url(base_url, "chat/completions"),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn fallback_model(&self) -> Option<&'static str> {
        Some(OPENAI_FALLBACK_MODEL)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let payload = OpenAiChatPayload {
            model: &params.model,
            messages: messages
                .iter()
                .map(|message| OpenAiMessage {
                    role: message.role.as_str(),
                    content: &message.content,
                })
                .collect(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let headers = build_headers(
            Provider::OpenAi,
            AUTHORIZATION,
            &format!("Bearer {}", self.api_key),
        )?;
        let request = self.client.post(&self.endpoint).headers(headers);
        let data: OpenAiChatResponse = send_json(Provider::OpenAi, request, &payload).await?;

        let text = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);
        Ok(text_or_placeholder(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::error::ProviderErrorKind;
    use crate::agent::providers::{
        DispatchOptions, Dispatcher, ProviderEndpoints, EMPTY_REPLY_PLACEHOLDER,
    };
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(model: &str) -> GenerationParams {
        GenerationParams {
            model: model.into(),
            max_tokens: 256,
            temperature: 0.3,
        }
    }

    fn options(model: Option<&str>) -> DispatchOptions<'_> {
        DispatchOptions {
            provider: Provider::OpenAi,
            api_key: "sk-test",
            model,
            max_tokens: 256,
            temperature: 0.3,
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("SYS"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("how are you"),
        ]
    }

    #[tokio::test]
    async fn sends_full_message_list_and_returns_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 256,
                "stream": false,
                "messages": [
                    {"role": "system", "content": "SYS"},
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                    {"role": "user", "content": "how are you"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Doing well!"}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let adapter = OpenAiAdapter::new(Client::new(), &mock_server.uri(), "sk-test");
        let text = adapter.complete(&messages(), &params("gpt-4")).await.unwrap();
        assert_eq!(text, "Doing well!");
    }

    #[tokio::test]
    async fn empty_choices_yield_placeholder() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let adapter = OpenAiAdapter::new(Client::new(), &mock_server.uri(), "sk-test");
        let text = adapter.complete(&messages(), &params("gpt-4")).await.unwrap();
        assert_eq!(text, EMPTY_REPLY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn unauthorized_is_classified_as_invalid_credential() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided: sk-test."}
            })))
            .mount(&mock_server)
            .await;

        let adapter = OpenAiAdapter::new(Client::new(), &mock_server.uri(), "sk-test");
        let err = adapter.complete(&messages(), &params("gpt-4")).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidCredential);
        assert_eq!(err.provider, Provider::OpenAi);
    }

    #[tokio::test]
    async fn rate_limits_are_classified_as_quota() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "You exceeded your current quota, please check your plan."}
            })))
            .mount(&mock_server)
            .await;

        let adapter = OpenAiAdapter::new(Client::new(), &mock_server.uri(), "sk-test");
        let err = adapter.complete(&messages(), &params("gpt-4")).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::QuotaExceeded);
    }

    #[tokio::test]
    async fn reply_text_is_returned_verbatim() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "    let x = 1;\n"}}]
            })))
            .mount(&mock_server)
            .await;

        let adapter = OpenAiAdapter::new(Client::new(), &mock_server.uri(), "sk-test");
        let text = adapter.complete(&messages(), &params("gpt-4")).await.unwrap();
        assert_eq!(text, "    let x = 1;\n");
    }

    #[tokio::test]
    async fn missing_model_retries_once_with_fallback() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-x"})))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"message": "The model `gpt-x` does not exist"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": OPENAI_FALLBACK_MODEL})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "from fallback"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(
            Client::new(),
            ProviderEndpoints {
                openai_base_url: mock_server.uri(),
                gemini_base_url: mock_server.uri(),
            },
        );
        let text = dispatcher
            .dispatch(&messages(), options(Some("gpt-x")))
            .await
            .unwrap();
        assert_eq!(text, "from fallback");
    }

    #[tokio::test]
    async fn failed_fallback_reports_both_models_failed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(
            Client::new(),
            ProviderEndpoints {
                openai_base_url: mock_server.uri(),
                gemini_base_url: mock_server.uri(),
            },
        );
        let err = dispatcher
            .dispatch(&messages(), options(Some("gpt-x")))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::BothModelsFailed);
        assert_eq!(err.provider, Provider::OpenAi);
    }

    #[test]
    fn model_names_pass_through() {
        let adapter = OpenAiAdapter::new(Client::new(), "http://localhost", "k");
        assert_eq!(adapter.normalize_model("gpt-4-turbo"), "gpt-4-turbo");
        assert_eq!(adapter.fallback_model(), Some(OPENAI_FALLBACK_MODEL));
        assert_eq!(adapter.endpoint(), "http://localhost/chat/completions");
    }
}
