//! 呼叫端實際使用的回覆產生流程。
//!
//! 驗證輸入 → 解析金鑰 →（無金鑰時直接回覆罐頭訊息）→ 組合提示詞 → 派送給供應商。

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;
use reqwest::Client;

use crate::agent::config::{AgentConfig, GenerationDefaults, Provider};
use crate::agent::credentials::{CredentialRequest, CredentialResolver, Resolution};
use crate::agent::error::{AgentError, ValidationError};
use crate::agent::message::{ConversationTurn, GeneratedReply};
use crate::agent::prompt::{assemble_messages, compose_system_prompt};
use crate::agent::providers::{DispatchOptions, Dispatcher};
use crate::config::ServiceSettings;

/// 從固定的罐頭回覆中選出一則。
pub trait ReplyPicker: Send + Sync {
    /// 回傳 `0..candidates` 之間的索引。
    fn pick(&self, candidates: usize) -> usize;
}

/// 以執行緒本地的亂數產生器選擇。
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl ReplyPicker for RandomPicker {
    fn pick(&self, candidates: usize) -> usize {
        if candidates == 0 {
            return 0;
        }
        rand::rng().random_range(0..candidates)
    }
}

/// 永遠選擇同一個索引（超出範圍時取餘數），用於可重現的測試。
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPicker(pub usize);

impl ReplyPicker for FixedPicker {
    fn pick(&self, candidates: usize) -> usize {
        if candidates == 0 { 0 } else { self.0 % candidates }
    }
}

/// 沒有任何金鑰時可能的罐頭回覆，每一則都會引用代理的個性。
pub fn canned_replies(message: &str, personality: &str) -> [String; 5] {
    [
        format!(
            "Thank you for your message. As an AI assistant with this personality: \"{personality}\", I would love to help you, but I need a valid API key to provide intelligent responses. Try using Gemini 2.0 Flash for enhanced performance!"
        ),
        format!(
            "I understand you're asking about: \"{message}\". Based on my personality setting: \"{personality}\", I'd be happy to assist, but please configure an API key first. Gemini 2.0 Flash offers great multimodal capabilities."
        ),
        format!(
            "Your message has been received. With my current personality: \"{personality}\", I aim to be helpful, but I require an API key to access AI capabilities like Gemini 2.0 Flash or OpenAI models."
        ),
        format!(
            "I appreciate your inquiry. Given my personality: \"{personality}\", I want to provide you with the best response possible, but I need an API key to utilize advanced AI models."
        ),
        format!(
            "Thank you for reaching out. My personality is set to: \"{personality}\", and I'd love to help you with your request once you provide an API key for models like Gemini 2.0 Flash."
        ),
    ]
}

/// 金鑰探測時使用的代理個性。
const PROBE_PERSONALITY: &str = "Test assistant";

/// 產生代理回覆的服務。
///
/// 不持有任何可變狀態，可以放在 `Arc` 中給多個並行請求共用。
#[derive(Clone)]
pub struct ReplyService {
    resolver: CredentialResolver,
    dispatcher: Dispatcher,
    picker: Arc<dyn ReplyPicker>,
    defaults: GenerationDefaults,
}

impl ReplyService {
    pub fn new(resolver: CredentialResolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
            picker: Arc::new(RandomPicker),
            defaults: GenerationDefaults::default(),
        }
    }

    /// 依服務設定建立 HTTP 客戶端、預設金鑰與端點。
    pub fn from_settings(settings: &ServiceSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("建立 HTTP 客戶端失敗")?;

        let resolver = CredentialResolver::new(settings.resolved_default_key());
        if !resolver.has_default_key() {
            info!("未設定預設 API 金鑰，沒有金鑰的代理將使用罐頭回覆");
        }

        Ok(Self::new(resolver, Dispatcher::new(client, settings.endpoints()))
            .with_defaults(settings.generation_defaults()))
    }

    pub fn with_picker(mut self, picker: impl ReplyPicker + 'static) -> Self {
        self.picker = Arc::new(picker);
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> GenerationDefaults {
        self.defaults
    }

    /// 選出一則罐頭回覆。
    pub fn canned_reply(&self, message: &str, personality: &str) -> String {
        let replies = canned_replies(message, personality);
        let index = self.picker.pick(replies.len()).min(replies.len() - 1);
        replies[index].clone()
    }

    /// 為使用者訊息產生一則回覆。
    ///
    /// 沒有任何可用金鑰時回傳罐頭回覆而不是錯誤；其餘供應商失敗以 `AgentError::Provider` 回傳。
    pub async fn generate_reply(
        &self,
        user_message: &str,
        agent: &AgentConfig,
        history: &[ConversationTurn],
    ) -> Result<GeneratedReply, AgentError> {
        validate(user_message, agent)?;

        let resolution = self.resolver.resolve(CredentialRequest {
            provider: agent.provider,
            api_key: agent.api_key.clone(),
            model: agent.model.clone(),
        });
        let credential = match resolution {
            Resolution::Ready(credential) => credential,
            Resolution::NoCredential => {
                debug!("無可用金鑰，回覆罐頭訊息");
                return Ok(GeneratedReply {
                    text: self.canned_reply(user_message, &agent.personality),
                    used_fallback_credential: true,
                    canned: true,
                });
            }
        };

        let system_prompt =
            compose_system_prompt(&agent.personality, agent.knowledge_base.as_deref());
        let messages = assemble_messages(&system_prompt, history, user_message)?;

        let options = DispatchOptions {
            provider: credential.provider,
            api_key: &credential.api_key,
            model: credential.model.as_deref(),
            max_tokens: agent.max_tokens,
            temperature: agent.temperature,
        };
        let text = self
            .dispatcher
            .dispatch(&messages, options)
            .await
            .inspect_err(|err| warn!("回覆產生失敗: {err}"))?;

        Ok(GeneratedReply {
            text,
            used_fallback_credential: credential.used_fallback,
            canned: false,
        })
    }

    /// 以極短的請求探測金鑰是否可用。
    ///
    /// 不會改用預設金鑰；空白金鑰直接回傳 `false`。
    pub async fn validate_api_key(&self, provider: Provider, api_key: &str) -> bool {
        if api_key.trim().is_empty() {
            return false;
        }
        let system_prompt = compose_system_prompt(PROBE_PERSONALITY, None);
        let messages = match assemble_messages(&system_prompt, &[], "Hello") {
            Ok(messages) => messages,
            Err(_) => return false,
        };
        let options = DispatchOptions {
            provider,
            api_key,
            model: None,
            max_tokens: 10,
            temperature: 0.1,
        };
        match self.dispatcher.dispatch(&messages, options).await {
            Ok(_) => true,
            Err(err) => {
                debug!("{} 金鑰驗證失敗: {err}", provider);
                false
            }
        }
    }
}

fn validate(user_message: &str, agent: &AgentConfig) -> Result<(), ValidationError> {
    if user_message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if agent.personality.trim().is_empty() {
        return Err(ValidationError::EmptyPersonality);
    }
    if agent.max_tokens == 0 {
        return Err(ValidationError::ZeroMaxTokens);
    }
    if !(0.0..=2.0).contains(&agent.temperature) {
        return Err(ValidationError::TemperatureOutOfRange(agent.temperature));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::credentials::FALLBACK_MODEL;
    use crate::agent::error::ProviderErrorKind;
    use crate::agent::providers::ProviderEndpoints;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, default_key: Option<&str>) -> ReplyService {
        let dispatcher = Dispatcher::new(
            Client::new(),
            ProviderEndpoints {
                openai_base_url: server.uri(),
                gemini_base_url: server.uri(),
            },
        );
        ReplyService::new(
            CredentialResolver::new(default_key.map(String::from)),
            dispatcher,
        )
    }

    fn gemini_reply(text: &str) -> serde_json::Value {
        serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn no_credential_returns_canned_reply_without_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, None);
        let agent = AgentConfig::new("friendly");
        let reply = service.generate_reply("Hello", &agent, &[]).await.unwrap();

        assert!(reply.canned);
        assert!(canned_replies("Hello", "friendly").contains(&reply.text));
        assert!(reply.text.contains("friendly"));
    }

    #[test]
    fn fixed_picker_selects_a_specific_canned_reply() {
        let service = ReplyService::new(
            CredentialResolver::default(),
            Dispatcher::new(Client::new(), ProviderEndpoints::default()),
        );
        let replies = canned_replies("What is Rust?", "pirate");
        for index in 0..replies.len() {
            let picked = service
                .clone()
                .with_picker(FixedPicker(index))
                .canned_reply("What is Rust?", "pirate");
            assert_eq!(picked, replies[index]);
        }
        assert!(replies[1].contains("What is Rust?"));
    }

    #[test]
    fn random_picker_stays_in_range() {
        for _ in 0..100 {
            assert!(RandomPicker.pick(5) < 5);
        }
        assert_eq!(RandomPicker.pick(0), 0);
    }

    #[tokio::test]
    async fn validation_runs_before_anything_else() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;
        let service = service(&mock_server, Some("default-key"));

        let agent = AgentConfig::new("friendly").with_api_key("sk-x");
        let err = service.generate_reply("  ", &agent, &[]).await.unwrap_err();
        assert_eq!(err, AgentError::Validation(ValidationError::EmptyMessage));

        let err = service
            .generate_reply("  ", &AgentConfig::new(""), &[])
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::Validation(ValidationError::EmptyMessage));

        let err = service
            .generate_reply("hi", &AgentConfig::new(" "), &[])
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::Validation(ValidationError::EmptyPersonality));

        let mut zero_tokens = agent.clone();
        zero_tokens.max_tokens = 0;
        let err = service.generate_reply("hi", &zero_tokens, &[]).await.unwrap_err();
        assert_eq!(err, AgentError::Validation(ValidationError::ZeroMaxTokens));

        let mut hot = agent.clone();
        hot.temperature = 2.5;
        let err = service.generate_reply("hi", &hot, &[]).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::Validation(ValidationError::TemperatureOutOfRange(2.5))
        );
    }

    #[tokio::test]
    async fn missing_key_uses_default_gemini_credential() {
        let mock_server = MockServer::start().await;
        // gemini-2.0-flash 會被正規化為 gemini-2.0-flash-exp。
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash-exp:generateContent"))
            .and(header("x-goog-api-key", "default-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Ahoy")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, Some("default-key"));
        let agent = AgentConfig::new("pirate")
            .with_provider(Provider::OpenAi)
            .with_model("gpt-4");
        let reply = service.generate_reply("Hello", &agent, &[]).await.unwrap();

        assert_eq!(reply.text, "Ahoy");
        assert!(reply.used_fallback_credential);
        assert!(!reply.canned);
        assert_eq!(FALLBACK_MODEL, "gemini-2.0-flash");
    }

    #[tokio::test]
    async fn provider_failures_propagate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key provided"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, None);
        let agent = AgentConfig::new("friendly").with_api_key("sk-bad");
        let err = service.generate_reply("Hello", &agent, &[]).await.unwrap_err();
        match err {
            AgentError::Provider(err) => {
                assert_eq!(err.kind, ProviderErrorKind::InvalidCredential);
                assert_eq!(err.provider, Provider::OpenAi);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn validate_api_key_reports_probe_outcome() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Hi"}}]
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-bad"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key provided"))
            .mount(&mock_server)
            .await;

        let service = service(&mock_server, Some("default-key"));
        assert!(service.validate_api_key(Provider::OpenAi, "sk-good").await);
        assert!(!service.validate_api_key(Provider::OpenAi, "sk-bad").await);
        assert!(!service.validate_api_key(Provider::OpenAi, "  ").await);
    }
}
