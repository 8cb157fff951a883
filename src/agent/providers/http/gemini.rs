use async_trait::async_trait;
use reqwest::header::HeaderName;
use reqwest::Client;

use crate::agent::config::Provider;
use crate::agent::error::ProviderError;
use crate::agent::message::{ChatMessage, MessageRole};
use crate::agent::providers::{text_or_placeholder, GenerationParams, ProviderAdapter};

use super::models::{
    GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiPayload, GeminiResponse,
};
use super::{build_headers, join_url, send_json};

/// 指定模型不存在時改用的模型。
pub const GEMINI_FALLBACK_MODEL: &str = "gemini-1.5-flash-latest";

/// 友善別名到 API 實際模型識別字的對照表。同一等級有多個版本時，優先使用較新的版本。
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemini-2.0-flash", "gemini-2.0-flash-exp"),
    ("gemini-flash-latest", "gemini-2.0-flash-exp"),
    ("gemini-pro", "gemini-1.5-pro-latest"),
    ("gemini-pro-vision", "gemini-1.5-pro-latest"),
];

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini 對話中的角色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiRole {
    User,
    Model,
}

impl GeminiRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiRole::User => "user",
            GeminiRole::Model => "model",
        }
    }
}

/// 依 Gemini 多輪介面重新整理過的對話。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConversation {
    /// 先前的對話，不含系統訊息與最後一則待回覆的訊息。
    pub history: Vec<(GeminiRole, String)>,
    /// 這一輪實際送出的提示文字。
    pub prompt: String,
    /// 有歷史時，系統提示詞改以 `systemInstruction` 參數送出。
    pub system_instruction: Option<String>,
}

impl GeminiConversation {
    /// 沒有先前對話時走單次生成的捷徑。
    pub fn is_single_turn(&self) -> bool {
        self.history.is_empty()
    }
}

/// 將通用訊息序列轉換成 Gemini 的「歷史 + 目前提示」格式。
///
/// 沒有歷史時，提示為 `"{系統提示}\n\nUser: {訊息}"`；有歷史時只送出最後一則訊息，
/// 系統提示詞改由生成參數攜帶。
pub fn reshape_history(messages: &[ChatMessage]) -> GeminiConversation {
    let system = messages
        .iter()
        .find(|message| message.role == MessageRole::System)
        .map(|message| message.content.clone());
    let conversation: Vec<&ChatMessage> = messages
        .iter()
        .filter(|message| message.role != MessageRole::System)
        .collect();

    let (last, prior) = match conversation.split_last() {
        Some((last, prior)) => (last.content.clone(), prior),
        None => (String::new(), &[][..]),
    };

    let history: Vec<(GeminiRole, String)> = prior
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::User => GeminiRole::User,
                _ => GeminiRole::Model,
            };
            (role, message.content.clone())
        })
        .collect();

    if history.is_empty() {
        let prompt = match system {
            Some(system) => format!("{system}\n\nUser: {last}"),
            None => last,
        };
        GeminiConversation {
            history,
            prompt,
            system_instruction: None,
        }
    } else {
        GeminiConversation {
            history,
            prompt: last,
            system_instruction: system,
        }
    }
}

/// Google Gemini generateContent API 的 adapter。
pub struct GeminiAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiAdapter {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn endpoint(&self, model: &str) -> String {
        join_url(&self.base_url, &format!("models/{model}:generateContent"))
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn normalize_model(&self, model: &str) -> String {
        MODEL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == model)
            .map(|(_, concrete)| (*concrete).to_string())
            .unwrap_or_else(|| model.to_string())
    }

    fn fallback_model(&self) -> Option<&'static str> {
        Some(GEMINI_FALLBACK_MODEL)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let conversation = reshape_history(messages);

        // 單輪與多輪都使用 generateContent；多輪時把先前的對話放在最後一則訊息之前。
        let mut contents: Vec<GeminiContent<'_>> = conversation
            .history
            .iter()
            .map(|(role, text)| GeminiContent {
                role: Some(role.as_str()),
                parts: vec![GeminiPart {
                    text: text.as_str(),
                }],
            })
            .collect();
        contents.push(GeminiContent {
            role: Some(GeminiRole::User.as_str()),
            parts: vec![GeminiPart {
                text: &conversation.prompt,
            }],
        });

        let payload = GeminiPayload {
            contents,
            system_instruction: conversation
                .system_instruction
                .as_deref()
                .map(|text| GeminiContent {
                    role: None,
                    parts: vec![GeminiPart { text }],
                }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: params.max_tokens,
                temperature: params.temperature,
            },
        };

        let headers = build_headers(
            Provider::Gemini,
            HeaderName::from_static(API_KEY_HEADER),
            &self.api_key,
        )?;
        let request = self
            .client
            .post(self.endpoint(&params.model))
            .headers(headers);
        let data: GeminiResponse = send_json(Provider::Gemini, request, &payload).await?;

        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            });
        Ok(text_or_placeholder(text))
    }
}
