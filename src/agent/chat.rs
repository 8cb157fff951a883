//! 網頁端聊天 API 的請求與回應格式。
//!
//! 這一層把 `AgentError` 轉換成對使用者安全的訊息：使用者只會看到真正的回覆、罐頭回覆，
//! 或是套用範本的錯誤說明，原始供應商錯誤只寫進日誌。

use log::{error, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::agent::config::{AgentConfig, Provider};
use crate::agent::error::AgentError;
use crate::agent::message::ConversationTurn;
use crate::agent::service::ReplyService;

/// 發生錯誤時，用來產生替代回覆的個性描述。
const APOLOGY_PERSONALITY: &str =
    "I apologize, but I encountered an error. Please check your API key and try again.";

/// 知識庫欄位可以是純文字，也可以是帶有 `content` 的文件物件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KnowledgeBaseField {
    Text(String),
    Document { content: String },
}

impl KnowledgeBaseField {
    pub fn content(&self) -> &str {
        match self {
            KnowledgeBaseField::Text(text) => text,
            KnowledgeBaseField::Document { content } => content,
        }
    }
}

/// 把 `null` 視為空字串，讓缺值的欄位走一般的驗證流程。
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// 聊天 API 的請求本體。
///
/// 網頁端送出 `aiProvider` / `aiModel`；`provider` / `model` 也接受，兩者同時存在時以
/// `ai` 前綴的欄位為準。
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub personality: String,
    #[serde(default)]
    pub knowledge_base: Option<KnowledgeBaseField>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub ai_provider: Option<Provider>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

impl ChatRequest {
    pub fn selected_provider(&self) -> Provider {
        self.ai_provider.or(self.provider).unwrap_or_default()
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.ai_model.as_deref().or(self.model.as_deref())
    }

    /// 轉換成代理設定，未提供的生成參數使用服務預設值。
    pub fn agent_config(&self, service: &ReplyService) -> AgentConfig {
        let defaults = service.defaults();
        AgentConfig {
            personality: self.personality.clone(),
            knowledge_base: self
                .knowledge_base
                .as_ref()
                .map(|field| field.content().to_string()),
            provider: self.selected_provider(),
            api_key: self.api_key.clone(),
            model: self.selected_model().map(String::from),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
        }
    }
}

/// 聊天 API 的回應本體。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    /// 成功產生的回覆。
    Reply { response: String },
    /// 請求在派送前就被拒絕。
    Rejected { error: String },
    /// 供應商失敗；`error` 為範本訊息，`code` 供診斷使用。
    Failed {
        error: String,
        code: String,
        #[serde(rename = "fallbackResponse")]
        fallback_response: String,
    },
}

/// 狀態碼與回應本體。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub status: u16,
    pub body: ChatResponse,
}

impl ChatOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 請求本體無法解析時的回應。
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self {
            status: 400,
            body: ChatResponse::Rejected {
                error: format!("Invalid request body: {}", reason.into()),
            },
        }
    }
}

/// 處理一次聊天請求。
pub async fn handle_chat(service: &ReplyService, request: ChatRequest) -> ChatOutcome {
    let agent = request.agent_config(service);
    match service
        .generate_reply(&request.message, &agent, &request.conversation_history)
        .await
    {
        Ok(reply) => ChatOutcome {
            status: 200,
            body: ChatResponse::Reply {
                response: reply.text,
            },
        },
        Err(AgentError::Validation(err)) => {
            warn!("聊天請求驗證失敗: {err}");
            ChatOutcome {
                status: 400,
                body: ChatResponse::Rejected {
                    error: err.to_string(),
                },
            }
        }
        Err(AgentError::Provider(err)) => {
            error!("Chat API Error: {err}");
            ChatOutcome {
                status: 500,
                body: ChatResponse::Failed {
                    error: err.user_message(),
                    code: err.kind.code().to_string(),
                    fallback_response: service.canned_reply("Hello", APOLOGY_PERSONALITY),
                },
            }
        }
    }
}

/// 服務狀態資訊，對應網頁端的 `GET /api/chat`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub message: String,
    pub supported_providers: Vec<Provider>,
    pub latest_models: LatestModels,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestModels {
    pub openai: String,
    pub gemini: String,
}

pub fn service_info() -> ServiceInfo {
    ServiceInfo {
        message: String::from("Chat API is working"),
        supported_providers: Provider::all().to_vec(),
        latest_models: LatestModels {
            openai: Provider::OpenAi.latest_model().into(),
            gemini: Provider::Gemini.latest_model().into(),
        },
    }
}
