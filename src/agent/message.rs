use serde::{Deserialize, Serialize};

/// 呼叫端提供的對話歷史中，每一則訊息的發送者。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// 終端使用者。
    User,
    /// 代理（先前產生的回覆）。
    Agent,
}

/// 對話歷史中的單一條目。
///
/// 線上格式沿用網頁端的 `{ "sender": "user" | "agent", "content": "..." }`。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    #[serde(rename = "sender")]
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            content: content.into(),
        }
    }
}

/// 送往供應商前的訊息角色。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<TurnRole> for MessageRole {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => MessageRole::User,
            TurnRole::Agent => MessageRole::Assistant,
        }
    }
}

/// 組合完成、與供應商無關的單一聊天訊息。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// 一次請求唯一的產出物。
///
/// 呼叫端負責把 `text` 附加到對話紀錄並更新代理的聊天次數。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedReply {
    /// 要顯示給使用者的回覆文字。
    pub text: String,
    /// 是否改用了預設的供應商、模型與金鑰。
    #[serde(default)]
    pub used_fallback_credential: bool,
    /// 是否為未呼叫任何供應商的預設罐頭回覆。
    #[serde(default)]
    pub canned: bool,
}

impl GeneratedReply {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            used_fallback_credential: false,
            canned: false,
        }
    }
}
