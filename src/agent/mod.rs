//! 代理回覆產生的核心。
//!
//! 此模組負責描述由使用者訊息到供應商回覆的完整流程，包括提示詞組合、
//! 金鑰解析、供應商派送，以及對網頁端的請求/回應格式。

// --- 子模組宣告 ---

/// `chat` 模組：網頁端聊天 API 的請求/回應格式，以及錯誤到範本訊息的轉換。
pub mod chat;

/// `config` 模組：代理設定 `AgentConfig` 與支援的供應商 `Provider`。
pub mod config;

/// `credentials` 模組：決定使用呼叫端金鑰、預設金鑰，或改回覆罐頭訊息。
pub mod credentials;

/// `error` 模組：驗證錯誤與已分類的供應商錯誤。
pub mod error;

/// `message` 模組：對話歷史、聊天訊息與最終回覆的資料結構。
pub mod message;

/// `prompt` 模組：系統提示詞與訊息序列的組合。
pub mod prompt;

/// `providers` 模組：各供應商的 adapter 與派送邏輯。
pub mod providers;

/// `service` 模組：呼叫端實際使用的 `ReplyService`。
pub mod service;

// --- 公共 API 重新導出 ---

pub use chat::{handle_chat, service_info, ChatOutcome, ChatRequest, ChatResponse};
pub use config::{AgentConfig, Provider};
pub use credentials::{CredentialResolver, Resolution};
pub use error::{AgentError, ProviderError, ProviderErrorKind, ValidationError};
pub use message::{ChatMessage, ConversationTurn, GeneratedReply, MessageRole, TurnRole};
pub use service::{FixedPicker, RandomPicker, ReplyPicker, ReplyService};
