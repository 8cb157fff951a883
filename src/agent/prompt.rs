//! 系統提示詞與訊息序列的組合。
//!
//! 字串拼接的順序會影響模型行為，測試依賴這裡的輸出保持穩定。

use crate::agent::error::ValidationError;
use crate::agent::message::{ChatMessage, ConversationTurn, MessageRole};

const KNOWLEDGE_LABEL: &str = "Additional knowledge and context:";
const CLOSING_INSTRUCTION: &str = "Please respond according to your personality and use the provided knowledge when relevant. Be helpful, accurate, and stay in character.";

/// 由代理個性與知識庫建立系統提示詞。
///
/// 知識庫在去除空白後為空時，不會出現知識區塊的標籤。
pub fn compose_system_prompt(personality: &str, knowledge_base: Option<&str>) -> String {
    let mut prompt =
        format!("You are an AI assistant with the following personality: {personality}\n\n");

    if let Some(knowledge) = knowledge_base
        && !knowledge.trim().is_empty()
    {
        prompt.push_str(KNOWLEDGE_LABEL);
        prompt.push('\n');
        prompt.push_str(knowledge);
        prompt.push_str("\n\n");
    }

    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}

/// 組合完整的訊息序列：系統訊息、依原順序的歷史、最後是新的使用者訊息。
pub fn assemble_messages(
    system_prompt: &str,
    history: &[ConversationTurn],
    new_user_message: &str,
) -> Result<Vec<ChatMessage>, ValidationError> {
    if new_user_message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(
        history
            .iter()
            .map(|turn| ChatMessage::new(MessageRole::from(turn.role), turn.content.clone())),
    );
    messages.push(ChatMessage::user(new_user_message));
    Ok(messages)
}
