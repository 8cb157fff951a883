//! AI 代理的回覆產生服務。
//!
//! 接收使用者訊息與代理設定，組合提示詞後派送給 OpenAI 或 Gemini，並回傳單一的文字回覆。

pub mod agent;
pub mod config;
