//! This module contains the request and response structures for the HTTP-based AI providers.
//！此模組包含各個基於 HTTP 的 AI 供應商的請求和回應結構。

// --- OpenAI ---
#[derive(serde::Serialize)]
pub struct OpenAiMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(serde::Serialize)]
pub struct OpenAiChatPayload<'a> {
    pub model: &'a str,
    pub messages: Vec<OpenAiMessage<'a>>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(serde::Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub choices: Vec<OpenAiChatChoice>,
}

#[derive(serde::Deserialize)]
pub struct OpenAiChatChoice {
    #[serde(default)]
    pub message: Option<OpenAiChatMessage>,
}

#[derive(serde::Deserialize)]
pub struct OpenAiChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

// --- Gemini ---
#[derive(serde::Serialize)]
pub struct GeminiPart<'a> {
    pub text: &'a str,
}

#[derive(serde::Serialize)]
pub struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'a str>,
    pub parts: Vec<GeminiPart<'a>>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPayload<'a> {
    pub contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent<'a>>,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(serde::Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(serde::Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiCandidateContent>,
}

#[derive(serde::Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiPartOwned>,
}

#[derive(serde::Deserialize)]
pub struct GeminiPartOwned {
    #[serde(default)]
    pub text: Option<String>,
}
