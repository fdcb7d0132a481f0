//! Groq API 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://api.groq.com/openai/v1
//! - 默认模型: llama-3.3-70b-versatile

use crate::llm::OpenAiClient;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_LLAMA_70B: &str = "llama-3.3-70b-versatile";

/// 创建 Groq 客户端；model 为空时使用 llama-3.3-70b-versatile
pub fn create_groq_client(api_key: &str, model: Option<&str>) -> OpenAiClient {
    let model = model.filter(|m| !m.is_empty()).unwrap_or(GROQ_LLAMA_70B);
    OpenAiClient::new(Some(GROQ_BASE_URL), model, api_key)
}
