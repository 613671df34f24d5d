// ABOUTME: LLM provider abstraction shared by the planner's two-round pipeline
// ABOUTME: Chat message shapes, the LlmProvider trait, and JSON response extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # LLM Provider Abstraction
//!
//! The planner talks to any chat-completions backend through [`LlmProvider`].
//! Requests carry an optional JSON schema; providers that support structured
//! output enforce it server-side, and [`extract_json`] cleans up the ones
//! that wrap their JSON in markdown fences or prose anyway.

pub mod openai_compatible;
pub mod prompts;

pub use openai_compatible::OpenAiCompatibleProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat-completions conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A chat-completions request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// JSON schema the response must satisfy, when the backend supports it
    pub response_schema: Option<serde_json::Value>,
}

/// A chat-completions response
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

/// A chat-completions backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute one chat completion
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Extract a JSON value from LLM response text
///
/// Tries, in order: the raw text, a ```json fenced block, a bare ``` fenced
/// block, and the outermost bracketed array or object located by scanning.
///
/// # Errors
///
/// Returns [`crate::errors::ErrorCode::LlmParseFailed`] when no strategy
/// yields valid JSON.
pub fn extract_json(text: &str) -> AppResult<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::llm_empty());
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let body = &trimmed[start + fence.len()..];
            if let Some(end) = body.find("```") {
                if let Ok(value) = serde_json::from_str(body[..end].trim()) {
                    return Ok(value);
                }
            }
        }
    }

    // Last resort: outermost array, then outermost object
    for (open, close) in [('[', ']'), ('{', '}')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(AppError::llm_parse(format!(
        "no JSON found in response ({} chars)",
        trimmed.len()
    )))
}
