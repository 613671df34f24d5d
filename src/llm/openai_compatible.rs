// ABOUTME: Chat-completions client for OpenAI-compatible HTTP backends
// ABOUTME: Posts to {base}/chat/completions with optional json_schema response format
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::env;
use std::time::Duration;
use tracing::debug;

use super::{ChatRequest, ChatResponse, LlmProvider};
use crate::errors::{AppError, AppResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider for any backend speaking the OpenAI chat-completions protocol
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl OpenAiCompatibleProvider {
    /// Build a provider against the given base URL
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    /// Build a provider from `FAMPLAN_LLM_BASE_URL` / `FAMPLAN_LLM_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns a config error when the base URL is unset.
    pub fn from_env() -> AppResult<Self> {
        let base_url = env::var("FAMPLAN_LLM_BASE_URL")
            .map_err(|_| AppError::config("FAMPLAN_LLM_BASE_URL is not set"))?;
        Self::new(base_url, env::var("FAMPLAN_LLM_API_KEY").ok())
    }

    fn build_body(request: &ChatRequest) -> serde_json::Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if let Some(schema) = &request.response_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "strict": true,
                    "schema": schema,
                },
            });
        }
        body
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, messages = request.messages.len(), "LLM request");

        let mut http = self.client.post(&url).json(&Self::build_body(request));
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|e| AppError::external_service("llm", e.to_string()).with_source(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external_service(
                "llm",
                format!("HTTP {status}: {body}"),
            ));
        }

        let parsed: CompletionsResponse = response
            .json()
            .await
            .map_err(|e| AppError::llm_parse(format!("malformed completions body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(AppError::llm_empty());
        }

        Ok(ChatResponse {
            content,
            model: parsed.model,
        })
    }

    fn name(&self) -> &'static str {
        "openai_compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let provider =
            OpenAiCompatibleProvider::new("https://api.example.com/v1/", None).unwrap();
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_body_includes_schema_when_set() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("plan"), ChatMessage::user("go")],
            temperature: 0.7,
            max_tokens: 2000,
            response_schema: Some(serde_json::json!({"type": "array"})),
        };
        let body = OpenAiCompatibleProvider::build_body(&request);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["type"],
            "array"
        );

        let plain = ChatRequest {
            response_schema: None,
            ..request
        };
        assert!(OpenAiCompatibleProvider::build_body(&plain)
            .get("response_format")
            .is_none());
    }
}
