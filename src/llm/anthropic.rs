//! Anthropic messages API client

use super::{
    check_status, collapse_blank_lines, http_client, round_seconds, value_or_env, Completion,
    CompletionRequest, SqlGenerator,
};
use crate::config::ProviderConfig;
use crate::error::{Result, SqlbenchError};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

const PROVIDER: &str = "anthropic";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(provider: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = value_or_env(&provider.api_key, "ANTHROPIC_API_KEY").ok_or_else(|| {
            SqlbenchError::config(format!("Provider '{}' has no API key", provider.id))
        })?;

        Ok(Self {
            client: http_client(timeout)?,
            api_key,
        })
    }
}

/// Claude 3.5 models reject budgets above 8192 output tokens
pub fn max_tokens_for(model: &str, requested: u32) -> u32 {
    if model.contains("claude-3-5") {
        requested.min(8192)
    } else {
        requested
    }
}

/// The system message and question travel as a single user turn
fn combined_prompt(request: &CompletionRequest<'_>) -> String {
    format!("{}\n\n{}", request.system_message, request.user_prompt)
}

fn request_body(request: &CompletionRequest<'_>) -> serde_json::Value {
    json!({
        "model": request.model,
        "max_tokens": max_tokens_for(request.model, request.max_tokens),
        "temperature": request.temperature,
        "messages": [
            { "role": "user", "content": combined_prompt(request) }
        ],
    })
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl SqlGenerator for AnthropicClient {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let start = Instant::now();
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body(request))
            .send()?;
        let response = check_status(response)?;

        let parsed: MessagesResponse = response
            .json()
            .map_err(|e| SqlbenchError::llm(PROVIDER, format!("Invalid response: {}", e)))?;
        let duration = round_seconds(start.elapsed().as_secs_f64());

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(SqlbenchError::llm(PROVIDER, "Response contained no text"));
        }

        let usage = parsed.usage;
        Ok(Completion {
            text: collapse_blank_lines(&text),
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
            duration,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
