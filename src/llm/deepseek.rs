//! DeepSeek on Azure AI inference.
//!
//! Kept for older result sets; token usage is not reported by this route.

use super::azure_openai::{chat_body, parse_chat_response};
use super::{
    check_status, collapse_blank_lines, http_client, round_seconds, value_or_env, Completion,
    CompletionRequest, SqlGenerator,
};
use crate::config::ProviderConfig;
use crate::error::{Result, SqlbenchError};
use std::time::{Duration, Instant};

const PROVIDER: &str = "deepseek";
const API_VERSION: &str = "2024-05-01-preview";

pub struct DeepSeekClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl DeepSeekClient {
    pub fn new(provider: &ProviderConfig, timeout: Duration) -> Result<Self> {
        log::warn!("The DeepSeek route is deprecated; token usage will be reported as 0");

        let endpoint = value_or_env(&provider.endpoint, "DEEPSEEK_ENDPOINT").ok_or_else(|| {
            SqlbenchError::config(format!("Provider '{}' has no endpoint", provider.id))
        })?;
        let api_key = value_or_env(&provider.api_key, "DEEPSEEK_KEY").ok_or_else(|| {
            SqlbenchError::config(format!("Provider '{}' has no API key", provider.id))
        })?;

        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

impl SqlGenerator for DeepSeekClient {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let url = format!("{}/chat/completions?api-version={}", self.endpoint, API_VERSION);

        let mut body = chat_body(request);
        body["model"] = serde_json::Value::String(request.model.to_string());

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        let response = check_status(response)?;
        let (text, _usage) = parse_chat_response(PROVIDER, response)?;

        Ok(Completion {
            text: collapse_blank_lines(&text),
            duration: round_seconds(start.elapsed().as_secs_f64()),
            ..Completion::default()
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
