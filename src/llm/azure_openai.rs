//! Azure OpenAI chat completions client

use super::{
    check_status, collapse_blank_lines, http_client, round_seconds, value_or_env, Completion,
    CompletionRequest, SqlGenerator,
};
use crate::config::ProviderConfig;
use crate::error::{Result, SqlbenchError};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

const PROVIDER: &str = "azure_openai";

const API_VERSION_DEFAULT: &str = "2023-05-15";
const API_VERSION_OPENAI_PREVIEW: &str = "2024-12-01-preview";
const API_VERSION_SERVERLESS_PREVIEW: &str = "2024-05-01-preview";

/// Deployments that only accept `max_completion_tokens` and no temperature
const REASONING_MODELS: &[&str] = &["o3-mini", "o4-mini"];

pub struct AzureOpenAiClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    api_version: Option<String>,
}

impl AzureOpenAiClient {
    pub fn new(provider: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let endpoint = value_or_env(&provider.endpoint, "OPENAI_ENDPOINT").ok_or_else(|| {
            SqlbenchError::config(format!("Provider '{}' has no endpoint", provider.id))
        })?;
        let api_key = value_or_env(&provider.api_key, "OPENAI_KEY").ok_or_else(|| {
            SqlbenchError::config(format!("Provider '{}' has no API key", provider.id))
        })?;

        Ok(Self {
            client: http_client(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: provider.api_version.clone(),
        })
    }

    fn url(&self, model: &str) -> String {
        let version = self
            .api_version
            .clone()
            .unwrap_or_else(|| api_version_for(model).to_string());
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, model, version
        )
    }
}

/// API version a deployment expects, by model family
pub fn api_version_for(model: &str) -> &'static str {
    const OPENAI_PREVIEW: &[&str] = &["gpt-4.1", "gpt-4o", "o3-mini", "o4-mini"];
    const SERVERLESS_PREVIEW: &[&str] = &[
        "DeepSeek-V3-0324",
        "Phi-",
        "grok-",
        "Codestral-",
        "Mistral-",
        "Ministral-",
        "Llama-",
    ];

    if OPENAI_PREVIEW.iter().any(|p| model.starts_with(p)) {
        API_VERSION_OPENAI_PREVIEW
    } else if SERVERLESS_PREVIEW.iter().any(|p| model.starts_with(p)) {
        API_VERSION_SERVERLESS_PREVIEW
    } else {
        API_VERSION_DEFAULT
    }
}

/// Clamp the requested token budget to what small-context deployments accept.
/// `Ministral-3B` always gets a fixed 2048 budget.
pub fn max_tokens_for(model: &str, requested: u32) -> u32 {
    if model == "Ministral-3B" {
        return 2048;
    }
    if model.contains("-4k-") {
        requested.min(4096)
    } else if model.contains("-8k-") {
        requested.min(8192)
    } else {
        requested
    }
}

fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODELS.contains(&model)
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

pub(crate) fn chat_body(request: &CompletionRequest<'_>) -> serde_json::Value {
    let messages = json!([
        { "role": "system", "content": request.system_message },
        { "role": "user", "content": request.user_prompt },
    ]);
    let max_tokens = max_tokens_for(request.model, request.max_tokens);

    if is_reasoning_model(request.model) {
        json!({
            "messages": messages,
            "max_completion_tokens": max_tokens,
        })
    } else {
        json!({
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": request.temperature,
        })
    }
}

pub(crate) fn parse_chat_response(
    provider: &str,
    response: reqwest::blocking::Response,
) -> Result<(String, Usage)> {
    let parsed: ChatResponse = response
        .json()
        .map_err(|e| SqlbenchError::llm(provider, format!("Invalid response: {}", e)))?;

    let text = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| SqlbenchError::llm(provider, "Response contained no message"))?;

    Ok((text, parsed.usage.unwrap_or_default()))
}

impl SqlGenerator for AzureOpenAiClient {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let url = self.url(request.model);
        log::debug!("POST {}", url);

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&chat_body(request))
            .send()?;
        let response = check_status(response)?;
        let (text, usage) = parse_chat_response(PROVIDER, response)?;
        let duration = round_seconds(start.elapsed().as_secs_f64());

        Ok(Completion {
            text: collapse_blank_lines(&text),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            duration,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
