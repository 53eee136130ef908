//! LLM providers that turn a natural-language question into SQL

use crate::config::{ModelSpec, ProviderConfig};
use crate::error::{Result, SqlbenchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod anthropic;
pub mod azure_openai;
pub mod deepseek;
pub mod scripted;

pub use anthropic::AnthropicClient;
pub use azure_openai::AzureOpenAiClient;
pub use deepseek::DeepSeekClient;
pub use scripted::ScriptedGenerator;

/// Default HTTP timeout for a single completion
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// One prompt sent to a model
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub system_message: &'a str,
    pub user_prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Model output with usage and latency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Seconds, rounded to 2 decimals
    pub duration: f64,
}

/// Something that can answer a prompt with SQL text
pub trait SqlGenerator: Send + Sync {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion>;

    fn provider_name(&self) -> &'static str;
}

/// Creates a generator for each model under evaluation
pub trait GeneratorFactory {
    fn generator_for(&self, model: &ModelSpec) -> Result<Box<dyn SqlGenerator>>;
}

/// Wire protocol used to reach a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    AzureOpenai,
    Anthropic,
    Deepseek,
}

impl Platform {
    /// Claude models always go to Anthropic; otherwise the provider's
    /// configured platform applies, defaulting to Azure OpenAI.
    pub fn resolve(model_name: &str, configured: Option<Platform>) -> Platform {
        if model_name.starts_with("claude") {
            return Platform::Anthropic;
        }
        configured.unwrap_or(Platform::AzureOpenai)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::AzureOpenai => "azure_openai",
            Platform::Anthropic => "anthropic",
            Platform::Deepseek => "deepseek",
        }
    }
}

/// Builds HTTP clients from the provider catalogue
pub struct HttpGeneratorFactory {
    providers: Vec<ProviderConfig>,
    timeout: Duration,
}

impl HttpGeneratorFactory {
    pub fn new(providers: Vec<ProviderConfig>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }
}

impl GeneratorFactory for HttpGeneratorFactory {
    fn generator_for(&self, model: &ModelSpec) -> Result<Box<dyn SqlGenerator>> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.id == model.provider_id)
            .ok_or_else(|| SqlbenchError::config(format!(
                "Model {} references unknown provider '{}'",
                model.name, model.provider_id
            )))?;

        let platform = Platform::resolve(&model.name, provider.platform);
        log::debug!("Using {} for model {}", platform.name(), model.name);

        let generator: Box<dyn SqlGenerator> = match platform {
            Platform::AzureOpenai => Box::new(AzureOpenAiClient::new(provider, self.timeout)?),
            Platform::Anthropic => Box::new(AnthropicClient::new(provider, self.timeout)?),
            Platform::Deepseek => Box::new(DeepSeekClient::new(provider, self.timeout)?),
        };
        Ok(generator)
    }
}

/// Build a blocking HTTP client with the given timeout
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder().timeout(timeout).build()?)
}

/// Turn a non-success HTTP response into an API error
pub(crate) fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    Err(SqlbenchError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Collapse blank lines the chat models like to emit between SQL clauses
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    text.replace("\n\n", "\n").replace("\n\n", "\n")
}

pub(crate) fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Use the configured value, or fall back to an environment variable
pub(crate) fn value_or_env(value: &str, var: &str) -> Option<String> {
    if !value.trim().is_empty() {
        return Some(value.to_string());
    }
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
