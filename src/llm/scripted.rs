//! Offline generator that answers from a fixed script.
//!
//! Used by `evaluate --dry-run` (answers with each question's reference
//! SQL) and by tests.

use super::{Completion, CompletionRequest, GeneratorFactory, SqlGenerator};
use crate::config::ModelSpec;
use crate::error::{Result, SqlbenchError};
use std::collections::HashMap;

const PROVIDER: &str = "scripted";

#[derive(Debug, Clone, Default)]
pub struct ScriptedGenerator {
    responses: HashMap<String, String>,
    fallback: Option<String>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `prompt` with `response`
    pub fn with_response(mut self, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(prompt.into(), response.into());
        self
    }

    /// Answer any unscripted prompt with `response`
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }
}

impl SqlGenerator for ScriptedGenerator {
    fn generate(&self, request: &CompletionRequest<'_>) -> Result<Completion> {
        let text = self
            .responses
            .get(request.user_prompt)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                SqlbenchError::llm(PROVIDER, format!("No scripted answer for '{}'", request.user_prompt))
            })?;

        let prompt_tokens = word_count(request.system_message) + word_count(request.user_prompt);
        let completion_tokens = word_count(&text);

        Ok(Completion {
            text,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            duration: 0.0,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn word_count(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Hands every model the same script
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    generator: ScriptedGenerator,
}

impl ScriptedFactory {
    pub fn new(generator: ScriptedGenerator) -> Self {
        Self { generator }
    }
}

impl GeneratorFactory for ScriptedFactory {
    fn generator_for(&self, _model: &ModelSpec) -> Result<Box<dyn SqlGenerator>> {
        Ok(Box::new(self.generator.clone()))
    }
}
