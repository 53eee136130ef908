//! Model and provider catalogue

use crate::error::{Result, SqlbenchError};
use crate::llm::Platform;
use crate::sql::substitute_env_vars;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level layout of the models YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsFile {
    #[serde(default)]
    pub models_configs: Vec<ProviderConfig>,
}

/// One provider endpoint and the models deployed behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(rename = "cost_input_tokens_EUR_1K", default)]
    pub cost_input_eur_1k: f64,
    #[serde(rename = "cost_output_tokens_EUR_1K", default)]
    pub cost_output_eur_1k: f64,
}

fn default_enabled() -> bool {
    true
}

/// An enabled model, flattened with the id of its provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSpec {
    pub provider_id: String,
    pub name: String,
    pub cost_input_eur_1k: f64,
    pub cost_output_eur_1k: f64,
}

impl ModelSpec {
    /// Input, output and total cost in EUR, each rounded to 6 decimals
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> (f64, f64, f64) {
        let input = round6(prompt_tokens as f64 * self.cost_input_eur_1k / 1000.0);
        let output = round6(completion_tokens as f64 * self.cost_output_eur_1k / 1000.0);
        (input, output, round6(input + output))
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Validated catalogue of enabled providers and models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    providers: Vec<ProviderConfig>,
    models: Vec<ModelSpec>,
}

impl ModelCatalog {
    /// Load the catalogue from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlbenchError::file_not_found(path));
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            SqlbenchError::Yaml(inner) => SqlbenchError::config(format!(
                "Invalid models file '{}': {}",
                path.display(),
                inner
            )),
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ModelsFile = serde_yaml::from_str(content)?;
        Self::from_file(file)
    }

    /// Keep enabled entries, substitute `{VAR}` secrets and validate
    pub fn from_file(file: ModelsFile) -> Result<Self> {
        let mut providers = Vec::new();
        let mut models = Vec::new();

        for mut provider in file.models_configs {
            if provider.id.trim().is_empty() {
                return Err(SqlbenchError::config("Provider is missing an 'id'"));
            }
            if !provider.enabled {
                log::info!("Skipping disabled provider {}", provider.id);
                continue;
            }

            provider.endpoint = substitute_env_vars(&provider.endpoint)?;
            provider.api_key = substitute_env_vars(&provider.api_key)?;
            provider.models.retain(|m| m.enabled);

            for model in &provider.models {
                if model.name.trim().is_empty() {
                    return Err(SqlbenchError::config(format!(
                        "Provider '{}' has a model without a name",
                        provider.id
                    )));
                }
                models.push(ModelSpec {
                    provider_id: provider.id.clone(),
                    name: model.name.clone(),
                    cost_input_eur_1k: model.cost_input_eur_1k,
                    cost_output_eur_1k: model.cost_output_eur_1k,
                });
            }

            providers.push(provider);
        }

        if models.is_empty() {
            return Err(SqlbenchError::config("No enabled models configured"));
        }

        log::debug!("Loaded {} model(s) from {} provider(s)", models.len(), providers.len());
        Ok(Self { providers, models })
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn model(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Restrict the catalogue to the named models
    pub fn retain_models(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        for name in names {
            if self.model(name).is_none() {
                return Err(SqlbenchError::config(format!("Unknown or disabled model '{}'", name)));
            }
        }
        self.models.retain(|m| names.contains(&m.name));
        Ok(())
    }
}
