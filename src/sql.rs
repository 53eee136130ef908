//! SQL text handling: cleaning LLM output, prompt templating and
//! environment variable substitution

use crate::error::Result;
use regex::Regex;
use std::env;
use std::path::Path;
use std::sync::OnceLock;

/// Placeholder replaced with the DDL of the tables a question uses
pub const TABLES_CONTEXT_PLACEHOLDER: &str = "{{database_tables_context}}";

/// Placeholder replaced with the semantic rules document
pub const SEMANTIC_RULES_PLACEHOLDER: &str = "{{semantic_rules}}";

fn fence_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?is)```(?:sql|code)?\s*(.*?)\s*```",
            r"(?is)``(?:sql|code)?\s*(.*?)\s*``",
            r"(?is)`(?:sql|code)?\s*(.*?)\s*``",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid code fence pattern"))
        .collect()
    })
}

/// Strip markdown code fences that models wrap around generated SQL.
///
/// Returns the query and whether anything was removed. Text without a
/// recognised fence, or with an empty fence, is returned unchanged.
pub fn extract_sql(response: &str) -> (String, bool) {
    for pattern in fence_patterns() {
        if let Some(captures) = pattern.captures(response) {
            let extracted = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !extracted.is_empty() {
                return (extracted.to_string(), true);
            }
        }
    }

    (response.to_string(), false)
}

/// Fill the system message template with table context and semantic rules
pub fn render_system_message(template: &str, tables_context: &str, semantic_rules: &str) -> String {
    template
        .replace(TABLES_CONTEXT_PLACEHOLDER, tables_context)
        .replace(SEMANTIC_RULES_PLACEHOLDER, semantic_rules)
}

/// Substitute environment variables in a configuration value.
/// Placeholders look like `{VAR_NAME}`.
pub fn substitute_env_vars(value: &str) -> Result<String> {
    let mut result = value.to_string();

    let mut start = 0;
    while let Some(open_pos) = result[start..].find('{') {
        let open_pos = start + open_pos;
        if let Some(close_pos) = result[open_pos..].find('}') {
            let close_pos = open_pos + close_pos;
            let var_name = &result[open_pos + 1..close_pos];

            let var_value = env::var(var_name)
                .map_err(|_| crate::error::SqlbenchError::config(
                    format!("Environment variable '{}' not found. Make sure it's set in your .env file or environment.", var_name)
                ))?;

            result.replace_range(open_pos..=close_pos, &var_value);
            start = open_pos + var_value.len();
        } else {
            start = open_pos + 1;
        }
    }

    Ok(result)
}

/// Load environment variables from .env file if it exists
pub fn load_env_file() -> Result<()> {
    if Path::new(".env").exists() {
        dotenv::dotenv().map_err(|e| crate::error::SqlbenchError::config(
            format!("Failed to load .env file: {}", e)
        ))?;
    }

    Ok(())
}
