//! Question sets: the benchmark inputs and, once evaluated, their results

use crate::compare::ComparisonOutcome;
use crate::error::{Result, SqlbenchError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// A benchmark question with its reference SQL.
///
/// The result fields are empty in an input file and filled in by the
/// evaluator for each model and iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "number_or_string")]
    pub question_number: String,
    pub user_question: String,
    #[serde(default)]
    pub sql_query: String,
    #[serde(default)]
    pub tables_used: Vec<String>,
    #[serde(flatten)]
    pub result: QuestionResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionResult {
    pub model_name: String,
    pub iteration: String,
    pub llm_sql_query: String,
    pub llm_sql_query_changed: bool,
    pub executed: bool,
    pub rows: usize,
    pub columns: usize,
    pub percent_rows_equality: f64,
    pub percent_columns_equality: f64,
    pub percent_source_rows_equality: f64,
    pub percent_llm_rows_equality: f64,
    pub duration_sql: f64,
    pub duration_llm: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    #[serde(rename = "cost_input_EUR")]
    pub cost_input_eur: f64,
    #[serde(rename = "cost_output_EUR")]
    pub cost_output_eur: f64,
    #[serde(rename = "cost_total_EUR")]
    pub cost_total_eur: f64,
}

impl QuestionResult {
    pub fn apply_outcome(&mut self, outcome: &ComparisonOutcome) {
        self.percent_rows_equality = outcome.row_ratio;
        self.percent_columns_equality = outcome.column_ratio;
        self.percent_source_rows_equality = outcome.baseline_coverage;
        self.percent_llm_rows_equality = outcome.candidate_coverage;
    }
}

/// Canonical form of a question number: `07`, `007` and ` 7` all become `7`
pub fn canonical_number(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(n) => n.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

impl Question {
    /// Key of this question in the map returned by `load_baseline_datasets`
    pub fn baseline_key(&self) -> String {
        canonical_number(&self.question_number)
    }

    /// Zero-padded number used in file names, e.g. `07` for question 7
    pub fn padded_number(&self) -> String {
        match self.question_number.trim().parse::<u32>() {
            Ok(n) => format!("{:02}", n),
            Err(_) => self.question_number.trim().to_string(),
        }
    }

    /// Base name of the baseline dataset for this question
    pub fn dataset_name(&self) -> String {
        format!("question_{}", self.padded_number())
    }
}

/// Accept `question_number: 3` as well as `question_number: "3"`
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        Text(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::Text(s) => s,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlbenchError::file_not_found(path));
        }
        let content = fs::read_to_string(path)?;
        let set: QuestionSet = serde_yaml::from_str(&content).map_err(|e| {
            SqlbenchError::config(format!("Invalid questions file '{}': {}", path.display(), e))
        })?;
        log::debug!("Loaded {} question(s) from {}", set.questions.len(), path.display());
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, number: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_number == number)
    }

    /// Questions whose text contains `keyword`, case-insensitively
    pub fn find(&self, keyword: &str) -> Vec<&Question> {
        let needle = keyword.to_lowercase();
        self.questions
            .iter()
            .filter(|q| q.user_question.to_lowercase().contains(&needle))
            .collect()
    }

    /// Keep only the given question numbers; an empty filter keeps all
    pub fn retain_numbers(&mut self, numbers: &[String]) {
        if numbers.is_empty() {
            return;
        }
        self.questions.retain(|q| numbers.contains(&q.question_number));
    }

    pub fn push(&mut self, question: Question) {
        self.questions.push(question);
    }
}
