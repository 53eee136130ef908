//! Unit tests for the benchmark input files

use crate::common::{sample_data, TestFixture};
use sqlbench::config::ModelCatalog;
use sqlbench::evaluator::PromptContext;
use sqlbench::questions::QuestionSet;
use sqlbench::schema::DatabaseSchema;
use sqlbench::sql::render_system_message;
use sqlbench::SqlbenchError;

#[test]
fn test_model_catalog_skips_disabled_models() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();

    let catalog = ModelCatalog::load(&inputs.models).unwrap();
    let names: Vec<&str> = catalog.models().iter().map(|m| m.name.as_str()).collect();

    assert_eq!(names, vec!["model-a", "model-b"]);
    assert!(catalog.model("model-retired").is_none());
    assert_eq!(catalog.provider("local").unwrap().api_key, "test-key");
}

#[test]
fn test_model_cost_uses_per_thousand_rates() {
    let catalog = ModelCatalog::from_yaml_str(sample_data::MODELS_YAML).unwrap();
    let model = catalog.model("model-a").unwrap();

    let (input, output, total) = model.cost(2000, 500);
    assert_eq!(input, 1.0);
    assert_eq!(output, 0.5);
    assert_eq!(total, 1.5);
}

#[test]
fn test_retain_models_rejects_unknown_names() {
    let mut catalog = ModelCatalog::from_yaml_str(sample_data::MODELS_YAML).unwrap();

    let err = catalog.retain_models(&["model-retired".to_string()]).unwrap_err();
    assert!(matches!(err, SqlbenchError::Config { .. }));

    catalog.retain_models(&["model-b".to_string()]).unwrap();
    assert_eq!(catalog.models().len(), 1);
    assert_eq!(catalog.models()[0].name, "model-b");
}

#[test]
fn test_catalog_without_enabled_models_is_an_error() {
    let yaml = r#"
models_configs:
  - id: local
    enabled: false
    endpoint: http://localhost
    api_key: key
    models:
      - name: model-a
"#;

    assert!(ModelCatalog::from_yaml_str(yaml).is_err());
}

#[test]
fn test_question_set_loads_numbers_as_strings() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();

    let questions = QuestionSet::load(&inputs.questions).unwrap();
    assert_eq!(questions.len(), 4);

    let last = questions.get("10").unwrap();
    assert_eq!(last.padded_number(), "10");
    assert_eq!(last.dataset_name(), "question_10");
    assert_eq!(questions.get("1").unwrap().dataset_name(), "question_01");
    assert_eq!(questions.find("FRANCE").len(), 1);
}

#[test]
fn test_question_results_survive_a_save() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();

    let mut questions = QuestionSet::load(&inputs.questions).unwrap();
    questions.retain_numbers(&["2".to_string()]);
    questions.questions[0].result.model_name = "model-a".to_string();
    questions.questions[0].result.cost_total_eur = 0.0125;

    let saved = fixture.root().join("saved.yaml");
    questions.save(&saved).unwrap();

    let content = std::fs::read_to_string(&saved).unwrap();
    assert!(content.contains("cost_total_EUR: 0.0125"));

    let reloaded = QuestionSet::load(&saved).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.questions[0].result.model_name, "model-a");
    assert_eq!(reloaded.questions[0].tables_used, vec!["customers", "orders"]);
}

#[test]
fn test_system_message_gets_table_context_and_rules() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();

    let schema = DatabaseSchema::load(&inputs.schema).unwrap();
    let prompt = PromptContext::load(&inputs.system_message, &inputs.semantic_rules).unwrap();

    let context = schema.tables_context(&["orders".to_string(), "missing".to_string()]);
    let rendered = render_system_message(&prompt.system_message, &context, &prompt.semantic_rules);

    assert!(rendered.contains("CREATE TABLE orders"));
    assert!(!rendered.contains("CREATE TABLE customers"));
    assert!(rendered.contains("Amounts are in euros"));
    assert!(!rendered.contains("{{"));
}

#[test]
fn test_missing_prompt_file_is_reported() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();

    let err = PromptContext::load(&fixture.root().join("nope.txt"), &inputs.semantic_rules).unwrap_err();
    assert!(matches!(err, SqlbenchError::FileNotFound { .. }));
}
