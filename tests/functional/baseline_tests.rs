//! Functional tests for baseline generation

use crate::common::assertions::{assert_dir_exists, assert_file_exists_and_not_empty};
use crate::common::{CliTestRunner, TestFixture};
use sqlbench::baseline::{load_baseline_datasets, BaselineExecutor, BaselineOptions};
use sqlbench::progress::ProgressReporter;
use sqlbench::questions::QuestionSet;
use sqlbench::compare;
use std::fs;

#[test]
fn test_baseline_writes_one_dataset_per_question() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();
    let database = fixture.seeded_database().unwrap();
    let questions = QuestionSet::load(&inputs.questions).unwrap();

    let mut progress = ProgressReporter::new_minimal();
    let run = BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &BaselineOptions::default(), &mut progress)
        .unwrap();

    assert_eq!(run.records.len(), 4);
    assert_eq!(run.failed(), 0);
    assert_file_exists_and_not_empty(&run.summary_path);

    let names: Vec<String> = fixture
        .workspace
        .list_baseline_datasets()
        .unwrap()
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    assert_eq!(
        names,
        vec!["question_01.tsv", "question_02.tsv", "question_03.tsv", "question_10.tsv"]
    );

    let summary = fs::read_to_string(&run.summary_path).unwrap();
    let mut lines = summary.lines();
    assert_eq!(lines.next(), Some("question_number\tduration_sql\tcolumns\trows"));
    assert!(summary.contains("\n2\t"));

    let french = fs::read_to_string(fixture.workspace.baseline_dir.join("question_03.tsv")).unwrap();
    assert_eq!(french, "id\tname\n1\tAlice\n3\tChloé\n");
}

#[test]
fn test_persisted_baseline_matches_fresh_execution() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();
    let database = fixture.seeded_database().unwrap();
    let questions = QuestionSet::load(&inputs.questions).unwrap();

    let mut progress = ProgressReporter::new_minimal();
    BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &BaselineOptions::default(), &mut progress)
        .unwrap();

    let baselines = load_baseline_datasets(&database, &fixture.workspace).unwrap();
    assert_eq!(baselines.keys().collect::<Vec<_>>(), vec!["1", "2", "3", "10"]);

    for question in &questions.questions {
        let mut baseline = baselines.get(&question.baseline_key()).cloned();
        let mut fresh = database.execute_sql_query(&question.sql_query).table;

        let outcome = compare(baseline.as_mut(), fresh.as_mut(), &question.question_number);
        assert!(
            outcome.is_exact_match(),
            "question {} should match its own baseline: {:?}",
            question.question_number,
            outcome
        );
    }
}

#[test]
fn test_failed_and_empty_queries_leave_no_dataset() {
    let fixture = TestFixture::new().unwrap();
    let database = fixture.seeded_database().unwrap();
    let path = fixture
        .create_file(
            "questions.yaml",
            r#"
questions:
  - question_number: 1
    user_question: Broken
    sql_query: SELECT nope FROM nowhere
  - question_number: 2
    user_question: Nobody from Spain
    sql_query: SELECT id FROM customers WHERE country = 'ES'
"#,
        )
        .unwrap();
    let questions = QuestionSet::load(&path).unwrap();

    let mut progress = ProgressReporter::new_minimal();
    let run = BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &BaselineOptions::default(), &mut progress)
        .unwrap();

    assert_eq!(run.failed(), 1);
    assert!(!run.records[0].executed);
    assert!(run.records[1].executed);
    assert_eq!(run.records[1].rows, 0);
    assert!(run.records.iter().all(|r| r.dataset.is_none()));
    assert!(fixture.workspace.list_baseline_datasets().unwrap().is_empty());
}

#[test]
fn test_drop_existing_removes_stale_datasets() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();
    let database = fixture.seeded_database().unwrap();
    let questions = QuestionSet::load(&inputs.questions).unwrap();
    let stale = fixture.workspace.baseline_dir.join("question_99.tsv");

    fs::write(&stale, "x\n1\n").unwrap();
    let keep = BaselineOptions {
        persist_results: true,
        drop_existing: false,
    };
    let mut progress = ProgressReporter::new_minimal();
    BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &keep, &mut progress)
        .unwrap();
    assert!(stale.exists());

    let drop = BaselineOptions {
        persist_results: true,
        drop_existing: true,
    };
    BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &drop, &mut progress)
        .unwrap();
    assert!(!stale.exists());
    assert_eq!(fixture.workspace.list_baseline_datasets().unwrap().len(), 4);
}

#[test]
fn test_no_persist_only_writes_summary() {
    let fixture = TestFixture::new().unwrap();
    let inputs = fixture.create_inputs().unwrap();
    let database = fixture.seeded_database().unwrap();
    let questions = QuestionSet::load(&inputs.questions).unwrap();

    let options = BaselineOptions {
        persist_results: false,
        drop_existing: true,
    };
    let mut progress = ProgressReporter::new_minimal();
    let run = BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &options, &mut progress)
        .unwrap();

    assert_eq!(run.records.len(), 4);
    assert!(fixture.workspace.list_baseline_datasets().unwrap().is_empty());
    assert_file_exists_and_not_empty(&run.summary_path);
}

#[test]
fn test_baseline_command_with_setup_script() {
    let runner = CliTestRunner::new().unwrap();
    let inputs = runner.fixture().create_inputs().unwrap();

    runner.expect_success(&[
        "baseline",
        "--questions",
        inputs.questions.to_str().unwrap(),
        "--setup-sql",
        inputs.setup_sql.to_str().unwrap(),
        "--format",
        "json",
    ]);

    let workspace = &runner.fixture().workspace;
    assert_dir_exists(&workspace.baseline_dir);
    assert_eq!(workspace.list_baseline_datasets().unwrap().len(), 4);
    assert_file_exists_and_not_empty(&workspace.baseline_summary_path());
}

#[test]
fn test_zero_padded_question_numbers_find_their_baseline() {
    let fixture = TestFixture::new().unwrap();
    let database = fixture.seeded_database().unwrap();
    let path = fixture
        .create_file(
            "questions.yaml",
            r#"
questions:
  - question_number: "07"
    user_question: How many customers are there?
    sql_query: SELECT count(*) AS n FROM customers
  - question_number: "011"
    user_question: Which customers live in France?
    sql_query: SELECT id, name FROM customers WHERE country = 'FR' ORDER BY id
"#,
        )
        .unwrap();
    let questions = QuestionSet::load(&path).unwrap();

    let mut progress = ProgressReporter::new_minimal();
    BaselineExecutor::new(&database, &fixture.workspace)
        .execute(&questions, &BaselineOptions::default(), &mut progress)
        .unwrap();
    assert!(fixture.workspace.baseline_dir.join("question_07.tsv").exists());
    assert!(fixture.workspace.baseline_dir.join("question_11.tsv").exists());

    let baselines = load_baseline_datasets(&database, &fixture.workspace).unwrap();
    for question in &questions.questions {
        let mut baseline = baselines.get(&question.baseline_key()).cloned();
        assert!(baseline.is_some(), "no baseline for question {}", question.question_number);

        let mut fresh = database.execute_sql_query(&question.sql_query).table;
        let outcome = compare(baseline.as_mut(), fresh.as_mut(), &question.question_number);
        assert!(outcome.is_exact_match(), "{:?}", outcome);
    }
}
