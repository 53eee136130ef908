//! Unit tests for CLI argument parsing

use clap::Parser;
use sqlbench::cli::{Cli, Commands};
use std::path::PathBuf;

#[test]
fn test_baseline_command_parsing() {
    let cli = Cli::try_parse_from([
        "sqlbench",
        "baseline",
        "--questions",
        "questions.yaml",
        "--setup-sql",
        "setup.sql",
        "--keep-existing",
    ])
    .unwrap();

    assert_eq!(cli.results_dir, PathBuf::from("results"));
    match cli.command {
        Commands::Baseline {
            questions,
            db,
            keep_existing,
            no_persist,
            format,
        } => {
            assert_eq!(questions, PathBuf::from("questions.yaml"));
            assert_eq!(db.setup_sql, Some(PathBuf::from("setup.sql")));
            assert!(db.database.is_none());
            assert!(keep_existing);
            assert!(!no_persist);
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Baseline command"),
    }
}

#[test]
fn test_evaluate_command_defaults() {
    let cli = Cli::try_parse_from([
        "sqlbench",
        "evaluate",
        "--questions",
        "q.yaml",
        "--schema",
        "schema.yaml",
        "--models",
        "models.yaml",
        "--system-message",
        "system.txt",
        "--semantic-rules",
        "rules.md",
    ])
    .unwrap();

    match cli.command {
        Commands::Evaluate {
            temperature,
            max_tokens,
            iterations,
            timeout,
            prefix,
            model_names,
            question_numbers,
            dry_run,
            no_results,
            no_summary,
            ..
        } => {
            assert_eq!(temperature, 0.9);
            assert_eq!(max_tokens, 10000);
            assert_eq!(iterations, 1);
            assert_eq!(timeout, 60);
            assert_eq!(prefix, "results_llm");
            assert!(model_names.is_empty());
            assert!(question_numbers.is_empty());
            assert!(!dry_run);
            assert!(!no_results);
            assert!(!no_summary);
        }
        _ => panic!("Expected Evaluate command"),
    }
}

#[test]
fn test_evaluate_command_filters_are_repeatable() {
    let cli = Cli::try_parse_from([
        "sqlbench",
        "evaluate",
        "--questions",
        "q.yaml",
        "--schema",
        "schema.yaml",
        "--models",
        "models.yaml",
        "--system-message",
        "system.txt",
        "--semantic-rules",
        "rules.md",
        "--model",
        "gpt-4o",
        "--model",
        "claude-3-5-sonnet",
        "--question",
        "7",
        "--iterations",
        "3",
        "--temperature",
        "0.2",
        "--dry-run",
    ])
    .unwrap();

    match cli.command {
        Commands::Evaluate {
            model_names,
            question_numbers,
            iterations,
            temperature,
            dry_run,
            ..
        } => {
            assert_eq!(model_names, vec!["gpt-4o", "claude-3-5-sonnet"]);
            assert_eq!(question_numbers, vec!["7"]);
            assert_eq!(iterations, 3);
            assert_eq!(temperature, 0.2);
            assert!(dry_run);
        }
        _ => panic!("Expected Evaluate command"),
    }
}

#[test]
fn test_evaluate_rejects_invalid_numbers() {
    let base = [
        "sqlbench",
        "evaluate",
        "--questions",
        "q.yaml",
        "--schema",
        "schema.yaml",
        "--models",
        "models.yaml",
        "--system-message",
        "system.txt",
        "--semantic-rules",
        "rules.md",
    ];

    let mut zero_iterations = base.to_vec();
    zero_iterations.extend(["--iterations", "0"]);
    assert!(Cli::try_parse_from(zero_iterations).is_err());

    let mut hot = base.to_vec();
    hot.extend(["--temperature", "3.5"]);
    assert!(Cli::try_parse_from(hot).is_err());

    let mut missing = base.to_vec();
    missing.truncate(4);
    assert!(Cli::try_parse_from(missing).is_err());
}

#[test]
fn test_report_command_parsing() {
    let cli = Cli::try_parse_from(["sqlbench", "--results-dir", "out", "report", "--source", "sales"]).unwrap();

    assert_eq!(cli.results_dir, PathBuf::from("out"));
    match cli.command {
        Commands::Report { prefix, source, format } => {
            assert_eq!(prefix, "questions_summary_results_llm");
            assert_eq!(source.as_deref(), Some("sales"));
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Report command"),
    }
}

#[test]
fn test_compare_command_parsing() {
    let cli = Cli::try_parse_from([
        "sqlbench", "compare", "expected.tsv", "actual.tsv", "--question", "12", "--format", "json",
    ])
    .unwrap();

    match cli.command {
        Commands::Compare {
            baseline,
            candidate,
            question,
            format,
        } => {
            assert_eq!(baseline, PathBuf::from("expected.tsv"));
            assert_eq!(candidate, PathBuf::from("actual.tsv"));
            assert_eq!(question, "12");
            assert_eq!(format, "json");
        }
        _ => panic!("Expected Compare command"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["sqlbench", "status", "--verbose", "--results-dir", "elsewhere"]).unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.results_dir, PathBuf::from("elsewhere"));
    assert!(matches!(cli.command, Commands::Status { .. }));
}

#[test]
fn test_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["sqlbench", "frobnicate"]).is_err());
}
