//! Command implementations for sqlbench CLI

use crate::baseline::{load_baseline_datasets, BaselineExecutor, BaselineOptions};
use crate::cli::{Commands, DatabaseArgs, OutputFormat};
use crate::compare::try_compare;
use crate::config::ModelCatalog;
use crate::database::DatabaseService;
use crate::error::{Result, SqlbenchError};
use crate::evaluator::{ModelEvaluator, PromptContext, RunSettings};
use crate::llm::scripted::ScriptedFactory;
use crate::llm::{GeneratorFactory, HttpGeneratorFactory, ScriptedGenerator};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::{create_spinner, ProgressReporter};
use crate::questions::QuestionSet;
use crate::report::PerformanceReport;
use crate::schema::DatabaseSchema;
use crate::workspace::ResultsWorkspace;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Execute a command
pub fn execute_command(command: Commands, results_dir: &Path) -> Result<()> {
    match command {
        Commands::Baseline {
            questions,
            db,
            keep_existing,
            no_persist,
            format,
        } => baseline_command(results_dir, &questions, &db, keep_existing, no_persist, &format),
        Commands::Evaluate {
            questions,
            schema,
            models,
            system_message,
            semantic_rules,
            db,
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
            format,
        } => {
            let inputs = EvaluateInputs {
                questions,
                schema,
                models,
                system_message,
                semantic_rules,
                model_names,
                question_numbers,
                dry_run,
                timeout: Duration::from_secs(u64::from(timeout)),
            };
            let settings = RunSettings {
                temperature,
                max_tokens,
                iterations,
                file_prefix: prefix,
                log_results: !no_results,
                log_summary: !no_summary,
            };
            evaluate_command(results_dir, &inputs, &db, &settings, &format)
        }
        Commands::Report {
            prefix,
            source,
            format,
        } => report_command(results_dir, &prefix, source.as_deref(), &format),
        Commands::Compare {
            baseline,
            candidate,
            question,
            format,
        } => compare_command(&baseline, &candidate, &question, &format),
        Commands::Status { format } => status_command(results_dir, &format),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(SqlbenchError::invalid_input)
}

/// Open the database and run the optional setup script
fn open_database(db: &DatabaseArgs) -> Result<DatabaseService> {
    let database = DatabaseService::open_optional(db.database.as_deref())?;
    if let Some(setup) = &db.setup_sql {
        if !setup.exists() {
            return Err(SqlbenchError::file_not_found(setup));
        }
        log::info!("Running setup script {}", setup.display());
        database.execute_batch(&fs::read_to_string(setup)?)?;
    }
    Ok(database)
}

/// Run the reference queries and persist the baseline
fn baseline_command(
    results_dir: &Path,
    questions_path: &Path,
    db: &DatabaseArgs,
    keep_existing: bool,
    no_persist: bool,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;
    let questions = QuestionSet::load(questions_path)?;
    let database = open_database(db)?;
    let workspace = ResultsWorkspace::create(results_dir.to_path_buf())?;

    let options = BaselineOptions {
        persist_results: !no_persist,
        drop_existing: !keep_existing,
    };

    let mut progress = match format {
        OutputFormat::Pretty => ProgressReporter::new_for_baseline(questions.len() as u64),
        OutputFormat::Json => ProgressReporter::new_minimal(),
    };

    let run = BaselineExecutor::new(&database, &workspace).execute(&questions, &options, &mut progress)?;
    drop(progress);

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_baseline_run(&run),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&run)?),
    }
    Ok(())
}

struct EvaluateInputs {
    questions: PathBuf,
    schema: PathBuf,
    models: PathBuf,
    system_message: PathBuf,
    semantic_rules: PathBuf,
    model_names: Vec<String>,
    question_numbers: Vec<String>,
    dry_run: bool,
    timeout: Duration,
}

/// Run the question set through every selected model
fn evaluate_command(
    results_dir: &Path,
    inputs: &EvaluateInputs,
    db: &DatabaseArgs,
    settings: &RunSettings,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;

    let mut catalog = ModelCatalog::load(&inputs.models)?;
    catalog.retain_models(&inputs.model_names)?;

    let mut questions = QuestionSet::load(&inputs.questions)?;
    questions.retain_numbers(&inputs.question_numbers);

    let schema = DatabaseSchema::load(&inputs.schema)?;
    let prompt = PromptContext::load(&inputs.system_message, &inputs.semantic_rules)?;
    let database = open_database(db)?;
    let workspace = ResultsWorkspace::create(results_dir.to_path_buf())?;

    let spinner = match format {
        OutputFormat::Pretty => Some(create_spinner("Loading baseline datasets...")),
        OutputFormat::Json => None,
    };
    let baselines = load_baseline_datasets(&database, &workspace)?;
    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!("Loaded {} baseline dataset(s)", baselines.len()));
    }
    if baselines.is_empty() {
        log::warn!(
            "No baseline datasets in {}; every comparison will score 0",
            workspace.baseline_dir.display()
        );
    }

    let factory: Box<dyn GeneratorFactory> = if inputs.dry_run {
        log::info!("Dry run: answering with the reference SQL of each question");
        let generator = questions
            .questions
            .iter()
            .fold(ScriptedGenerator::new(), |g, q| g.with_response(q.user_question.clone(), q.sql_query.clone()));
        Box::new(ScriptedFactory::new(generator))
    } else {
        Box::new(HttpGeneratorFactory::new(catalog.providers().to_vec(), inputs.timeout))
    };

    let mut progress = match format {
        OutputFormat::Pretty => ProgressReporter::new_for_evaluation(
            catalog.models().len() as u64 * u64::from(settings.iterations),
            questions.len() as u64,
        ),
        OutputFormat::Json => ProgressReporter::new_minimal(),
    };

    let evaluator = ModelEvaluator::new(factory.as_ref(), &database, &schema, &prompt, &workspace);
    let runs = evaluator.evaluate(catalog.models(), &questions, &baselines, settings, &mut progress)?;
    drop(progress);

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_evaluation(&runs),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&runs)?),
    }
    Ok(())
}

/// Build and save the performance report
fn report_command(results_dir: &Path, prefix: &str, source: Option<&str>, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let workspace = ResultsWorkspace::from_root(results_dir.to_path_buf());

    let report = PerformanceReport::from_workspace(&workspace, prefix, source)?;
    let path = report.save(&workspace)?;

    match format {
        OutputFormat::Pretty => {
            print!("{}", report.render());
            println!("\nPerformance report saved to: {}", path.display());
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }
    Ok(())
}

/// Compare two result files
fn compare_command(baseline: &Path, candidate: &Path, question: &str, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let database = DatabaseService::open_in_memory()?;

    let mut baseline = database.load_delimited(baseline)?;
    let mut candidate = database.load_delimited(candidate)?;

    let outcome = try_compare(Some(&mut baseline), Some(&mut candidate), question)
        .map_err(|failure| SqlbenchError::data_processing(failure.to_string()))?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_comparison(&outcome, question),
        OutputFormat::Json => println!("{}", JsonFormatter::format_comparison(&outcome, question)?),
    }
    Ok(())
}

/// Show results directory statistics
fn status_command(results_dir: &Path, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let workspace = ResultsWorkspace::from_root(results_dir.to_path_buf());
    if !workspace.root.exists() {
        return Err(SqlbenchError::file_not_found(&workspace.root));
    }

    let stats = workspace.stats()?;
    match format {
        OutputFormat::Pretty => PrettyPrinter::print_workspace_stats(&stats),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&stats)?),
    }
    Ok(())
}
