//! Main entry point for sqlbench CLI

use clap::Parser;
use sqlbench::cli::Cli;
use sqlbench::commands::execute_command;
use sqlbench::duckdb_config;
use sqlbench::sql::load_env_file;

fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set up verbose logging if requested
    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    // Provider secrets usually come from .env
    if let Err(e) = load_env_file() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize and validate DuckDB configuration
    if let Err(e) = duckdb_config::init_duckdb() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Execute the command
    if let Err(e) = execute_command(cli.command, &cli.results_dir) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
