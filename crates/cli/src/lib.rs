pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

const DEFAULT_SEED_FILE: &str = "database/employee-data.json";

#[derive(Debug, Parser)]
#[command(
    name = "hrbot",
    about = "HR assistant operator CLI",
    long_about = "Apply migrations, seed the employee vector stores, inspect configuration, and check store readiness.",
    after_help = "Examples:\n  hrbot doctor --json\n  hrbot seed-postgres --file database/employee-data.json\n  hrbot config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending conversation-memory migrations to PostgreSQL")]
    Migrate,
    #[command(about = "Embed employee records and load them into the pgvector table")]
    SeedPostgres {
        #[arg(long, default_value = DEFAULT_SEED_FILE, help = "JSON array of employee records")]
        file: PathBuf,
    },
    #[command(about = "Embed employee records and load them into the MongoDB collection")]
    SeedMongodb {
        #[arg(long, default_value = DEFAULT_SEED_FILE, help = "JSON array of employee records")]
        file: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check PostgreSQL and MongoDB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::SeedPostgres { file } => commands::seed::run_postgres(&file),
        Command::SeedMongodb { file } => commands::seed::run_mongodb(&file),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
