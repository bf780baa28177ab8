pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "printchat",
    about = "Printchat operator CLI",
    long_about = "Inspect configuration, check runtime readiness, and query the local product catalog.",
    after_help = "Examples:\n  printchat doctor --json\n  printchat config\n  printchat catalog \"Business card\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, catalog loading, and credential presence")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List catalog products in a category (case-insensitive), as JSON")]
    Catalog {
        #[arg(help = "Category name, e.g. \"Flyer\"")]
        category: String,
        #[arg(long, help = "Catalog file to read instead of the configured catalog.path")]
        path: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Catalog { category, path } => commands::catalog::run(&category, path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
