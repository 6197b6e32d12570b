pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quill_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "quill",
    about = "Quill assistant operator CLI",
    long_about = "Inspect assistant configuration, check runtime readiness, and dry-run structured action payloads.",
    after_help = "Examples:\n  quill doctor --json\n  quill config\n  quill actions --assistant site_helper reply.json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this file instead of quill.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bundled prompt readability, and assistant definitions")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show how an assistant would dispatch a structured model reply")]
    Actions {
        #[arg(long, help = "Assistant id as configured under [assistants.<id>]")]
        assistant: String,
        #[arg(help = "Path to a JSON structured reply with an `actions` list")]
        payload: PathBuf,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            ..LoadOptions::default()
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run_with(&options),
        },
        Command::Doctor { json } => commands::doctor::run_with(&options, json),
        Command::Actions { assistant, payload } => {
            commands::actions::run_with(&options, &assistant, &payload)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Installs the global subscriber. Repeated calls keep the first subscriber.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
