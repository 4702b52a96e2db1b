//! Wes Classifier CLI - find Wes Anderson style stills among your images.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::classify::ClassifyArgs;
use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Some(command) = &cli.command {
        if cli.classify != ClassifyArgs::default() {
            eprintln!(
                "error: options given before '{0}' are not used; pass them after '{0}'",
                command.name()
            );
            return ExitCode::Error.into();
        }
    }

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Some(Commands::Classify(args)) => classify(args.with_config(&config)),
        Some(Commands::Evaluate(args)) => {
            match commands::evaluate::run(&args.with_config(&config)) {
                Ok(_) => ExitCode::Success,
                Err(e) => report_error(&e),
            }
        }
        Some(Commands::Models(ref args)) => match commands::models::run(args, &config) {
            Ok(()) => ExitCode::Success,
            Err(e) => report_error(&e),
        },
        None => {
            // Default behavior: run classify with flattened args
            if cli.classify.paths.is_empty() {
                eprintln!("error: No paths specified. Use --help for usage information.");
                return ExitCode::Error.into();
            }
            classify(cli.classify.with_config(&config))
        }
    };

    exit_code.into()
}

fn classify(args: ClassifyArgs) -> ExitCode {
    match commands::classify::run(&args) {
        Ok(result) => result.exit_code(),
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &anyhow::Error) -> ExitCode {
    eprintln!("error: {e:#}");
    ExitCode::Error
}
