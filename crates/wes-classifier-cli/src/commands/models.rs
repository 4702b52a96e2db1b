//! Models command - manage the classifier artifacts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use wes_classifier_adapters::models::{
    ensure_models_with_progress, list_models as adapter_list_models, models_dir, set_models_dir,
    FetchEvent, FetchOptions,
};

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args, Clone, Debug)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum ModelsCommand {
    /// Download the model and label list
    Fetch {
        /// Base URL; each artifact is fetched from `<URL>/<filename>`
        #[arg(long, value_name = "URL")]
        from: String,

        /// Re-download artifacts that are already installed
        #[arg(long)]
        force: bool,
    },
    /// List installed artifacts
    List,
    /// Print model directory path
    Path,
}

/// Run the models command.
///
/// # Errors
///
/// Returns an error if a download fails or a checksum doesn't match.
pub fn run(args: &ModelsArgs, config: &AppConfig) -> Result<()> {
    if let Some(dir) = args.models_dir.clone().or_else(|| config.models.dir.clone()) {
        set_models_dir(dir);
    }

    match &args.command {
        ModelsCommand::Fetch { from, force } => fetch_models(from, *force, config),
        ModelsCommand::List => {
            list_models();
            Ok(())
        }
        ModelsCommand::Path => {
            println!("{}", models_dir().display());
            Ok(())
        }
    }
}

fn fetch_models(base_url: &str, force: bool, config: &AppConfig) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .map_err(|e| anyhow::anyhow!("Invalid progress template: {e}"))?
            .progress_chars("#>-"),
    );

    let options = FetchOptions {
        base_url: base_url.to_string(),
        checksums: config.models.sha256.clone(),
        force,
    };

    ensure_models_with_progress(&models_dir(), &options, &|event| match event {
        FetchEvent::Started { artifact, total } => {
            pb.reset();
            pb.set_length(total.unwrap_or(0));
            pb.set_message(artifact.name);
        }
        FetchEvent::Progress { downloaded, .. } => pb.set_position(downloaded),
        FetchEvent::Finished { artifact } => {
            pb.println(format!("Downloaded {}", artifact.filename));
        }
        FetchEvent::Skipped { artifact } => {
            pb.println(format!("{} already installed", artifact.filename));
        }
    })?;

    pb.finish_with_message("All models installed");
    Ok(())
}

fn list_models() {
    let dir = models_dir();
    let models = adapter_list_models(&dir);

    println!("Models directory: {}", dir.display());
    println!();

    for (artifact, installed) in &models {
        let status = if *installed { "✓" } else { "✗" };
        println!("  {status} {} ({})", artifact.name, artifact.filename);
    }

    println!();
    let installed_count = models.iter().filter(|(_, installed)| *installed).count();
    println!("{}/{} models installed", installed_count, models.len());
}
