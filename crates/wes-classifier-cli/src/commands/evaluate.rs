//! Evaluate command - measure accuracy on a labeled directory tree.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;
use wes_classifier_adapters::LabeledImageSource;
use wes_classifier_core::{
    AcceptancePolicy, Evaluation, EvaluationSummary, ProgressEvent, ProgressSink,
};

use super::engine::EngineArgs;
use crate::config::AppConfig;
use crate::output::{report, JsonOutput, ProgressBar};

/// Output format for the evaluation report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable tables
    #[default]
    Text,
    /// Single JSON object
    Json,
}

/// Arguments for the evaluate command.
#[derive(Args, Clone, Debug)]
pub struct EvaluateArgs {
    /// Directory with one subdirectory per label
    pub dir: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value_t)]
    pub format: ReportFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl EvaluateArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }
        self.engine = self.engine.with_config(config);
        self
    }
}

/// Run the evaluate command.
///
/// # Errors
///
/// Returns an error if the model cannot be loaded, a class directory is
/// missing or the report cannot be written.
pub fn run(args: &EvaluateArgs) -> Result<EvaluationSummary> {
    info!("Evaluating on {}", args.dir.display());

    let session = args.engine.session(AcceptancePolicy::default())?;
    let source = LabeledImageSource::new(&args.dir, session.labels())?;
    info!("Found {} labeled images", source.len());

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(Some(source.len() as u64), args.quiet, show_progress);

    let mut evaluation = Evaluation::new(session.labels().clone());

    let images = source.labeled_images().map(|(_, item)| item);
    for report in session.reports(images, &progress) {
        let actual = source
            .label_of(report.id)
            .context("Report for an image the source never yielded")?;
        evaluation.record_report(actual, &report);
    }

    let summary = evaluation.summary();
    progress.on_event(ProgressEvent::Finished {
        classified: summary.total,
        failed: summary.failed,
        matched: evaluation.correct(),
    });

    match args.format {
        ReportFormat::Text => print!("{}", report::render(&summary)),
        ReportFormat::Json => JsonOutput::stdout().write_value(&summary, args.pretty)?,
    }

    Ok(summary)
}
