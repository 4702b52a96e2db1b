//! Classify command - find images the model is confident are Wes Anderson stills.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tracing::{info, warn};
use wes_classifier_adapters::FsImageSource;
use wes_classifier_core::{
    AcceptancePolicy, ImageReport, ImageSource, ProgressEvent, ProgressSink, ResultOutput,
    DEFAULT_MIN_CONFIDENCE, WES_ANDERSON,
};

use super::engine::EngineArgs;
use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar, TextOutput};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
    /// Tab-separated `path label confidence%`
    Text,
}

impl OutputFormat {
    fn from_config(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "jsonl" => Some(Self::Jsonl),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Parse and validate a confidence threshold in percent.
fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0..=100"))
    }
}

/// Shared arguments for classification.
#[derive(Args, Clone, Debug, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ClassifyArgs {
    /// Files or directories to classify
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Label an image must be classified as to match
    #[arg(long, value_name = "LABEL")]
    pub label: Option<String>,

    /// Minimum confidence in percent (0-100) for a match [default: 95]
    #[arg(long, value_parser = parse_confidence)]
    pub min_confidence: Option<f32>,

    /// Write every image, not only matches
    #[arg(short, long)]
    pub all: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl ClassifyArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.recursive {
            self.recursive = config.general.recursive.unwrap_or(false);
        }

        if self.label.is_none() {
            self.label.clone_from(&config.policy.label);
        }
        self.min_confidence = self.min_confidence.or(config
            .policy
            .min_confidence
            .filter(|c| (0.0..=100.0).contains(c)));

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_deref()
                .and_then(OutputFormat::from_config);
        }

        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }
        if !self.all {
            self.all = config.output.all.unwrap_or(false);
        }

        self.engine = self.engine.with_config(config);
        self
    }

    /// Acceptance policy with fallback to the defaults.
    #[must_use]
    pub fn policy(&self) -> AcceptancePolicy {
        AcceptancePolicy::new(
            self.label.as_deref().unwrap_or(WES_ANDERSON),
            self.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
        )
    }

    /// Output format with fallback to JSONL.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Counts from one classify run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyResult {
    /// Images that went through the pipeline.
    pub classified: usize,
    /// Images that failed to read, decode or classify.
    pub failed: usize,
    /// Images accepted by the policy.
    pub matched: usize,
}

impl ClassifyResult {
    /// Success when anything matched, like `grep`.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        if self.matched > 0 {
            ExitCode::Success
        } else {
            ExitCode::NoMatches
        }
    }
}

/// Run the classify command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
///
/// # Errors
///
/// Returns an error if no paths were given, the model cannot be loaded or
/// output cannot be written.
pub fn run(args: &ClassifyArgs) -> Result<ClassifyResult> {
    info!("Running classify command on {} paths", args.paths.len());

    if args.paths.is_empty() {
        anyhow::bail!("No paths specified");
    }

    let session = args.engine.session(args.policy())?;
    if session.labels().index_of(&session.policy().target_label).is_none() {
        warn!(
            "Label '{}' is not one of the model's labels; nothing can match",
            session.policy().target_label
        );
    }

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let total = source.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output: Box<dyn ResultOutput> = match args.format() {
        OutputFormat::Text => Box::new(TextOutput::stdout()),
        OutputFormat::Jsonl => Box::new(JsonOutput::stdout()),
        OutputFormat::Json => Box::new(JsonOutput::stdout().into_array(args.pretty)),
    };

    let result = write_reports(
        session.reports(source.images(), &progress),
        output.as_ref(),
        args.all,
    )?;

    progress.on_event(ProgressEvent::Finished {
        classified: result.classified,
        failed: result.failed,
        matched: result.matched,
    });

    if result.matched == 0 && !args.quiet {
        eprintln!("No matching images found");
    }
    info!(
        "{} classified, {} failed, {} matched",
        result.classified, result.failed, result.matched
    );

    Ok(result)
}

/// Writes accepted reports (every report with `all`) and counts outcomes.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn write_reports<I>(
    reports: I,
    output: &dyn ResultOutput,
    all: bool,
) -> Result<ClassifyResult>
where
    I: IntoIterator<Item = ImageReport>,
{
    let mut result = ClassifyResult::default();

    for report in reports {
        if report.is_failed() {
            result.failed += 1;
        } else {
            result.classified += 1;
        }
        if report.is_accepted() {
            result.matched += 1;
        }

        if all || report.is_accepted() {
            output.write(&report)?;
        }
    }

    output.flush()?;
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use wes_classifier_core::{Classification, FailureStage, ImageId, ImageStatus};
    use wes_classifier_test_support::MockResultOutput;

    use super::*;

    fn classified(id: usize, accepted: bool) -> ImageReport {
        ImageReport {
            id: ImageId(id),
            path: format!("{id}.jpg"),
            timestamp: "2024-01-01T00:00:00Z".into(),
            dimensions: None,
            status: ImageStatus::Classified {
                classification: Classification {
                    index: 0,
                    label: WES_ANDERSON.into(),
                    confidence: if accepted { 99.0 } else { 60.0 },
                },
                accepted,
            },
        }
    }

    fn unreadable(id: usize) -> ImageReport {
        ImageReport {
            id: ImageId(id),
            path: format!("{id}.jpg"),
            timestamp: "2024-01-01T00:00:00Z".into(),
            dimensions: None,
            status: ImageStatus::Failed {
                stage: FailureStage::Acquire,
                error: "permission denied".into(),
            },
        }
    }

    #[test]
    fn test_write_reports_only_matches() {
        let output = MockResultOutput::new();
        let reports = vec![classified(0, true), classified(1, false), unreadable(2)];

        let result = write_reports(reports, &output, false).unwrap();

        assert_eq!(
            result,
            ClassifyResult {
                classified: 2,
                failed: 1,
                matched: 1,
            }
        );
        assert_eq!(result.exit_code(), ExitCode::Success);
        let written: Vec<usize> = output.reports().iter().map(|r| r.id.0).collect();
        assert_eq!(written, vec![0]);
        assert_eq!(output.flush_count(), 1);
    }

    #[test]
    fn test_write_reports_all_includes_failures() {
        let output = MockResultOutput::new();
        let reports = vec![classified(0, false), unreadable(1)];

        let result = write_reports(reports, &output, true).unwrap();

        assert_eq!(result.matched, 0);
        assert_eq!(result.exit_code(), ExitCode::NoMatches);
        let written = output.reports();
        assert_eq!(written.len(), 2);
        assert!(matches!(
            written[1].status,
            ImageStatus::Failed {
                stage: FailureStage::Acquire,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_confidence() {
        assert_eq!(parse_confidence("95"), Ok(95.0));
        assert_eq!(parse_confidence("0"), Ok(0.0));
        assert!(parse_confidence("100.5").is_err());
        assert!(parse_confidence("high").is_err());
    }

    #[test]
    fn test_default_policy() {
        let policy = ClassifyArgs::default().policy();
        assert_eq!(policy, AcceptancePolicy::default());
    }

    #[test]
    fn test_config_applies_when_cli_silent() {
        let config: AppConfig = toml::from_str(
            r"
[general]
recursive = true

[policy]
label = 'OTHER'
min_confidence = 50.0

[output]
format = 'text'
all = true
",
        )
        .unwrap();

        let args = ClassifyArgs::default().with_config(&config);

        assert!(args.recursive);
        assert!(args.all);
        assert_eq!(args.format(), OutputFormat::Text);
        assert_eq!(args.policy(), AcceptancePolicy::new("OTHER", 50.0));
    }

    #[test]
    fn test_cli_overrides_config() {
        let config: AppConfig = toml::from_str(
            r"
[policy]
min_confidence = 50.0

[output]
format = 'text'
",
        )
        .unwrap();

        let args = ClassifyArgs {
            min_confidence: Some(99.0),
            format: Some(OutputFormat::Json),
            ..ClassifyArgs::default()
        }
        .with_config(&config);

        assert_eq!(args.policy().min_confidence, 99.0);
        assert_eq!(args.format(), OutputFormat::Json);
    }
}
