//! Tab-separated text output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use wes_classifier_core::{ImageReport, ImageStatus, ResultOutput};

/// Writes `path<TAB>label<TAB>NN%` per classified image.
///
/// Failed images become `path<TAB>ERROR<TAB>stage: message`.
pub struct TextOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl TextOutput {
    /// Creates a new text output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new text output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

/// Formats one report as a text line (without newline).
#[must_use]
pub fn format_line(report: &ImageReport) -> String {
    match &report.status {
        ImageStatus::Classified { classification, .. } => format!(
            "{}\t{}\t{}%",
            report.path,
            classification.label,
            classification.confidence_rounded()
        ),
        ImageStatus::Failed { stage, error } => {
            format!("{}\tERROR\t{stage}: {error}", report.path)
        }
    }
}

impl ResultOutput for TextOutput {
    #[allow(clippy::significant_drop_tightening)]
    fn write(&self, report: &ImageReport) -> Result<()> {
        let line = format_line(report);
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}
