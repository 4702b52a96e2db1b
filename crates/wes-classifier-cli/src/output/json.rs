//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use serde::Serialize;
use wes_classifier_core::{ImageReport, ResultOutput};

/// JSON output adapter.
///
/// Writes one object per line by default. In array mode reports are held
/// until `flush()`, which writes them as a single JSON array.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    array: Option<Mutex<Vec<ImageReport>>>,
    pretty: bool,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            array: None,
            pretty: false,
        }
    }

    /// Switches to array mode; `pretty` indents the array.
    #[must_use]
    pub fn into_array(mut self, pretty: bool) -> Self {
        self.array = Some(Mutex::new(Vec::new()));
        self.pretty = pretty;
        self
    }

    /// Writes any serializable value as one JSON document.
    #[allow(clippy::significant_drop_tightening)]
    pub fn write_value<T: Serialize + ?Sized>(&self, value: &T, pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }
}

impl ResultOutput for JsonOutput {
    fn write(&self, report: &ImageReport) -> Result<()> {
        match &self.array {
            Some(buffer) => {
                buffer
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?
                    .push(report.clone());
                Ok(())
            }
            None => self.write_value(report, false),
        }
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        if let Some(buffer) = &self.array {
            let reports = std::mem::take(
                &mut *buffer
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?,
            );
            self.write_value(&reports, self.pretty)?;
        }
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}
