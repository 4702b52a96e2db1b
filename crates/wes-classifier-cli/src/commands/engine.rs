//! Model and session options shared by `classify` and `evaluate`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;
use wes_classifier_adapters::{model_paths_in, models_dir, set_models_dir};
use wes_classifier_core::inference::{
    load_model, select_device, DevicePreference, LoadedModel, ModelPaths,
};
use wes_classifier_core::{AcceptancePolicy, LoadError, Session, DEFAULT_THREADS};

use crate::config::AppConfig;

/// Parse and validate a thread count (at least 1).
fn parse_threads(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid thread count"))?;
    if value == 0 {
        Err("thread count must be at least 1".into())
    } else {
        Ok(value)
    }
}

/// Where the model lives and how to run it.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Model weights file (overrides the models directory)
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Label list file (overrides the models directory)
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Preprocessing threads [default: 4]
    #[arg(long, value_parser = parse_threads)]
    pub threads: Option<usize>,

    /// Inference device: auto or cpu [default: auto]
    #[arg(long)]
    pub device: Option<DevicePreference>,
}

impl EngineArgs {
    /// Apply configuration file values where no CLI flag was given.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        if self.model.is_none() {
            self.model.clone_from(&config.models.model);
        }
        if self.labels.is_none() {
            self.labels.clone_from(&config.models.labels);
        }
        self.threads = self.threads.or(config.general.threads.filter(|&t| t > 0));
        if self.device.is_none() {
            self.device = config
                .general
                .device
                .as_deref()
                .and_then(|d| d.parse().ok());
        }
        self
    }

    /// Thread count with fallback to the default.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads.unwrap_or(DEFAULT_THREADS)
    }

    /// Resolves weight and label paths: explicit files, else the models directory.
    #[must_use]
    pub fn model_paths(&self) -> ModelPaths {
        if let Some(ref dir) = self.models_dir {
            debug!("Using custom models directory: {}", dir.display());
            set_models_dir(dir.clone());
        }
        let defaults = model_paths_in(&models_dir());

        ModelPaths {
            model: self.model.clone().unwrap_or(defaults.model),
            labels: self.labels.clone().unwrap_or(defaults.labels),
        }
    }

    /// Loads the model and its labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or labels cannot be loaded.
    pub fn load(&self) -> Result<LoadedModel> {
        let paths = self.model_paths();
        let device = select_device(self.device.unwrap_or_default());

        load_model(&paths, &device).map_err(|e| {
            let hint = matches!(e, LoadError::ModelNotFound { .. })
                .then_some(" (run `wes-classifier models fetch --from <URL>` or pass --model)")
                .unwrap_or_default();
            anyhow::Error::new(e).context(format!("Failed to load classifier{hint}"))
        })
    }

    /// Loads the model and wraps it in a session with the given policy.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the thread pool cannot be created.
    pub fn session(&self, policy: AcceptancePolicy) -> Result<Session> {
        let loaded = self.load()?;
        Session::new(
            Box::new(loaded.classifier),
            loaded.labels,
            policy,
            self.threads(),
        )
        .context("Failed to start classification session")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_threads() {
        assert_eq!(parse_threads("8"), Ok(8));
        assert!(parse_threads("0").is_err());
        assert!(parse_threads("many").is_err());
    }

    #[test]
    fn test_explicit_paths_win() {
        let args = EngineArgs {
            model: Some(PathBuf::from("/tmp/m.safetensors")),
            labels: Some(PathBuf::from("/tmp/l.txt")),
            ..EngineArgs::default()
        };
        let paths = args.model_paths();
        assert_eq!(paths.model, PathBuf::from("/tmp/m.safetensors"));
        assert_eq!(paths.labels, PathBuf::from("/tmp/l.txt"));
    }

    #[test]
    fn test_cli_beats_config() {
        let config: AppConfig = toml::from_str(
            r"
[general]
threads = 2
device = 'cpu'

[models]
labels = '/from/config.txt'
",
        )
        .unwrap();
        let args = EngineArgs {
            threads: Some(6),
            ..EngineArgs::default()
        }
        .with_config(&config);

        assert_eq!(args.threads(), 6);
        assert_eq!(args.device, Some(DevicePreference::Cpu));
        assert_eq!(args.labels, Some(PathBuf::from("/from/config.txt")));
    }
}
