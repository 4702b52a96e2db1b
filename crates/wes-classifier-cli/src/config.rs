//! Configuration file support for wes-classifier.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/wes-classifier/config.toml` (lowest priority)
//! - Project-local: `.wes-classifier.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};
use wes_classifier_core::inference::DevicePreference;

/// Name of the project-local config file.
pub const PROJECT_CONFIG_FILE: &str = ".wes-classifier.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Acceptance policy.
    pub policy: PolicyConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
    /// Preprocessing threads.
    pub threads: Option<usize>,
    /// Inference device: "auto" or "cpu".
    pub device: Option<String>,
}

/// Acceptance policy configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Label that must win for an image to be surfaced.
    pub label: Option<String>,
    /// Minimum confidence in percent (0-100).
    pub min_confidence: Option<f32>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Explicit path to the model weights.
    pub model: Option<PathBuf>,
    /// Explicit path to the label list.
    pub labels: Option<PathBuf>,
    /// Expected SHA-256 per artifact name, checked by `models fetch`.
    pub sha256: HashMap<String, String>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl" or "text".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
    /// Write every report, not just matches.
    pub all: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/wes-classifier/config.toml`
    /// 2. Project-local: `.wes-classifier.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(c) = self.policy.min_confidence {
            if !(0.0..=100.0).contains(&c) {
                return Err(format!("policy.min_confidence must be 0-100, got {c}"));
            }
        }

        if self.general.threads == Some(0) {
            return Err("general.threads must be at least 1".into());
        }

        if let Some(ref d) = self.general.device {
            d.parse::<DevicePreference>()
                .map_err(|e| format!("general.device: {e}"))?;
        }

        if let Some(ref f) = self.output.format {
            if !matches!(f.as_str(), "json" | "jsonl" | "text") {
                return Err(format!(
                    "output.format must be 'json', 'jsonl' or 'text', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);
        self.general.threads = other.general.threads.or(self.general.threads);
        self.general.device = other.general.device.or_else(|| self.general.device.take());

        // Policy
        self.policy.label = other.policy.label.or_else(|| self.policy.label.take());
        self.policy.min_confidence = other
            .policy
            .min_confidence
            .or(self.policy.min_confidence);

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.model = other.models.model.or_else(|| self.models.model.take());
        self.models.labels = other.models.labels.or_else(|| self.models.labels.take());
        self.models.sha256.extend(other.models.sha256);

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
        self.output.all = other.output.all.or(self.output.all);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wes-classifier").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.wes-classifier.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
