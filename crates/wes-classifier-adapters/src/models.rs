//! Model store: locating, listing and downloading model artifacts.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use wes_classifier_core::inference::ModelPaths;

/// A file the classifier needs at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Artifact name, also the key in `[models.sha256]`.
    pub name: &'static str,
    /// Filename in the models directory.
    pub filename: &'static str,
}

/// Classifier weights.
pub const CLASSIFIER: ModelArtifact = ModelArtifact {
    name: "classifier",
    filename: "wes_anderson_mobilenet_v2.safetensors",
};

/// Label list matching the classifier's output head.
pub const LABELS: ModelArtifact = ModelArtifact {
    name: "labels",
    filename: "labels.txt",
};

/// Every known artifact.
pub const ARTIFACTS: &[ModelArtifact] = &[CLASSIFIER, LABELS];

static MODELS_DIR_OVERRIDE: OnceCell<PathBuf> = OnceCell::new();

/// Overrides the models directory for the rest of the process.
///
/// Returns `false` if an override was already set.
pub fn set_models_dir(dir: PathBuf) -> bool {
    MODELS_DIR_OVERRIDE.set(dir).is_ok()
}

/// Returns the models directory path.
///
/// Uses the override if set, else `XDG_DATA_HOME/wes-classifier/models` or
/// `~/.local/share/wes-classifier/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    if let Some(dir) = MODELS_DIR_OVERRIDE.get() {
        return dir.clone();
    }
    default_models_dir()
}

/// The models directory ignoring any override.
#[must_use]
pub fn default_models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wes-classifier")
        .join("models")
}

/// Returns the path to an artifact by name.
#[must_use]
pub fn model_path(name: &str) -> Option<PathBuf> {
    ARTIFACTS
        .iter()
        .find(|a| a.name == name)
        .map(|a| models_dir().join(a.filename))
}

/// Default weight and label locations inside `dir`.
#[must_use]
pub fn model_paths_in(dir: &Path) -> ModelPaths {
    ModelPaths {
        model: dir.join(CLASSIFIER.filename),
        labels: dir.join(LABELS.filename),
    }
}

/// Lists artifacts in `dir` with their installed status.
#[must_use]
pub fn list_models(dir: &Path) -> Vec<(ModelArtifact, bool)> {
    ARTIFACTS
        .iter()
        .map(|a| (*a, dir.join(a.filename).is_file()))
        .collect()
}

/// Checks if every artifact is present in `dir`.
#[must_use]
pub fn all_models_installed(dir: &Path) -> bool {
    list_models(dir).iter().all(|(_, installed)| *installed)
}

/// Download progress for a single artifact.
#[derive(Debug, Clone, Copy)]
pub enum FetchEvent<'a> {
    /// Download started; `total` is the content length if the server sent one.
    Started {
        artifact: &'a ModelArtifact,
        total: Option<u64>,
    },
    /// Bytes received so far.
    Progress {
        artifact: &'a ModelArtifact,
        downloaded: u64,
    },
    /// Artifact written and verified.
    Finished { artifact: &'a ModelArtifact },
    /// Artifact already present, nothing downloaded.
    Skipped { artifact: &'a ModelArtifact },
}

/// Where and how to fetch artifacts from.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Artifacts are fetched from `<base_url>/<filename>`.
    pub base_url: String,
    /// Expected SHA-256 by artifact name. Artifacts without an entry are not verified.
    pub checksums: HashMap<String, String>,
    /// Re-download artifacts that already exist.
    pub force: bool,
}

/// Ensures every artifact exists in `dir`, downloading the missing ones.
///
/// # Errors
///
/// Returns an error if:
/// - The models directory cannot be created
/// - A download fails
/// - A checksum doesn't match
pub fn ensure_models_with_progress(
    dir: &Path,
    options: &FetchOptions,
    on_event: &dyn Fn(FetchEvent<'_>),
) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create models directory {}", dir.display()))?;

    for artifact in ARTIFACTS {
        let path = dir.join(artifact.filename);
        if path.exists() && !options.force {
            debug!("Model {} already exists", artifact.name);
            on_event(FetchEvent::Skipped { artifact });
            continue;
        }

        let url = format!(
            "{}/{}",
            options.base_url.trim_end_matches('/'),
            artifact.filename
        );
        let expected = options.checksums.get(artifact.name).map(String::as_str);
        download_artifact(artifact, &url, expected, &path, on_event)?;
    }

    Ok(())
}

/// Streams one artifact to disk, hashing it on the way.
fn download_artifact(
    artifact: &ModelArtifact,
    url: &str,
    expected_sha256: Option<&str>,
    path: &Path,
    on_event: &dyn Fn(FetchEvent<'_>),
) -> Result<()> {
    info!("Downloading {} from {url}", artifact.name);

    let mut response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to download {}", artifact.name))?;

    if !response.status().is_success() {
        bail!(
            "Download of {} failed with status: {}",
            artifact.name,
            response.status()
        );
    }

    on_event(FetchEvent::Started {
        artifact,
        total: response.content_length(),
    });

    // Write next to the target so a failed download never leaves a truncated artifact
    let partial = path.with_extension("part");
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut downloaded = 0u64;

    loop {
        let n = response
            .read(&mut buf)
            .with_context(|| format!("Failed to read response for {}", artifact.name))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer
            .write_all(&buf[..n])
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        downloaded += n as u64;
        on_event(FetchEvent::Progress {
            artifact,
            downloaded,
        });
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    drop(writer);

    let hash = format!("{:x}", hasher.finalize());
    if let Some(expected) = expected_sha256 {
        if !hash.eq_ignore_ascii_case(expected.trim()) {
            let _ = fs::remove_file(&partial);
            bail!(
                "Checksum mismatch for {}: expected {}, got {hash}",
                artifact.name,
                expected.trim()
            );
        }
    } else {
        debug!("No checksum configured for {}, sha256={hash}", artifact.name);
    }

    fs::rename(&partial, path)
        .with_context(|| format!("Failed to move download into {}", path.display()))?;

    info!("Downloaded {} ({downloaded} bytes)", artifact.name);
    on_event(FetchEvent::Finished { artifact });
    Ok(())
}
