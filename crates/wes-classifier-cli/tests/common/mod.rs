//! Shared fixtures for CLI integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;
use wes_classifier_test_support::{write_constant_model, write_labels, SyntheticImageBuilder};

pub const LABELS: [&str; 3] = ["WES_ANDERSON", "NOT_WES_ANDERSON", "OTHER"];
pub const MODEL_FILE: &str = "wes_anderson_mobilenet_v2.safetensors";
pub const LABELS_FILE: &str = "labels.txt";

/// A scratch directory with an installed constant model and an image folder.
///
/// Commands run with the scratch directory as cwd and as `XDG_CONFIG_HOME`, so
/// no config outside the fixture is picked up.
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    /// Installs a model whose output is `softmax(logits)` for every image.
    pub fn new(logits: &[f32]) -> Self {
        let root = tempfile::tempdir().unwrap();
        let fixture = Self { root };

        std::fs::create_dir_all(fixture.models_dir()).unwrap();
        std::fs::create_dir_all(fixture.images_dir()).unwrap();
        std::fs::create_dir_all(fixture.xdg_dir()).unwrap();
        write_constant_model(&fixture.models_dir().join(MODEL_FILE), logits).unwrap();
        write_labels(&fixture.models_dir().join(LABELS_FILE), &LABELS).unwrap();

        fixture
    }

    /// A fixture with no model installed.
    pub fn without_model() -> Self {
        let root = tempfile::tempdir().unwrap();
        let fixture = Self { root };
        std::fs::create_dir_all(fixture.images_dir()).unwrap();
        std::fs::create_dir_all(fixture.xdg_dir()).unwrap();
        fixture
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.path().join("models")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.path().join("images")
    }

    pub fn xdg_dir(&self) -> PathBuf {
        self.root.path().join("xdg")
    }

    /// Writes a small synthetic image under the image folder.
    pub fn add_image(&self, name: &str) -> PathBuf {
        let path = self.images_dir().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        SyntheticImageBuilder::write(&path, &SyntheticImageBuilder::pastel(64, 48));
        path
    }

    /// Writes garbage bytes with an image extension.
    pub fn add_corrupt(&self, name: &str) -> PathBuf {
        let path = self.images_dir().join(name);
        SyntheticImageBuilder::write_corrupt(&path);
        path
    }

    /// Writes a project-local config file.
    pub fn project_config(&self, toml: &str) {
        std::fs::write(self.root.path().join(".wes-classifier.toml"), toml).unwrap();
    }

    /// Writes the XDG config file.
    pub fn xdg_config(&self, toml: &str) {
        let dir = self.xdg_dir().join("wes-classifier");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), toml).unwrap();
    }

    /// The binary, isolated to this fixture.
    #[allow(deprecated)]
    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("wes-classifier").unwrap();
        cmd.current_dir(self.root.path())
            .env("XDG_CONFIG_HOME", self.xdg_dir())
            .env("XDG_DATA_HOME", self.root.path().join("data"));
        cmd
    }

    /// The default classify command pointed at this fixture's models.
    pub fn classify(&self) -> Command {
        let mut cmd = self.bin();
        cmd.arg("--models-dir").arg(self.models_dir());
        cmd
    }
}
