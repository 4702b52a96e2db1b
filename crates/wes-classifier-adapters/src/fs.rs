//! Filesystem adapters for acquiring images.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, warn};
use wes_classifier_core::{AcquireError, ImageId, ImageSource, LabelSet, RawImage};

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Filesystem image source adapter.
///
/// Files are read into memory undecoded; a file that is not a valid image
/// fails later, in preprocessing.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all image files from the configured paths, in batch order.
    #[must_use]
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                collect_from_dir(path, self.recursive, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<RawImage, AcquireError>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} image files", files.len());

        Box::new(
            files
                .into_iter()
                .enumerate()
                .map(|(i, path)| read_image(ImageId(i), &path)),
        )
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

/// Labeled directory tree: `root/<LABEL>/*.jpg` for every label.
pub struct LabeledImageSource {
    samples: Vec<(usize, PathBuf)>,
}

impl LabeledImageSource {
    /// Scans `root` for one subdirectory per label.
    ///
    /// # Errors
    ///
    /// Returns an error naming every label whose directory is missing.
    pub fn new(root: &Path, labels: &LabelSet) -> Result<Self> {
        let missing: Vec<&str> = labels
            .iter()
            .filter(|label| !root.join(label).is_dir())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing class directories under {}: {}",
                root.display(),
                missing.join(", ")
            );
        }

        let mut samples = Vec::new();
        for (index, label) in labels.iter().enumerate() {
            let mut files = Vec::new();
            collect_from_dir(&root.join(label), true, &mut files);
            debug!("{label}: {} images", files.len());
            samples.extend(files.into_iter().map(|f| (index, f)));
        }

        Ok(Self { samples })
    }

    /// Number of labeled images found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True class of the image with the given id.
    #[must_use]
    pub fn label_of(&self, id: ImageId) -> Option<usize> {
        self.samples.get(id.0).map(|(label, _)| *label)
    }

    /// Yields `(label_index, image)` pairs in label order.
    pub fn labeled_images(
        &self,
    ) -> impl Iterator<Item = (usize, Result<RawImage, AcquireError>)> + '_ {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, (label, path))| (*label, read_image(ImageId(i), path)))
    }
}

fn collect_from_dir(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_file() && is_supported_image(&path) {
            files.push(path);
        } else if path.is_dir() && recursive {
            collect_from_dir(&path, recursive, files);
        }
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

fn read_image(id: ImageId, path: &Path) -> Result<RawImage, AcquireError> {
    let bytes =
        std::fs::read(path).map_err(|e| AcquireError::new(id, path.to_string_lossy(), e))?;
    Ok(RawImage::encoded(id, path.to_string_lossy(), bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_file_keeps_path() {
        let path = Path::new("/nonexistent/still.png");
        let err = read_image(ImageId(3), path).unwrap_err();

        assert_eq!(err.id, ImageId(3));
        assert_eq!(err.path, "/nonexistent/still.png");
        assert!(!err.reason.is_empty());
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.png")));
        assert!(is_supported_image(Path::new("still.webp")));
        assert!(!is_supported_image(Path::new("test.cr2")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
    }
}
