//! Integration tests for filesystem image acquisition.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use image::GenericImageView;
use tempfile::TempDir;
use wes_classifier_adapters::{FsImageSource, LabeledImageSource};
use wes_classifier_core::domain::{ImageData, ImageId, LabelSet, RawImage};
use wes_classifier_core::ImageSource;
use wes_classifier_test_support::SyntheticImageBuilder;

fn write_image(path: &Path) {
    SyntheticImageBuilder::write(path, &SyntheticImageBuilder::gradient(8, 8));
}

fn decode(raw: &RawImage) -> image::DynamicImage {
    match &raw.data {
        ImageData::Encoded(bytes) => image::load_from_memory(bytes).expect("should decode"),
        ImageData::Decoded(image) => image.clone(),
    }
}

#[test]
fn test_load_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("still.png");
    write_image(&path);

    let source = FsImageSource::new(vec![path], false);
    let images: Vec<_> = source.images().collect();
    assert_eq!(images.len(), 1);

    let raw = images.into_iter().next().unwrap().expect("should read PNG");
    assert_eq!(raw.id, ImageId(0));
    assert!(raw.path.ends_with("still.png"));
    assert_eq!(decode(&raw).dimensions(), (8, 8));
}

#[test]
fn test_load_jpeg() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("still.jpg");
    write_image(&path);

    let source = FsImageSource::new(vec![path], false);
    let raw = source.images().next().unwrap().expect("should read JPEG");
    assert_eq!(decode(&raw).dimensions(), (8, 8));
}

#[test]
fn test_directory_is_sorted_and_numbered() {
    let dir = TempDir::new().unwrap();
    for name in ["c.png", "a.png", "b.jpg"] {
        write_image(&dir.path().join(name));
    }
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    let images: Vec<RawImage> = source.images().map(Result::unwrap).collect();

    let names: Vec<_> = images
        .iter()
        .map(|r| Path::new(&r.path).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png", "b.jpg", "c.png"]);

    let ids: Vec<_> = images.iter().map(|r| r.id.0).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn test_recursive_scan() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_image(&dir.path().join("top.png"));
    write_image(&nested.join("deep.png"));

    let flat = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    assert_eq!(flat.count_hint(), Some(1));

    let recursive = FsImageSource::new(vec![dir.path().to_path_buf()], true);
    assert_eq!(recursive.count_hint(), Some(2));
}

#[test]
fn test_corrupt_file_is_still_acquired() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.jpg");
    SyntheticImageBuilder::write_corrupt(&path);

    let source = FsImageSource::new(vec![path], false);
    let raw = source.images().next().unwrap().expect("bytes are readable");
    assert!(matches!(raw.data, ImageData::Encoded(_)));
}

#[test]
fn test_missing_path_is_skipped() {
    let dir = TempDir::new().unwrap();
    let source = FsImageSource::new(vec![dir.path().join("missing.png")], false);
    assert_eq!(source.images().count(), 0);
}

#[test]
fn test_labeled_source() {
    let dir = TempDir::new().unwrap();
    let labels = LabelSet::new(["WES_ANDERSON", "NOT_WES_ANDERSON", "OTHER"]).unwrap();
    for (label, count) in [("WES_ANDERSON", 2), ("NOT_WES_ANDERSON", 1), ("OTHER", 0)] {
        let class_dir = dir.path().join(label);
        std::fs::create_dir(&class_dir).unwrap();
        for i in 0..count {
            write_image(&class_dir.join(format!("{i}.png")));
        }
    }

    let source = LabeledImageSource::new(dir.path(), &labels).unwrap();
    assert_eq!(source.len(), 3);

    let classes: Vec<usize> = source.labeled_images().map(|(label, _)| label).collect();
    assert_eq!(classes, vec![0, 0, 1]);
    assert_eq!(source.label_of(ImageId(2)), Some(1));
    assert_eq!(source.label_of(ImageId(3)), None);
}

#[test]
fn test_labeled_source_names_missing_classes() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("WES_ANDERSON")).unwrap();
    let labels = LabelSet::new(["WES_ANDERSON", "NOT_WES_ANDERSON", "OTHER"]).unwrap();

    let err = LabeledImageSource::new(dir.path(), &labels)
        .err()
        .expect("should fail");
    let message = err.to_string();
    assert!(message.contains("NOT_WES_ANDERSON"));
    assert!(message.contains("OTHER"));
}
