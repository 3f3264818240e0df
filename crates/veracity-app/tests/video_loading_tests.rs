//! Integration tests for reading videos from disk.

use std::fs;
use std::path::{Path, PathBuf};

use veracity_app::{AppError, load_video, mime_for_path};

fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("veracity-video-loading-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("scratch file should be writable");
    path
}

#[test]
fn video_loading_tests_maps_common_extensions() {
    assert_eq!(mime_for_path(Path::new("clip.mp4")), "video/mp4");
    assert_eq!(mime_for_path(Path::new("CLIP.MOV")), "video/quicktime");
    assert_eq!(mime_for_path(Path::new("talk.webm")), "video/webm");
    assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
    assert_eq!(mime_for_path(Path::new("no_extension")), "application/octet-stream");
}

#[test]
fn video_loading_tests_reads_name_bytes_and_mime() {
    let path = scratch_file("interview.mp4", &[0, 1, 2, 3]);

    let file = load_video(&path).expect("file should load");

    assert_eq!(file.name, "interview.mp4");
    assert_eq!(file.mime_type, "video/mp4");
    assert_eq!(file.bytes, vec![0, 1, 2, 3]);
    assert!(file.is_video());

    fs::remove_file(path).expect("scratch file should be removable");
}

#[test]
fn video_loading_tests_non_video_loads_but_is_not_video() {
    let path = scratch_file("readme.txt", b"hello");

    let file = load_video(&path).expect("file should load");
    assert!(!file.is_video());

    fs::remove_file(path).expect("scratch file should be removable");
}

#[test]
fn video_loading_tests_missing_file_reports_path() {
    let path = std::env::temp_dir().join("veracity-definitely-missing.mp4");

    let error = load_video(&path).expect_err("missing file fails");

    assert!(matches!(error, AppError::Io { .. }));
    assert!(error.to_string().contains("veracity-definitely-missing.mp4"));
}
