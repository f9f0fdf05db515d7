use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::hasher::{hash_file, hash_file_bounded};

const HELLO_WORLD_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

#[test]
fn hashes_content_and_reports_size() {
    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join("hello.txt");
    fs::write(&path, "hello world").unwrap();

    let digest = hash_file(&path);
    assert_eq!(digest.digest, HELLO_WORLD_SHA256);
    assert_eq!(digest.size, 11);
}

#[test]
fn large_file_streams_through() {
    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join("big.bin");
    fs::write(&path, vec![7u8; 3 * 1024 * 1024 + 17]).unwrap();

    let digest = hash_file(&path);
    assert_eq!(digest.size, 3 * 1024 * 1024 + 17);
    assert_eq!(digest.digest.len(), 64);
}

#[test]
fn missing_file_fails_soft() {
    let tmpdir = TempDir::new().unwrap();
    let digest = hash_file(&tmpdir.path().join("gone.txt"));

    assert!(digest.is_empty());
    assert_eq!(digest.size, 0);
}

#[test]
fn directory_fails_soft() {
    let tmpdir = TempDir::new().unwrap();
    let digest = hash_file(tmpdir.path());

    assert!(digest.is_empty());
    assert_eq!(digest.size, 0);
}

#[tokio::test]
async fn bounded_hash_matches_direct_hash() {
    let tmpdir = TempDir::new().unwrap();
    let path = tmpdir.path().join("hello.txt");
    fs::write(&path, "hello world").unwrap();

    let digest = hash_file_bounded(path, Duration::from_secs(5)).await;
    assert_eq!(digest.digest, HELLO_WORLD_SHA256);
    assert_eq!(digest.size, 11);
}
