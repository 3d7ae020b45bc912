//! Integration tests for archive extraction.

use std::os::unix::fs::PermissionsExt;

use automount_cpio::{ArchiveBuilder, CpioError, ExtractStats, FileType, extract};
use tempfile::tempdir;

#[test_log::test]
fn extract_tree() {
    let temp = tempdir().unwrap();
    let archive = ArchiveBuilder::new()
        .dir(".", 0o755)
        .dir("etc", 0o755)
        .file("etc/hostname", 0o600, b"unikernel\n")
        .dir("bin", 0o755)
        .file("bin/busybox", 0o755, b"\x7fELF")
        .symlink("bin/sh", "busybox")
        .finish();

    let stats = extract(temp.path(), &archive).unwrap();
    assert_eq!(
        stats,
        ExtractStats {
            directories: 2,
            files: 2,
            symlinks: 1,
            skipped: 0,
        }
    );

    let hostname = temp.path().join("etc/hostname");
    assert_eq!(std::fs::read(&hostname).unwrap(), b"unikernel\n");
    let mode = std::fs::metadata(&hostname).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    let link = std::fs::read_link(temp.path().join("bin/sh")).unwrap();
    assert_eq!(link.to_str(), Some("busybox"));
}

#[test_log::test]
fn extract_empty_region() {
    let temp = tempdir().unwrap();
    let stats = extract(temp.path(), &[]).unwrap();
    assert_eq!(stats, ExtractStats::default());
}

#[test_log::test]
fn extract_onto_existing_directories() {
    let temp = tempdir().unwrap();
    std::fs::create_dir(temp.path().join("etc")).unwrap();
    let archive = ArchiveBuilder::new()
        .dir("etc", 0o755)
        .file("etc/motd", 0o644, b"hello\n")
        .finish();

    let stats = extract(temp.path(), &archive).unwrap();
    assert_eq!(stats.directories, 0);
    assert_eq!(stats.files, 1);
}

#[test_log::test]
fn extract_skips_device_nodes() {
    let temp = tempdir().unwrap();
    let archive = ArchiveBuilder::new()
        .dir("dev", 0o755)
        .special("dev/null", FileType::Char, 0o666)
        .finish();

    let stats = extract(temp.path(), &archive).unwrap();
    assert_eq!(stats.skipped, 1);
    assert!(!temp.path().join("dev/null").exists());
}

#[test_log::test]
fn extract_rejects_escaping_names() {
    let temp = tempdir().unwrap();
    let outside = temp.path().join("outside");
    let root = temp.path().join("root");
    std::fs::create_dir(&root).unwrap();

    let archive = ArchiveBuilder::new()
        .file("../outside", 0o644, b"escaped")
        .finish();

    let err = extract(&root, &archive).unwrap_err();
    assert!(matches!(err, CpioError::UnsafeName(_)));
    assert!(!outside.exists());
}

#[test_log::test]
fn extract_refuses_writes_through_archive_symlinks() {
    let temp = tempdir().unwrap();
    let outside = temp.path().join("outside");
    let root = temp.path().join("root");
    std::fs::create_dir(&outside).unwrap();
    std::fs::create_dir(&root).unwrap();

    let archive = ArchiveBuilder::new()
        .symlink("x", outside.to_str().unwrap())
        .file("x/evil", 0o644, b"escaped")
        .finish();

    let err = extract(&root, &archive).unwrap_err();
    assert!(matches!(err, CpioError::UnsafeName(ref name) if name == "x/evil"));
    assert!(root.join("x").is_symlink());
    assert!(!outside.join("evil").exists());
}

#[test_log::test]
fn extract_refuses_to_overwrite_a_symlink() {
    let temp = tempdir().unwrap();
    let outside = temp.path().join("outside");
    let root = temp.path().join("root");
    std::fs::write(&outside, b"keep").unwrap();
    std::fs::create_dir(&root).unwrap();

    let archive = ArchiveBuilder::new()
        .symlink("motd", outside.to_str().unwrap())
        .file("motd", 0o644, b"replaced")
        .finish();

    let err = extract(&root, &archive).unwrap_err();
    assert!(matches!(err, CpioError::UnsafeName(_)));
    assert_eq!(std::fs::read(&outside).unwrap(), b"keep");
}

#[test_log::test]
fn extract_reports_truncation_as_io_error() {
    let temp = tempdir().unwrap();
    let mut archive = ArchiveBuilder::new().file("a", 0o644, b"abc").finish();
    archive.truncate(120);

    let err = extract(temp.path(), &archive).unwrap_err();
    assert!(matches!(err, CpioError::BufferShort));
    let io: std::io::Error = err.into();
    assert_eq!(io.kind(), std::io::ErrorKind::UnexpectedEof);
}
