//! Mount point creation and archive extraction on the host filesystem.

use std::os::unix::fs::PermissionsExt;

use automount::Automount;
use automount::config::AutomountConfig;
use automount::mountpoint::{MOUNT_POINT_MODE, make_mount_point};
use automount::platform::{BootRegions, HostVfs};
use automount_common::AutomountError;
use automount_cpio::ArchiveBuilder;
use tempfile::tempdir;

fn mode(path: &std::path::Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test_log::test]
fn creates_nested_mount_point() {
    let temp = tempdir().unwrap();
    let mut vfs = HostVfs::with_root(temp.path());

    make_mount_point(&mut vfs, "/a/b/c").unwrap();
    for dir in ["a", "a/b", "a/b/c"] {
        let path = temp.path().join(dir);
        assert!(path.is_dir(), "{dir}");
        assert_eq!(mode(&path), MOUNT_POINT_MODE, "{dir}");
    }

    make_mount_point(&mut vfs, "/a/b/c").unwrap();
}

#[test_log::test]
fn rejects_traversal_after_validated_prefix() {
    let temp = tempdir().unwrap();
    let mut vfs = HostVfs::with_root(temp.path());

    let err = make_mount_point(&mut vfs, "/a/../b").unwrap_err();
    assert!(matches!(err, AutomountError::InvalidPath { .. }));
    assert!(temp.path().join("a").is_dir());
    assert!(!temp.path().join("b").exists());
}

#[test_log::test]
fn repeated_separators_and_hidden_names() {
    let temp = tempdir().unwrap();
    let mut vfs = HostVfs::with_root(temp.path());

    make_mount_point(&mut vfs, "/a//b").unwrap();
    assert!(temp.path().join("a/b").is_dir());

    make_mount_point(&mut vfs, "/.hidden/...").unwrap();
    assert!(temp.path().join(".hidden/...").is_dir());
}

#[test_log::test]
fn file_in_the_way_is_a_create_error() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("a"), b"").unwrap();
    let mut vfs = HostVfs::with_root(temp.path());

    let err = make_mount_point(&mut vfs, "/a/b").unwrap_err();
    assert!(matches!(err, AutomountError::DirectoryCreate { ref path, .. } if path == "/a/b"));
}

#[test_log::test]
fn extract_entries_populate_prefix() {
    let temp = tempdir().unwrap();
    let initrd = ArchiveBuilder::new()
        .dir("etc", 0o755)
        .file("etc/hostname", 0o644, b"guest\n")
        .symlink("init", "etc/hostname")
        .finish();
    let embedded = ArchiveBuilder::new().file("app.conf", 0o600, b"x=1\n").finish();

    let config = AutomountConfig::default()
        .with_fstab_entry("initrd0:/:extract")
        .unwrap()
        .with_fstab_entry("embedded:/opt/app:extract:::mkmp")
        .unwrap();
    let regions = BootRegions::new()
        .with_initrd0(initrd)
        .with_embedded(embedded);

    let mut automount = Automount::new(config, HostVfs::with_root(temp.path()), regions);
    automount.boot().unwrap();

    assert_eq!(
        std::fs::read_to_string(temp.path().join("etc/hostname")).unwrap(),
        "guest\n"
    );
    assert!(temp.path().join("init").is_symlink());
    assert_eq!(mode(&temp.path().join("opt/app/app.conf")), 0o600);
    assert!(automount.registry().is_empty());
}

#[test_log::test]
fn corrupt_archive_is_an_extraction_error() {
    let temp = tempdir().unwrap();
    let config = AutomountConfig::default()
        .with_fstab_entry("initrd0:/:extract")
        .unwrap();
    let regions = BootRegions::new().with_initrd0(b"070701 truncated".to_vec());

    let mut automount = Automount::new(config, HostVfs::with_root(temp.path()), regions);
    let err = automount.boot().unwrap_err();
    assert!(matches!(err, AutomountError::Extraction { .. }));
    assert_eq!(err.errno(), libc::EIO);
}
