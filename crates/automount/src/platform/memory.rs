//! In-memory backend.

use std::collections::{BTreeMap, BTreeSet};
use std::io;

use automount_common::MountFlags;
use automount_cpio::{CpioDecoder, FileType};

use super::{ArchiveExtractor, UnmountFlags, Vfs};
use crate::registry::ActiveMount;

const EXTRACTED_DIR_MODE: u32 = 0o755;

/// A directory tree and mount table kept in memory.
///
/// Used for dry runs and tests. `/` always exists. Mounting requires the
/// target directory to exist, like a real kernel does, and individual
/// paths can be told to fail their mount or unmount.
#[derive(Debug, Clone)]
pub struct MemoryVfs {
    dirs: BTreeMap<String, u32>,
    files: BTreeMap<String, Vec<u8>>,
    links: BTreeMap<String, String>,
    mounts: Vec<ActiveMount>,
    drivers: Option<BTreeSet<String>>,
    failing_mounts: BTreeSet<String>,
    failing_unmounts: BTreeSet<String>,
    unmount_log: Vec<String>,
}

impl MemoryVfs {
    /// Create a tree holding only `/`, accepting every driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the given filesystem drivers; others fail with `ENODEV`.
    #[must_use]
    pub fn with_drivers<I, S>(mut self, drivers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drivers = Some(drivers.into_iter().map(Into::into).collect());
        self
    }

    /// Create `path` and its parents up front.
    #[must_use]
    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert_dir_all(&normalize(path), EXTRACTED_DIR_MODE);
        self
    }

    /// Make every mount at `path` fail with `EIO`.
    pub fn fail_mount(&mut self, path: &str) {
        self.failing_mounts.insert(normalize(path));
    }

    /// Make every unmount of `path` fail with `EBUSY`.
    pub fn fail_unmount(&mut self, path: &str) {
        self.failing_unmounts.insert(normalize(path));
    }

    /// Whether `path` is a directory.
    #[must_use]
    pub fn is_dir(&self, path: &str) -> bool {
        self.dirs.contains_key(&normalize(path))
    }

    /// Permission bits of directory `path`.
    #[must_use]
    pub fn mode(&self, path: &str) -> Option<u32> {
        self.dirs.get(&normalize(path)).copied()
    }

    /// Whether `path` is a regular file.
    #[must_use]
    pub fn is_file(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }

    /// Contents of regular file `path`.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files.get(&normalize(path)).map(Vec::as_slice)
    }

    /// Target of symbolic link `path`.
    #[must_use]
    pub fn link(&self, path: &str) -> Option<&str> {
        self.links.get(&normalize(path)).map(String::as_str)
    }

    /// All directories, sorted.
    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.dirs.keys().map(String::as_str)
    }

    /// Filesystems currently mounted, in mount order.
    #[must_use]
    pub fn mounts(&self) -> &[ActiveMount] {
        &self.mounts
    }

    /// Every unmount attempt, successful or not, in call order.
    #[must_use]
    pub fn unmount_log(&self) -> &[String] {
        &self.unmount_log
    }

    fn exists(&self, path: &str) -> bool {
        self.dirs.contains_key(path) || self.files.contains_key(path) || self.links.contains_key(path)
    }

    fn insert_dir_all(&mut self, path: &str, mode: u32) {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            self.dirs.entry(current.clone()).or_insert(mode);
        }
    }

    fn ensure_parent(&mut self, path: &str) {
        if let Some(parent) = parent(path) {
            self.insert_dir_all(parent, EXTRACTED_DIR_MODE);
        }
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self {
            dirs: BTreeMap::from([("/".to_string(), EXTRACTED_DIR_MODE)]),
            files: BTreeMap::new(),
            links: BTreeMap::new(),
            mounts: Vec::new(),
            drivers: None,
            failing_mounts: BTreeSet::new(),
            failing_unmounts: BTreeSet::new(),
            unmount_log: Vec::new(),
        }
    }
}

impl Vfs for MemoryVfs {
    fn mount(
        &mut self,
        source: &str,
        path: &str,
        driver: &str,
        flags: MountFlags,
        options: Option<&str>,
    ) -> io::Result<()> {
        let target = normalize(path);
        tracing::debug!(source, path = %target, driver, %flags, options, "Mounting in memory");

        if self.failing_mounts.contains(&target) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if let Some(drivers) = &self.drivers {
            if !drivers.contains(driver) {
                return Err(io::Error::from_raw_os_error(libc::ENODEV));
            }
        }
        if !self.dirs.contains_key(&target) {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }

        self.mounts.push(ActiveMount::new(source, target, driver));
        Ok(())
    }

    fn unmount(&mut self, mount: &ActiveMount, _flags: UnmountFlags) -> io::Result<()> {
        let target = normalize(&mount.path);
        self.unmount_log.push(target.clone());

        if self.failing_unmounts.contains(&target) {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }

        let index = self
            .mounts
            .iter()
            .rposition(|m| normalize(&m.path) == target)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        self.mounts.remove(index);
        Ok(())
    }

    fn make_dir(&mut self, path: &str, mode: u32) -> io::Result<()> {
        let target = normalize(path);
        if self.exists(&target) {
            return Err(io::Error::from_raw_os_error(libc::EEXIST));
        }
        match parent(&target) {
            Some(parent) if self.dirs.contains_key(parent) => {}
            _ => return Err(io::Error::from_raw_os_error(libc::ENOENT)),
        }

        tracing::trace!(path = %target, mode, "Creating directory in memory");
        self.dirs.insert(target, mode);
        Ok(())
    }
}

impl ArchiveExtractor for MemoryVfs {
    fn extract(&mut self, path: &str, archive: &[u8]) -> io::Result<()> {
        let base = normalize(path);
        if !self.dirs.contains_key(&base) {
            return Err(io::Error::from_raw_os_error(libc::ENOENT));
        }
        if archive.is_empty() {
            return Ok(());
        }

        let mut decoder = CpioDecoder::new(archive);
        for entry in decoder.decode_entries() {
            let entry = entry?;
            let name = entry.name().trim_start_matches("./");
            if name.is_empty() || name == "." {
                continue;
            }
            if name.starts_with('/') || name.split('/').any(|s| s == "..") {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("archive entry {name} escapes the target directory"),
                ));
            }

            let target = normalize(&format!("{base}/{name}"));
            let metadata = entry.metadata();
            match metadata.file_type() {
                FileType::Dir => {
                    self.ensure_parent(&target);
                    self.dirs
                        .insert(target, u32::from(metadata.permission_mode()));
                }
                FileType::File => {
                    self.ensure_parent(&target);
                    self.files.insert(target, entry.data().to_vec());
                }
                FileType::Link => {
                    self.ensure_parent(&target);
                    let link = String::from_utf8_lossy(entry.data()).into_owned();
                    self.links.insert(target, link);
                }
                other => {
                    tracing::warn!(name, file_type = ?other, "Skipping unsupported archive entry");
                }
            }
        }
        Ok(())
    }
}

/// Collapse repeated separators and drop the trailing one.
fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

fn parent(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(0) if path.len() > 1 => Some("/"),
        Some(0) | None => None,
        Some(index) => Some(&path[..index]),
    }
}
