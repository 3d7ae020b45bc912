//! Host backend built on Linux syscalls.

use std::io;
use std::path::{Path, PathBuf};

use automount_common::MountFlags;

use super::{ArchiveExtractor, UnmountFlags, Vfs};
use crate::registry::ActiveMount;

/// Mounts through the host kernel.
///
/// Every absolute path the orchestrator hands over is resolved below a
/// root directory, `/` by default, so a whole boot sequence can be staged
/// inside a scratch directory.
#[derive(Debug, Clone)]
pub struct HostVfs {
    root: PathBuf,
}

impl HostVfs {
    /// Create a backend operating on the real root directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve paths below `root` instead of `/`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory absolute paths are resolved below.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an orchestrator path onto the host.
    ///
    /// Paths with `..` segments are rejected so nothing resolves outside
    /// the root directory.
    pub fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        if path.split('/').any(|segment| segment == "..") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path {path} leaves {}", self.root.display()),
            ));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

impl Default for HostVfs {
    fn default() -> Self {
        Self::with_root("/")
    }
}

impl Vfs for HostVfs {
    #[cfg(target_os = "linux")]
    fn mount(
        &mut self,
        source: &str,
        path: &str,
        driver: &str,
        flags: MountFlags,
        options: Option<&str>,
    ) -> io::Result<()> {
        use rustix::mount::{MountFlags as RustixMountFlags, mount};
        use std::ffi::CString;

        let target = self.resolve(path)?;
        let source = if source.is_empty() { "none" } else { source };

        tracing::debug!(
            source,
            target = %target.display(),
            driver,
            %flags,
            options = options.unwrap_or(""),
            "Mounting filesystem"
        );

        let bits = u32::try_from(flags.bits()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("mount flags {flags} do not fit the host flag width"),
            )
        })?;
        let data = options
            .map(CString::new)
            .transpose()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        mount(
            source,
            &target,
            driver,
            RustixMountFlags::from_bits_retain(bits),
            data.as_deref(),
        )?;

        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn mount(
        &mut self,
        _source: &str,
        _path: &str,
        _driver: &str,
        _flags: MountFlags,
        _options: Option<&str>,
    ) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mounting requires Linux",
        ))
    }

    #[cfg(target_os = "linux")]
    fn unmount(&mut self, mount: &ActiveMount, flags: UnmountFlags) -> io::Result<()> {
        use rustix::mount::{UnmountFlags as RustixUnmountFlags, unmount};

        let target = self.resolve(&mount.path)?;
        tracing::debug!(target = %target.display(), ?flags, "Unmounting filesystem");

        let mut rflags = RustixUnmountFlags::empty();
        if flags.force {
            rflags |= RustixUnmountFlags::FORCE;
        }
        if flags.detach {
            rflags |= RustixUnmountFlags::DETACH;
        }

        unmount(&target, rflags)?;
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn unmount(&mut self, _mount: &ActiveMount, _flags: UnmountFlags) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unmounting requires Linux",
        ))
    }

    fn make_dir(&mut self, path: &str, mode: u32) -> io::Result<()> {
        use rustix::fs::{Mode, RawMode, mkdir};

        let target = self.resolve(path)?;
        tracing::trace!(target = %target.display(), mode, "Creating directory");

        #[allow(clippy::cast_possible_truncation)]
        mkdir(&target, Mode::from_raw_mode(mode as RawMode))?;
        Ok(())
    }
}

impl ArchiveExtractor for HostVfs {
    fn extract(&mut self, path: &str, archive: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        let stats = automount_cpio::extract(&target, archive)?;
        tracing::debug!(
            target = %target.display(),
            directories = stats.directories,
            files = stats.files,
            symlinks = stats.symlinks,
            skipped = stats.skipped,
            "Extracted archive"
        );
        Ok(())
    }
}
