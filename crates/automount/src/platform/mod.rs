//! Platform collaborators.
//!
//! The orchestrator never touches a filesystem directly. It goes through
//! these traits:
//! - [`Vfs`]: mount, unmount and directory creation
//! - [`ArchiveExtractor`]: unpacking an archive below a mounted path
//! - [`ArchiveRegions`]: locating the initial ramdisk and embedded archive
//!
//! [`HostVfs`] implements them on Linux, [`MemoryVfs`] in memory.

mod host;
mod memory;
mod regions;

use std::io;

use automount_common::MountFlags;

use crate::registry::ActiveMount;

pub use host::HostVfs;
pub use memory::MemoryVfs;
pub use regions::{BootRegions, Region};

/// Unmount flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmountFlags {
    /// Force unmount.
    pub force: bool,
    /// Lazy unmount (detach).
    pub detach: bool,
}

impl UnmountFlags {
    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            force: false,
            detach: false,
        }
    }
}

/// Mount, unmount and directory creation.
pub trait Vfs {
    /// Mount `source` at `path` with filesystem `driver`.
    fn mount(
        &mut self,
        source: &str,
        path: &str,
        driver: &str,
        flags: MountFlags,
        options: Option<&str>,
    ) -> io::Result<()>;

    /// Unmount an active mount.
    fn unmount(&mut self, mount: &ActiveMount, flags: UnmountFlags) -> io::Result<()>;

    /// Create one directory with permission bits `mode`.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] when `path` exists.
    fn make_dir(&mut self, path: &str, mode: u32) -> io::Result<()>;
}

/// Unpacks cpio archives.
pub trait ArchiveExtractor {
    /// Extract `archive` below the already mounted directory `path`.
    fn extract(&mut self, path: &str, archive: &[u8]) -> io::Result<()>;
}

/// Locates boot-time archive regions.
pub trait ArchiveRegions {
    /// The first initial ramdisk, if the boot loader handed one over.
    fn initrd0(&self) -> Option<&[u8]>;

    /// The archive compiled into the image, if any.
    fn embedded(&self) -> Option<&[u8]>;
}

/// Everything the mounter needs from the platform.
pub trait Platform: Vfs + ArchiveExtractor {}

impl<T: Vfs + ArchiveExtractor + ?Sized> Platform for T {}

impl<T: Vfs + ?Sized> Vfs for &mut T {
    fn mount(
        &mut self,
        source: &str,
        path: &str,
        driver: &str,
        flags: MountFlags,
        options: Option<&str>,
    ) -> io::Result<()> {
        (**self).mount(source, path, driver, flags, options)
    }

    fn unmount(&mut self, mount: &ActiveMount, flags: UnmountFlags) -> io::Result<()> {
        (**self).unmount(mount, flags)
    }

    fn make_dir(&mut self, path: &str, mode: u32) -> io::Result<()> {
        (**self).make_dir(path, mode)
    }
}

impl<T: ArchiveExtractor + ?Sized> ArchiveExtractor for &mut T {
    fn extract(&mut self, path: &str, archive: &[u8]) -> io::Result<()> {
        (**self).extract(path, archive)
    }
}

impl<T: ArchiveRegions + ?Sized> ArchiveRegions for &T {
    fn initrd0(&self) -> Option<&[u8]> {
        (**self).initrd0()
    }

    fn embedded(&self) -> Option<&[u8]> {
        (**self).embedded()
    }
}
