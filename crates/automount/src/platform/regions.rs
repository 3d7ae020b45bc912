//! Boot-time archive regions.

use std::fs::File;
use std::io;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use super::ArchiveRegions;

/// A byte region holding a cpio archive.
#[derive(Debug)]
pub enum Region {
    /// Data linked into the image.
    Static(&'static [u8]),
    /// A file mapped read-only.
    Mapped(Mmap),
    /// A heap buffer.
    Owned(Vec<u8>),
}

impl Region {
    /// Map `path` read-only.
    ///
    /// Empty files cannot be mapped and yield an empty owned region.
    pub fn map_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::Owned(Vec::new()));
        }

        // SAFETY: the mapping is read-only and the archive file is not
        // expected to change while the boot sequence runs.
        #[allow(unsafe_code)]
        let map = unsafe { Mmap::map(&file)? };

        tracing::debug!(path = %path.display(), len = map.len(), "Mapped archive region");
        Ok(Self::Mapped(map))
    }
}

impl Deref for Region {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Static(data) => data,
            Self::Mapped(map) => &map[..],
            Self::Owned(data) => data.as_slice(),
        }
    }
}

impl From<Vec<u8>> for Region {
    fn from(data: Vec<u8>) -> Self {
        Self::Owned(data)
    }
}

impl From<&'static [u8]> for Region {
    fn from(data: &'static [u8]) -> Self {
        Self::Static(data)
    }
}

#[cfg(feature = "embedded-initrd")]
static EMBEDDED_ARCHIVE: &[u8] = include_bytes!(env!("AUTOMOUNT_EINITRD_PATH"));

/// The archive regions handed over at boot.
#[derive(Debug, Default)]
pub struct BootRegions {
    initrd0: Option<Region>,
    embedded: Option<Region>,
}

impl BootRegions {
    /// No regions at all.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The regions built into this binary.
    ///
    /// Holds the embedded archive when the `embedded-initrd` feature is
    /// enabled, nothing otherwise.
    #[must_use]
    pub fn builtin() -> Self {
        #[cfg(feature = "embedded-initrd")]
        {
            Self::new().with_embedded(Region::Static(EMBEDDED_ARCHIVE))
        }
        #[cfg(not(feature = "embedded-initrd"))]
        {
            Self::new()
        }
    }

    /// Set the first initial ramdisk.
    #[must_use]
    pub fn with_initrd0(mut self, region: impl Into<Region>) -> Self {
        self.initrd0 = Some(region.into());
        self
    }

    /// Set the embedded archive.
    #[must_use]
    pub fn with_embedded(mut self, region: impl Into<Region>) -> Self {
        self.embedded = Some(region.into());
        self
    }
}

impl ArchiveRegions for BootRegions {
    fn initrd0(&self) -> Option<&[u8]> {
        self.initrd0.as_deref()
    }

    fn embedded(&self) -> Option<&[u8]> {
        self.embedded.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn map_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"070701").unwrap();

        let region = Region::map_file(file.path()).unwrap();
        assert!(matches!(region, Region::Mapped(_)));
        assert_eq!(&*region, b"070701");
    }

    #[test]
    fn map_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let region = Region::map_file(file.path()).unwrap();
        assert!(region.is_empty());
    }

    #[test]
    fn map_missing_file() {
        let err = Region::map_file("/nonexistent/initrd.cpio").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn regions_lookup() {
        let regions = BootRegions::new().with_initrd0(vec![1, 2, 3]);
        assert_eq!(regions.initrd0(), Some(&[1, 2, 3][..]));
        assert_eq!(regions.embedded(), None);
    }
}
