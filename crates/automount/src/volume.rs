//! Volume descriptors.

use std::fmt;

use automount_common::MountFlags;
use serde::Serialize;

/// Driver name meaning "extract an archive into the path" rather than
/// mounting a device.
pub const EXTRACT_DRIVER: &str = "extract";

/// Extract source naming the first initial ramdisk handed over by the
/// boot loader.
pub const INITRD0_SOURCE: &str = "initrd0";

/// Extract source naming the archive compiled into the image.
pub const EMBEDDED_SOURCE: &str = "embedded";

/// The root mount point.
pub const ROOT_PATH: &str = "/";

/// One mount request.
///
/// Descriptors borrow from the table entry or configuration they were
/// built from and are consumed by the mounter right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Volume<'a> {
    /// Where the data comes from; empty means none.
    pub source: &'a str,
    /// Absolute mount point.
    pub path: &'a str,
    /// Filesystem driver, or [`EXTRACT_DRIVER`].
    pub driver: &'a str,
    /// Flags handed to the mount primitive.
    pub flags: MountFlags,
    /// Options handed to the mount primitive as-is.
    pub options: Option<&'a str>,
    /// Comma-separated ukopts interpreted by the orchestrator itself.
    pub extended_options: Option<&'a str>,
}

impl<'a> Volume<'a> {
    /// Create a descriptor without flags or options.
    #[must_use]
    pub const fn new(source: &'a str, path: &'a str, driver: &'a str) -> Self {
        Self {
            source,
            path,
            driver,
            flags: MountFlags::empty(),
            options: None,
            extended_options: None,
        }
    }

    /// Set the mount flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: MountFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the mount options; an empty string means none.
    #[must_use]
    pub fn with_options(mut self, options: &'a str) -> Self {
        self.options = (!options.is_empty()).then_some(options);
        self
    }

    /// Set the ukopts; an empty string means none.
    #[must_use]
    pub fn with_extended_options(mut self, extended_options: &'a str) -> Self {
        self.extended_options = (!extended_options.is_empty()).then_some(extended_options);
        self
    }

    /// Whether this descriptor populates a path from an archive.
    #[must_use]
    pub fn is_extract(&self) -> bool {
        self.driver == EXTRACT_DRIVER
    }

    /// Whether the mount point is the root directory.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path == ROOT_PATH
    }

    /// The source for log lines and error messages.
    #[must_use]
    pub fn source_display(&self) -> &'a str {
        if self.source.is_empty() {
            "none"
        } else {
            self.source
        }
    }
}

impl fmt::Display for Volume<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}",
            self.source_display(),
            self.path,
            self.driver,
            self.flags,
            self.options.unwrap_or(""),
            self.extended_options.unwrap_or("")
        )
    }
}
