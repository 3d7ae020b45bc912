//! Common error types for the automount workspace.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`AutomountError`].
pub type AutomountResult<T> = Result<T, AutomountError>;

/// Errors raised while parsing, mounting and unmounting volumes.
#[derive(Error, Diagnostic, Debug)]
pub enum AutomountError {
    /// A table entry lacks the mount point or the filesystem driver.
    #[error("Incomplete entry \"{entry}\": mount point and filesystem driver are required")]
    #[diagnostic(
        code(automount::fstab::incomplete),
        help("Entries use the form source:path:driver[:flags[:options[:ukopts]]]")
    )]
    IncompleteEntry {
        /// The raw entry.
        entry: String,
    },

    /// A mount point is not absolute or contains a `.`/`..` segment.
    #[error("Invalid mount point \"{path}\": {reason}")]
    #[diagnostic(code(automount::path::invalid))]
    InvalidPath {
        /// The offending path.
        path: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The flags field is not an integer literal.
    #[error("Invalid mount flags: {value}")]
    #[diagnostic(
        code(automount::fstab::invalid_flags),
        help("Use a decimal, octal (leading 0) or hexadecimal (0x) integer, e.g. '0x1'")
    )]
    InvalidFlags {
        /// The invalid literal.
        value: String,
    },

    /// The extract driver was given a source it does not know about.
    #[error("\"{device}\" is an invalid or unsupported initrd source")]
    #[diagnostic(
        code(automount::extract::unsupported_source),
        help("The extract driver accepts 'initrd0' or 'embedded'")
    )]
    UnsupportedSource {
        /// The source name.
        device: String,
    },

    /// No memory region backs the requested archive source.
    #[error("Could not find an archive region for \"{device}\"")]
    #[diagnostic(code(automount::extract::not_found))]
    RegionNotFound {
        /// The source name.
        device: String,
    },

    /// Archive extraction failed.
    #[error("Failed to extract {device} to {path}: {source}")]
    #[diagnostic(code(automount::extract::failed))]
    Extraction {
        /// The archive source name.
        device: String,
        /// The target directory.
        path: String,
        /// The extractor's error.
        source: std::io::Error,
    },

    /// The underlying mount call failed.
    #[error("Failed to mount {device} ({driver}) at {path}: {source}")]
    #[diagnostic(code(automount::mount::failed))]
    Mount {
        /// The mount source, `none` when empty.
        device: String,
        /// The mount point.
        path: String,
        /// The filesystem driver.
        driver: String,
        /// The mount error.
        source: std::io::Error,
    },

    /// Creating a mount point directory failed for a reason other than
    /// the directory already existing.
    #[error("Failed to create directory {path}: {source}")]
    #[diagnostic(code(automount::mkmp::failed))]
    DirectoryCreate {
        /// The directory being created.
        path: String,
        /// The creation error.
        source: std::io::Error,
    },

    /// The underlying unmount call failed.
    #[error("Failed to unmount {path}: {source}")]
    #[diagnostic(code(automount::unmount::failed))]
    Unmount {
        /// The mount point.
        path: String,
        /// The unmount error.
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(automount::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(automount::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(automount::serialization))]
    Serialization(String),

    /// Feature not supported on this platform.
    #[error("Feature not supported: {feature}")]
    #[diagnostic(
        code(automount::unsupported),
        help("Mounting through the host backend requires Linux")
    )]
    Unsupported {
        /// The unsupported feature.
        feature: String,
    },
}

impl AutomountError {
    /// The positive errno reported to the boot orchestrator for this error.
    ///
    /// Errors wrapping an OS error report its raw code when there is one.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::IncompleteEntry { .. }
            | Self::InvalidPath { .. }
            | Self::InvalidFlags { .. }
            | Self::UnsupportedSource { .. }
            | Self::Config { .. }
            | Self::Serialization(_) => libc::EINVAL,
            Self::RegionNotFound { .. } => libc::ENOENT,
            Self::Extraction { .. } => libc::EIO,
            Self::Mount { source, .. }
            | Self::DirectoryCreate { source, .. }
            | Self::Unmount { source, .. }
            | Self::Io(source) => source.raw_os_error().unwrap_or(libc::EIO),
            Self::Unsupported { .. } => libc::ENOTSUP,
        }
    }
}

impl From<serde_json::Error> for AutomountError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AutomountError::IncompleteEntry {
            entry: "dev0:/mnt".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incomplete entry \"dev0:/mnt\": mount point and filesystem driver are required"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AutomountError = io_err.into();
        assert!(matches!(err, AutomountError::Io(_)));
    }

    #[test]
    fn errno_mapping() {
        let invalid = AutomountError::InvalidPath {
            path: "mnt".to_string(),
            reason: "not absolute",
        };
        assert_eq!(invalid.errno(), libc::EINVAL);

        let missing = AutomountError::RegionNotFound {
            device: "initrd0".to_string(),
        };
        assert_eq!(missing.errno(), libc::ENOENT);

        let mount = AutomountError::Mount {
            device: "none".to_string(),
            path: "/".to_string(),
            driver: "ramfs".to_string(),
            source: std::io::Error::from_raw_os_error(libc::ENODEV),
        };
        assert_eq!(mount.errno(), libc::ENODEV);

        let extract = AutomountError::Extraction {
            device: "embedded".to_string(),
            path: "/".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad magic"),
        };
        assert_eq!(extract.errno(), libc::EIO);
    }
}
