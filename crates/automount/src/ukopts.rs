//! Orchestrator-level mount options ("ukopts").
//!
//! These ride along in the last field of a table entry and are handled
//! here instead of being passed to the mount call.

use automount_common::AutomountResult;

use crate::mountpoint::make_mount_point;
use crate::platform::Vfs;
use crate::volume::Volume;

/// Separates options within the ukopts field.
pub const OPTION_SEPARATOR: char = ',';

/// One ukopt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedOption<'a> {
    /// `mkmp`: create the mount point and its parents.
    MakeMountPoint,
    /// Anything else, ignored.
    Unknown(&'a str),
}

impl<'a> ExtendedOption<'a> {
    /// Interpret one token.
    #[must_use]
    pub fn parse(token: &'a str) -> Self {
        match token {
            "mkmp" => Self::MakeMountPoint,
            other => Self::Unknown(other),
        }
    }
}

/// Split a ukopts field into options, left to right.
pub fn parse_extended_options(options: &str) -> impl Iterator<Item = ExtendedOption<'_>> {
    options.split(OPTION_SEPARATOR).map(ExtendedOption::parse)
}

/// Apply the ukopts of `volume`, stopping at the first failure.
pub fn process_extended_options<V: Vfs + ?Sized>(
    vfs: &mut V,
    volume: &Volume<'_>,
) -> AutomountResult<()> {
    let Some(options) = volume.extended_options else {
        return Ok(());
    };

    for option in parse_extended_options(options) {
        match option {
            ExtendedOption::MakeMountPoint => {
                if volume.is_root() {
                    continue;
                }
                make_mount_point(vfs, volume.path).inspect_err(|err| {
                    tracing::error!(path = volume.path, error = %err, "Failed to process ukopt mkmp");
                })?;
            }
            ExtendedOption::Unknown(token) => {
                if !token.is_empty() {
                    tracing::debug!(token, path = volume.path, "Ignoring unknown ukopt");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryVfs;
    use automount_common::AutomountError;

    #[test]
    fn parse_tokens() {
        let options: Vec<_> = parse_extended_options("foo,mkmp,,MKMP").collect();
        assert_eq!(
            options,
            [
                ExtendedOption::Unknown("foo"),
                ExtendedOption::MakeMountPoint,
                ExtendedOption::Unknown(""),
                ExtendedOption::Unknown("MKMP"),
            ]
        );
    }

    #[test]
    fn mkmp_creates_mount_point() {
        let mut vfs = MemoryVfs::new();
        let volume = Volume::new("", "/data/logs", "ramfs").with_extended_options("x,mkmp");
        process_extended_options(&mut vfs, &volume).unwrap();
        assert!(vfs.is_dir("/data/logs"));
    }

    #[test]
    fn mkmp_skips_root() {
        let mut vfs = MemoryVfs::new();
        let volume = Volume::new("", "/", "ramfs").with_extended_options("mkmp");
        process_extended_options(&mut vfs, &volume).unwrap();
        assert_eq!(vfs.dirs().count(), 1);
    }

    #[test]
    fn without_mkmp_nothing_is_created() {
        let mut vfs = MemoryVfs::new();
        let volume = Volume::new("", "/data", "ramfs").with_extended_options("ro");
        process_extended_options(&mut vfs, &volume).unwrap();
        assert!(!vfs.is_dir("/data"));
    }

    #[test]
    fn mkmp_failure_propagates() {
        let mut vfs = MemoryVfs::new();
        let volume = Volume::new("", "/a/../b", "ramfs").with_extended_options("mkmp");
        let err = process_extended_options(&mut vfs, &volume).unwrap_err();
        assert!(matches!(err, AutomountError::InvalidPath { .. }));
    }
}
