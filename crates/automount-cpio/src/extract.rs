//! Unpacking an archive below a directory.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::io::ErrorKind;
use std::path::Path;

use crate::decoder::{CpioDecoder, FileType};
use crate::error::{CpioError, CpioResult};

/// Counts of what an extraction produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    /// Directories created.
    pub directories: usize,
    /// Regular files written.
    pub files: usize,
    /// Symbolic links created.
    pub symlinks: usize,
    /// Entries of unsupported types that were skipped.
    pub skipped: usize,
}

/// Extract a newc archive below `dest`.
///
/// Entry names are relative to `dest`. A zero-length archive extracts
/// nothing. Absolute names, names containing `..` and names passing
/// through a symbolic link below `dest` are rejected before anything is
/// written for them. Device nodes, FIFOs and sockets are skipped.
pub fn extract(dest: &Path, archive: &[u8]) -> CpioResult<ExtractStats> {
    let mut stats = ExtractStats::default();
    if archive.is_empty() {
        return Ok(stats);
    }

    let mut decoder = CpioDecoder::new(archive);
    for entry in decoder.decode_entries() {
        let entry = entry?;
        let Some(relative) = entry_path(entry.name())? else {
            continue;
        };
        reject_links_in_path(dest, relative, entry.name())?;
        let target = dest.join(relative);
        let mode = u32::from(entry.metadata().permission_mode());

        if let Some(parent) = target.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match entry.metadata().file_type() {
            FileType::Dir => match DirBuilder::new().mode(mode).create(&target) {
                Ok(()) => stats.directories += 1,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err.into()),
            },
            FileType::File => {
                let mut file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(mode)
                    .open(&target)?;
                file.write_all(entry.data())?;
                // The process umask applies at open time
                fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
                stats.files += 1;
            }
            FileType::Link => {
                let link = std::str::from_utf8(entry.data()).map_err(|_| CpioError::Utf8)?;
                std::os::unix::fs::symlink(link, &target)?;
                stats.symlinks += 1;
            }
            other => {
                tracing::warn!(
                    name = entry.name(),
                    file_type = ?other,
                    "Skipping unsupported archive entry"
                );
                stats.skipped += 1;
            }
        }

        tracing::trace!(name = entry.name(), target = %target.display(), "Extracted entry");
    }

    tracing::debug!(dest = %dest.display(), ?stats, "Archive extracted");
    Ok(stats)
}

/// The path of an entry relative to the extraction directory, or `None`
/// for the archive root itself.
fn entry_path(name: &str) -> CpioResult<Option<&str>> {
    let mut relative = name;
    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest.trim_start_matches('/');
    }

    if relative.is_empty() || relative == "." {
        return Ok(None);
    }
    if relative.starts_with('/') || relative.split('/').any(|part| part == "..") {
        return Err(CpioError::UnsafeName(name.to_string()));
    }
    Ok(Some(relative))
}

/// Fail if any existing component of `relative` below `dest` is a
/// symbolic link, so no write follows a link planted by the archive.
fn reject_links_in_path(dest: &Path, relative: &str, name: &str) -> CpioResult<()> {
    let mut current = dest.to_path_buf();
    for component in relative.split('/').filter(|c| !c.is_empty() && *c != ".") {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(CpioError::UnsafeName(name.to_string()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_strips_dot_prefix() {
        assert_eq!(entry_path("./etc/passwd").unwrap(), Some("etc/passwd"));
        assert_eq!(entry_path("etc").unwrap(), Some("etc"));
        assert_eq!(entry_path(".hidden").unwrap(), Some(".hidden"));
    }

    #[test]
    fn entry_path_skips_root() {
        assert_eq!(entry_path(".").unwrap(), None);
        assert_eq!(entry_path("./").unwrap(), None);
    }

    #[test]
    fn entry_path_rejects_escapes() {
        for name in ["/etc/passwd", "../etc", "a/../../b", "./.."] {
            assert!(
                matches!(entry_path(name), Err(CpioError::UnsafeName(_))),
                "{name:?} should be rejected"
            );
        }
    }
}
