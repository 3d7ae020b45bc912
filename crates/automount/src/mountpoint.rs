//! Mount point creation.

use std::io;

use automount_common::{AutomountError, AutomountResult};

use crate::platform::Vfs;

/// Permission bits of created mount points.
pub const MOUNT_POINT_MODE: u32 = 0o700;

/// Create every missing directory of the absolute path `path`.
///
/// Each prefix ending at a `/` boundary is created in turn. A segment that
/// is exactly `.` or `..` fails the whole call, leaving the directories
/// created so far in place. Runs of `/` are treated as one.
pub fn make_mount_point<V: Vfs + ?Sized>(vfs: &mut V, path: &str) -> AutomountResult<()> {
    tracing::debug!(path, "Creating mount point");

    let mut start = 0;
    while start < path.len() {
        let end = path[start..]
            .find('/')
            .map_or(path.len(), |offset| start + offset);
        let segment = &path[start..end];

        if segment == "." || segment == ".." {
            tracing::error!(path, segment, "Refusing path traversal segment");
            return Err(AutomountError::InvalidPath {
                path: path.to_string(),
                reason: "'.' and '..' segments are not allowed",
            });
        }

        if !segment.is_empty() {
            let prefix = &path[..end];
            match vfs.make_dir(prefix, MOUNT_POINT_MODE) {
                Ok(()) => tracing::trace!(path = prefix, "Created directory"),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => {
                    tracing::error!(path = prefix, error = %err, "Failed to create directory");
                    return Err(AutomountError::DirectoryCreate {
                        path: prefix.to_string(),
                        source: err,
                    });
                }
            }
        }

        start = end + 1;
    }

    Ok(())
}
