//! Unmounting everything at shutdown.

use automount_common::AutomountError;
use serde::Serialize;

use crate::platform::{UnmountFlags, Vfs};
use crate::registry::MountRegistry;

/// Outcome of a shutdown sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownSummary {
    /// Filesystems unmounted.
    pub unmounted: usize,
    /// Filesystems that stayed mounted.
    pub failed: usize,
}

/// Unmount every registry entry, newest first.
///
/// Failures are logged and skipped. Unmounted entries leave the registry;
/// the ones that failed stay, in their original order.
pub fn unmount_all<V: Vfs + ?Sized>(vfs: &mut V, registry: &mut MountRegistry) -> ShutdownSummary {
    let mounts = registry.take();
    let mut summary = ShutdownSummary::default();
    let mut remaining = Vec::new();

    for mount in mounts.into_iter().rev() {
        match vfs.unmount(&mount, UnmountFlags::empty()) {
            Ok(()) => {
                tracing::debug!(path = %mount.path, driver = %mount.driver, "Unmounted");
                summary.unmounted += 1;
            }
            Err(err) => {
                let err = AutomountError::Unmount {
                    path: mount.path.clone(),
                    source: err,
                };
                tracing::error!(error = %err, "Failed to unmount");
                summary.failed += 1;
                remaining.push(mount);
            }
        }
    }

    remaining.reverse();
    registry.extend(remaining);

    tracing::info!(
        unmounted = summary.unmounted,
        failed = summary.failed,
        "Shutdown sequence finished"
    );
    summary
}
