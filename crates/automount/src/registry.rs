//! The list of active mounts and its state file.

use std::path::Path;

use automount_common::AutomountResult;
use serde::{Deserialize, Serialize};

use crate::volume::Volume;

/// A filesystem mounted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMount {
    /// Mount source; empty when none.
    pub source: String,
    /// Mount point.
    pub path: String,
    /// Filesystem driver.
    pub driver: String,
}

impl ActiveMount {
    /// Create a record.
    pub fn new(
        source: impl Into<String>,
        path: impl Into<String>,
        driver: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            driver: driver.into(),
        }
    }
}

impl From<&Volume<'_>> for ActiveMount {
    fn from(volume: &Volume<'_>) -> Self {
        Self::new(volume.source, volume.path, volume.driver)
    }
}

/// Active mounts in mount order.
///
/// Appended to by the mounter, drained in reverse by the shutdown
/// sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRegistry {
    mounts: Vec<ActiveMount>,
}

impl MountRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful mount.
    pub fn push(&mut self, mount: ActiveMount) {
        self.mounts.push(mount);
    }

    /// Active mounts, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, ActiveMount> {
        self.mounts.iter()
    }

    /// Number of active mounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Whether nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Remove and return every record, oldest first.
    pub fn take(&mut self) -> Vec<ActiveMount> {
        std::mem::take(&mut self.mounts)
    }

    /// Load a registry saved by [`Self::save_to`].
    ///
    /// A missing file means nothing is mounted.
    pub fn load_from(path: impl AsRef<Path>) -> AutomountResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No mount state, starting empty");
            return Ok(Self::new());
        }

        let json = std::fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&json)?;

        tracing::debug!(
            path = %path.display(),
            mounts = registry.len(),
            "Loaded mount state"
        );

        Ok(registry)
    }

    /// Save the registry as JSON, creating the parent directory.
    pub fn save_to(&self, path: impl AsRef<Path>) -> AutomountResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        tracing::debug!(
            path = %path.display(),
            mounts = self.len(),
            "Saved mount state"
        );

        Ok(())
    }
}

impl Extend<ActiveMount> for MountRegistry {
    fn extend<I: IntoIterator<Item = ActiveMount>>(&mut self, iter: I) {
        self.mounts.extend(iter);
    }
}

impl FromIterator<ActiveMount> for MountRegistry {
    fn from_iter<I: IntoIterator<Item = ActiveMount>>(iter: I) -> Self {
        Self {
            mounts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MountRegistry {
    type Item = &'a ActiveMount;
    type IntoIter = std::slice::Iter<'a, ActiveMount>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("run/automount/mounts.json");

        let registry: MountRegistry = [
            ActiveMount::new("", "/", "ramfs"),
            ActiveMount::new("dev0", "/mnt", "ext2"),
        ]
        .into_iter()
        .collect();
        registry.save_to(&path).unwrap();

        let loaded = MountRegistry::load_from(&path).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn load_missing_state() {
        let temp = tempdir().unwrap();
        let registry = MountRegistry::load_from(temp.path().join("mounts.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn load_corrupt_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("mounts.json");
        std::fs::write(&path, "not json").unwrap();

        let err = MountRegistry::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            automount_common::AutomountError::Serialization(_)
        ));
    }

    #[test]
    fn record_from_volume() {
        let volume = Volume::new("", "/tmp", "ramfs");
        let mount = ActiveMount::from(&volume);
        assert_eq!(mount, ActiveMount::new("", "/tmp", "ramfs"));
    }
}
