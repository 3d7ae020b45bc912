//! Automount configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [root]
//! driver = "ramfs"
//! archive = "initrd"
//!
//! [fstab]
//! entries = ["none:/tmp:ramfs:0::mkmp"]
//! ```

use std::path::Path;

use automount_common::{AutomountError, AutomountResult, MountFlags};
use serde::{Deserialize, Serialize};

use crate::fstab::FstabTable;
use crate::volume::{EMBEDDED_SOURCE, EXTRACT_DRIVER, INITRD0_SOURCE, ROOT_PATH, Volume};

/// Driver the root is forced to when it is populated from an archive.
pub const ARCHIVE_ROOT_DRIVER: &str = "ramfs";

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutomountConfig {
    /// The implicit root volume.
    pub root: RootConfig,
    /// The fstab table.
    pub fstab: FstabConfig,
}

/// Where the root filesystem contents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootArchive {
    /// The first initial ramdisk.
    Initrd,
    /// The archive built into the image.
    Embedded,
}

impl RootArchive {
    /// Extract source naming this archive.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::Initrd => INITRD0_SOURCE,
            Self::Embedded => EMBEDDED_SOURCE,
        }
    }
}

/// The implicit root volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RootConfig {
    /// Mount the root at all.
    pub enabled: bool,
    /// Root source.
    pub device: String,
    /// Root filesystem driver; empty skips the root mount.
    pub driver: String,
    /// Root mount flags.
    pub flags: MountFlags,
    /// Root mount options.
    pub options: String,
    /// Populate the root from an archive after mounting it.
    pub archive: Option<RootArchive>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device: String::new(),
            driver: String::new(),
            flags: MountFlags::empty(),
            options: String::new(),
            archive: None,
        }
    }
}

impl RootConfig {
    /// The driver actually used for the root mount.
    #[must_use]
    pub fn effective_driver(&self) -> &str {
        if self.archive.is_some() {
            ARCHIVE_ROOT_DRIVER
        } else {
            &self.driver
        }
    }

    /// The root volume.
    #[must_use]
    pub fn volume(&self) -> Volume<'_> {
        Volume::new(&self.device, ROOT_PATH, self.effective_driver())
            .with_flags(self.flags)
            .with_options(&self.options)
    }

    /// The volume populating the root, if an archive is configured.
    #[must_use]
    pub fn archive_volume(&self) -> Option<Volume<'static>> {
        self.archive
            .map(|archive| Volume::new(archive.source(), ROOT_PATH, EXTRACT_DRIVER))
    }
}

/// The fstab table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FstabConfig {
    /// Mount the table at all.
    pub enabled: bool,
    /// Number of table slots.
    pub capacity: usize,
    /// Raw entries, in mount order.
    pub entries: Vec<String>,
}

impl Default for FstabConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: FstabTable::DEFAULT_CAPACITY,
            entries: Vec::new(),
        }
    }
}

impl FstabConfig {
    /// Build the table.
    pub fn table(&self) -> AutomountResult<FstabTable> {
        FstabTable::with_entries(self.capacity, self.entries.iter().cloned())
    }
}

impl AutomountConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> AutomountResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text).map_err(|err| match err {
            AutomountError::Config { message } => AutomountError::Config {
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            entries = config.fstab.entries.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load `path`, or use the defaults when it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> AutomountResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> AutomountResult<Self> {
        let config: Self = toml::from_str(text).map_err(|err| AutomountError::Config {
            message: err.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the table fits its capacity.
    pub fn validate(&self) -> AutomountResult<()> {
        if self.fstab.entries.len() > self.fstab.capacity {
            return Err(AutomountError::Config {
                message: format!(
                    "{} fstab entries exceed the table capacity of {}",
                    self.fstab.entries.len(),
                    self.fstab.capacity
                ),
            });
        }
        Ok(())
    }

    /// Set the root driver.
    #[must_use]
    pub fn with_root_driver(mut self, driver: impl Into<String>) -> Self {
        self.root.driver = driver.into();
        self
    }

    /// Set the root source.
    #[must_use]
    pub fn with_root_device(mut self, device: impl Into<String>) -> Self {
        self.root.device = device.into();
        self
    }

    /// Set the root mount flags.
    #[must_use]
    pub const fn with_root_flags(mut self, flags: MountFlags) -> Self {
        self.root.flags = flags;
        self
    }

    /// Set the root mount options.
    #[must_use]
    pub fn with_root_options(mut self, options: impl Into<String>) -> Self {
        self.root.options = options.into();
        self
    }

    /// Populate the root from `archive`.
    #[must_use]
    pub const fn with_root_archive(mut self, archive: RootArchive) -> Self {
        self.root.archive = Some(archive);
        self
    }

    /// Skip the implicit root mount.
    #[must_use]
    pub const fn without_root(mut self) -> Self {
        self.root.enabled = false;
        self
    }

    /// Skip the fstab table.
    #[must_use]
    pub const fn without_fstab(mut self) -> Self {
        self.fstab.enabled = false;
        self
    }

    /// Set the number of table slots.
    #[must_use]
    pub const fn with_fstab_capacity(mut self, capacity: usize) -> Self {
        self.fstab.capacity = capacity;
        self
    }

    /// Append a table entry.
    ///
    /// The entry is parsed at boot, only the capacity is checked here.
    pub fn with_fstab_entry(mut self, entry: impl Into<String>) -> AutomountResult<Self> {
        if self.fstab.entries.len() >= self.fstab.capacity {
            return Err(AutomountError::Config {
                message: format!("fstab table is full ({} entries)", self.fstab.capacity),
            });
        }
        self.fstab.entries.push(entry.into());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AutomountConfig::default();
        assert!(config.root.enabled);
        assert_eq!(config.root.driver, "");
        assert!(config.fstab.enabled);
        assert_eq!(config.fstab.capacity, 32);
        assert!(config.root.archive_volume().is_none());
    }

    #[test]
    fn parse_full_file() {
        let config = AutomountConfig::from_toml_str(
            r#"
            [root]
            device = "rootfs"
            driver = "9pfs"
            flags = "0x10"
            options = "trans=virtio"

            [fstab]
            capacity = 4
            entries = ["none:/tmp:ramfs:0::mkmp"]
            "#,
        )
        .unwrap();

        assert_eq!(config.root.flags.bits(), 0x10);
        let volume = config.root.volume();
        assert_eq!(volume.source, "rootfs");
        assert_eq!(volume.driver, "9pfs");
        assert_eq!(volume.options, Some("trans=virtio"));
        assert_eq!(config.fstab.table().unwrap().capacity(), 4);
    }

    #[test]
    fn integer_flags() {
        let config = AutomountConfig::from_toml_str("[root]\nflags = 4096\n").unwrap();
        assert_eq!(config.root.flags.bits(), 4096);
    }

    #[test]
    fn archive_forces_ramfs() {
        let config = AutomountConfig::from_toml_str(
            "[root]\ndriver = \"9pfs\"\narchive = \"embedded\"\n",
        )
        .unwrap();

        assert_eq!(config.root.effective_driver(), ARCHIVE_ROOT_DRIVER);
        let archive = config.root.archive_volume().unwrap();
        assert_eq!(archive.source, EMBEDDED_SOURCE);
        assert!(archive.is_extract());
        assert!(archive.is_root());
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = AutomountConfig::from_toml_str("[root]\nfstype = \"ramfs\"\n").unwrap_err();
        assert!(matches!(err, AutomountError::Config { .. }));
    }

    #[test]
    fn rejects_invalid_flags() {
        let err = AutomountConfig::from_toml_str("[root]\nflags = \"ro\"\n").unwrap_err();
        assert!(matches!(err, AutomountError::Config { .. }));
    }

    #[test]
    fn rejects_overfull_table() {
        let err = AutomountConfig::from_toml_str(
            "[fstab]\ncapacity = 1\nentries = [\":/a:ramfs\", \":/b:ramfs\"]\n",
        )
        .unwrap_err();
        assert!(matches!(err, AutomountError::Config { .. }));
    }

    #[test]
    fn builder_pattern() {
        let config = AutomountConfig::default()
            .with_root_driver("ramfs")
            .with_root_archive(RootArchive::Initrd)
            .with_fstab_capacity(1)
            .with_fstab_entry(":/tmp:ramfs")
            .unwrap();

        assert_eq!(config.root.archive, Some(RootArchive::Initrd));
        assert!(config.clone().with_fstab_entry(":/b:ramfs").is_err());
        assert!(!config.without_root().root.enabled);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = AutomountConfig::load_or_default(temp.path().join("automount.toml")).unwrap();
        assert_eq!(config, AutomountConfig::default());
    }
}
