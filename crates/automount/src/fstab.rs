//! The fstab table and its entry format.
//!
//! Each table slot holds one entry:
//!
//! ```text
//! <source>:<mountpoint>:<driver>[:<flags>[:<options>[:<ukopts>]]]
//! ```
//!
//! Only the mount point and the driver are mandatory. A field is absent
//! when it is empty or when the entry ends before it.

use automount_common::{AutomountError, AutomountResult, MountFlags};

use crate::volume::Volume;

/// Separates the fields of an entry.
pub const FIELD_SEPARATOR: char = ':';

/// Parse one table entry into a descriptor.
///
/// The descriptor borrows from `entry`. Text after the sixth field is
/// ignored.
pub fn parse_volume(entry: &str) -> AutomountResult<Volume<'_>> {
    let mut fields = entry
        .split(FIELD_SEPARATOR)
        .map(|field| (!field.is_empty()).then_some(field));
    let mut next = || fields.next().flatten();

    let source = next();
    let path = next();
    let driver = next();
    let flags = next();
    let options = next();
    let extended_options = next();

    let (Some(path), Some(driver)) = (path, driver) else {
        tracing::error!(entry, "Incomplete entry: require mountpoint and filesystem driver");
        return Err(AutomountError::IncompleteEntry {
            entry: entry.to_string(),
        });
    };

    if !path.starts_with('/') {
        tracing::error!(path, "Mountpoint is not absolute");
        return Err(AutomountError::InvalidPath {
            path: path.to_string(),
            reason: "mount point is not absolute",
        });
    }

    let volume = Volume {
        source: source.unwrap_or(""),
        path,
        driver,
        flags: flags.map_or(Ok(MountFlags::empty()), MountFlags::parse)?,
        options,
        extended_options,
    };

    tracing::debug!(%volume, "Parsed fstab entry");
    Ok(volume)
}

/// A fixed-capacity table of raw entries.
///
/// Iteration stops at the first empty slot, so entries placed after a
/// hole are never mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstabTable {
    slots: Vec<Option<String>>,
}

impl FstabTable {
    /// Default number of slots.
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Create an empty table with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Create a table holding `entries` in order.
    pub fn with_entries<I, S>(capacity: usize, entries: I) -> AutomountResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(capacity);
        for entry in entries {
            table.push(entry)?;
        }
        Ok(table)
    }

    /// Put `entry` in the first empty slot.
    pub fn push(&mut self, entry: impl Into<String>) -> AutomountResult<()> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or_else(|| AutomountError::Config {
                message: format!("fstab table is full ({capacity} entries)"),
            })?;
        *slot = Some(entry.into());
        Ok(())
    }

    /// Overwrite slot `index`.
    pub fn set(&mut self, index: usize, entry: Option<String>) -> AutomountResult<()> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| AutomountError::Config {
                message: format!("fstab slot {index} is out of range (capacity {capacity})"),
            })?;
        *slot = entry;
        Ok(())
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The entries that will be mounted, in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map_while(Option::as_deref)
    }

    /// Number of entries that will be mounted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no entry will be mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FstabTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
