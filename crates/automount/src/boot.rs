//! The boot sequence.

use std::fmt;

use automount_common::AutomountResult;
use serde::Serialize;

use crate::config::AutomountConfig;
use crate::fstab::parse_volume;
use crate::mounter::VolumeMounter;
use crate::platform::{ArchiveRegions, Platform};
use crate::registry::MountRegistry;

/// Progress of the boot sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootState {
    /// Nothing done yet.
    #[default]
    Init,
    /// The root volume is mounted, or was skipped.
    RootMounted,
    /// The root is populated from its archive, or has none.
    RootPopulated,
    /// Every table entry is mounted.
    TableMounted,
    /// The sequence completed.
    Done,
    /// A step failed; nothing further was attempted.
    Failed,
}

impl fmt::Display for BootState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::RootMounted => "root-mounted",
            Self::RootPopulated => "root-populated",
            Self::TableMounted => "table-mounted",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs root mount, root population and the fstab table, in that order.
///
/// The first error stops the sequence and moves it to
/// [`BootState::Failed`]. Mounts done before the failure stay in the
/// registry.
pub struct BootSequencer<'a, P: ?Sized, R: ?Sized> {
    config: &'a AutomountConfig,
    platform: &'a mut P,
    regions: &'a R,
    registry: &'a mut MountRegistry,
    state: BootState,
}

impl<'a, P, R> BootSequencer<'a, P, R>
where
    P: Platform + ?Sized,
    R: ArchiveRegions + ?Sized,
{
    /// Create a sequencer in [`BootState::Init`].
    pub fn new(
        config: &'a AutomountConfig,
        platform: &'a mut P,
        regions: &'a R,
        registry: &'a mut MountRegistry,
    ) -> Self {
        Self {
            config,
            platform,
            regions,
            registry,
            state: BootState::Init,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BootState {
        self.state
    }

    /// Run the whole sequence.
    pub fn run(&mut self) -> AutomountResult<()> {
        let result = self.run_steps();
        if result.is_err() {
            self.state = BootState::Failed;
        }
        result
    }

    fn run_steps(&mut self) -> AutomountResult<()> {
        self.mount_root()?;
        self.state = BootState::RootMounted;

        self.populate_root()?;
        self.state = BootState::RootPopulated;

        self.mount_table()?;
        self.state = BootState::TableMounted;

        tracing::info!(mounts = self.registry.len(), "Boot sequence finished");
        self.state = BootState::Done;
        Ok(())
    }

    fn mounter(&mut self) -> VolumeMounter<'_, P, R> {
        VolumeMounter::new(&mut *self.platform, self.regions, &mut *self.registry)
    }

    fn mount_root(&mut self) -> AutomountResult<()> {
        let config = self.config;
        let root = &config.root;
        if !root.enabled {
            tracing::debug!("Root mount disabled");
            return Ok(());
        }

        let volume = root.volume();
        if volume.driver.is_empty() {
            tracing::debug!("No root filesystem driver, skipping root mount");
            return Ok(());
        }

        tracing::info!(
            source = volume.source_display(),
            driver = volume.driver,
            "Mounting root filesystem"
        );
        self.mounter().mount(&volume).inspect_err(|err| {
            tracing::error!(error = %err, "critical: failed to mount root filesystem");
        })
    }

    fn populate_root(&mut self) -> AutomountResult<()> {
        let config = self.config;
        if !config.root.enabled {
            return Ok(());
        }
        let Some(volume) = config.root.archive_volume() else {
            return Ok(());
        };

        self.mounter().mount(&volume).inspect_err(|err| {
            tracing::error!(error = %err, "critical: failed to populate root filesystem");
        })
    }

    fn mount_table(&mut self) -> AutomountResult<()> {
        let config = self.config;
        let fstab = &config.fstab;
        if !fstab.enabled {
            tracing::debug!("fstab disabled");
            return Ok(());
        }

        let table = fstab.table()?;
        tracing::info!(entries = table.len(), "Mounting fstab entries");

        for entry in table.iter() {
            let volume = parse_volume(entry)?;
            self.mounter().mount(&volume)?;
        }

        Ok(())
    }
}
