//! Dispatching one volume to a mount or an archive extraction.

use automount_common::{AutomountError, AutomountResult};

use crate::platform::{ArchiveRegions, Platform};
use crate::registry::{ActiveMount, MountRegistry};
use crate::ukopts::process_extended_options;
use crate::volume::{EMBEDDED_SOURCE, INITRD0_SOURCE, Volume};

/// Mounts volumes and records the successful mounts.
pub struct VolumeMounter<'a, P: ?Sized, R: ?Sized> {
    platform: &'a mut P,
    regions: &'a R,
    registry: &'a mut MountRegistry,
}

impl<'a, P, R> VolumeMounter<'a, P, R>
where
    P: Platform + ?Sized,
    R: ArchiveRegions + ?Sized,
{
    /// Create a mounter over a platform, its archive regions and the
    /// registry receiving active mounts.
    pub fn new(platform: &'a mut P, regions: &'a R, registry: &'a mut MountRegistry) -> Self {
        Self {
            platform,
            regions,
            registry,
        }
    }

    /// Mount `volume`.
    ///
    /// Ukopts are applied first. Volumes using the extract driver populate
    /// their path from an archive region and are not recorded.
    pub fn mount(&mut self, volume: &Volume<'_>) -> AutomountResult<()> {
        process_extended_options(&mut *self.platform, volume)?;

        if volume.is_extract() {
            return self.extract(volume);
        }

        self.platform
            .mount(
                volume.source,
                volume.path,
                volume.driver,
                volume.flags,
                volume.options,
            )
            .map_err(|err| {
                tracing::error!(
                    source = volume.source_display(),
                    path = volume.path,
                    driver = volume.driver,
                    error = %err,
                    "Failed to mount"
                );
                AutomountError::Mount {
                    device: volume.source_display().to_string(),
                    path: volume.path.to_string(),
                    driver: volume.driver.to_string(),
                    source: err,
                }
            })?;

        tracing::debug!(%volume, "Mounted volume");
        self.registry.push(ActiveMount::from(volume));
        Ok(())
    }

    fn extract(&mut self, volume: &Volume<'_>) -> AutomountResult<()> {
        let regions = self.regions;
        let region = match volume.source {
            INITRD0_SOURCE => regions.initrd0(),
            EMBEDDED_SOURCE => regions.embedded(),
            other => {
                tracing::error!(source = other, "Invalid or unsupported initrd source");
                return Err(AutomountError::UnsupportedSource {
                    device: other.to_string(),
                });
            }
        };

        let Some(region) = region else {
            tracing::error!(source = volume.source, "Could not find an archive region");
            return Err(AutomountError::RegionNotFound {
                device: volume.source.to_string(),
            });
        };

        if region.is_empty() {
            tracing::warn!(source = volume.source, "Archive region is empty");
        }

        tracing::info!(
            source = volume.source,
            len = region.len(),
            path = volume.path,
            "Extracting archive"
        );

        self.platform
            .extract(volume.path, region)
            .map_err(|err| {
                tracing::error!(
                    source = volume.source,
                    path = volume.path,
                    error = %err,
                    "Failed to extract archive"
                );
                AutomountError::Extraction {
                    device: volume.source.to_string(),
                    path: volume.path.to_string(),
                    source: err,
                }
            })
    }
}
