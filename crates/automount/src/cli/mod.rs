//! CLI command definitions and handlers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};

use automount_common::AutomountPaths;

use crate::config::AutomountConfig;
use crate::fstab::parse_volume;
use crate::lifecycle::Automount;
use crate::platform::{BootRegions, HostVfs, MemoryVfs, Platform, Region};
use crate::registry::MountRegistry;
use crate::shutdown::unmount_all;

/// automount - boot-time volume mounting
#[derive(Parser)]
#[command(name = "automount")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Mount registry state file
    #[arg(long, global = true, env = "AUTOMOUNT_STATE")]
    pub state: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Automount commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Parse fstab entries and print the resulting volumes
    Parse {
        /// Entries of the form source:path:driver[:flags[:options[:ukopts]]]
        #[arg(required = true)]
        entries: Vec<String>,

        /// Print JSON instead of one line per volume
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file without mounting anything
    Check {
        /// Configuration file (default: /etc/automount.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run the boot sequence
    Up {
        /// Configuration file (default: /etc/automount.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resolve mount points below this directory
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// Initial ramdisk served as "initrd0"
        #[arg(long)]
        initrd: Option<PathBuf>,

        /// Archive served as "embedded"
        #[arg(long)]
        embedded: Option<PathBuf>,

        /// Additional fstab entries, mounted after the configured ones
        #[arg(long = "fstab")]
        fstab: Vec<String>,

        /// Mount into memory instead of the host, without saving state
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the shutdown sequence for the mounts in the state file
    Down {
        /// Resolve mount points below this directory
        #[arg(long)]
        prefix: Option<PathBuf>,
    },

    /// Extract a newc cpio archive into a directory
    Extract {
        /// Archive file
        archive: PathBuf,

        /// Target directory
        dir: PathBuf,
    },
}

impl Cli {
    /// The state file in use.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| AutomountPaths::new().state())
    }

    /// Execute the CLI command.
    pub fn execute(self) -> Result<()> {
        let state_path = self.state_path();

        match self.command {
            Commands::Parse { entries, json } => {
                let volumes = entries
                    .iter()
                    .map(|entry| parse_volume(entry))
                    .collect::<Result<Vec<_>, _>>()?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&volumes)?);
                } else {
                    for volume in &volumes {
                        println!("{volume}");
                    }
                }
                Ok(())
            }

            Commands::Check { config } => {
                let path = config.unwrap_or_else(|| AutomountPaths::new().config);
                let config = AutomountConfig::load(&path)
                    .map_err(|e| eyre!("Failed to load {}: {}", path.display(), e))?;

                if config.root.enabled {
                    let root = config.root.volume();
                    if !root.driver.is_empty() {
                        println!("root\t{root}");
                    }
                    if let Some(archive) = config.root.archive_volume() {
                        println!("root\t{archive}");
                    }
                }

                let table = config.fstab.table()?;
                for (index, entry) in table.iter().enumerate() {
                    let volume = parse_volume(entry)
                        .map_err(|e| eyre!("fstab entry {index} is invalid: {e}"))?;
                    println!("{index}\t{volume}");
                }

                println!("Configuration {} is valid", path.display());
                Ok(())
            }

            Commands::Up {
                config,
                prefix,
                initrd,
                embedded,
                fstab,
                dry_run,
            } => {
                let mut config = match config {
                    Some(path) => AutomountConfig::load(&path)
                        .map_err(|e| eyre!("Failed to load {}: {}", path.display(), e))?,
                    None => AutomountConfig::load_or_default(AutomountPaths::new().config)?,
                };
                for entry in fstab {
                    config = config.with_fstab_entry(entry)?;
                }

                let mut regions = BootRegions::builtin();
                if let Some(path) = initrd {
                    regions = regions.with_initrd0(map_region(&path)?);
                }
                if let Some(path) = embedded {
                    regions = regions.with_embedded(map_region(&path)?);
                }

                if dry_run {
                    let mut automount = Automount::new(config, MemoryVfs::new(), regions);
                    automount.boot()?;
                    println!("{}", serde_json::to_string_pretty(automount.registry())?);
                    return Ok(());
                }

                let existing = MountRegistry::load_from(&state_path)?;
                if !existing.is_empty() {
                    bail!(
                        "{} filesystems are already mounted according to {}; run `automount down` first",
                        existing.len(),
                        state_path.display()
                    );
                }

                let vfs = prefix.map_or_else(HostVfs::new, HostVfs::with_root);
                let mut automount = Automount::new(config, vfs, regions);
                boot_and_save(&mut automount, &state_path)
            }

            Commands::Down { prefix } => {
                let mut registry = MountRegistry::load_from(&state_path)?;
                let mut vfs = prefix.map_or_else(HostVfs::new, HostVfs::with_root);

                let summary = unmount_all(&mut vfs, &mut registry);
                registry.save_to(&state_path)?;

                println!("Unmounted {} filesystems", summary.unmounted);
                if summary.failed > 0 {
                    bail!(
                        "{} filesystems could not be unmounted and remain in {}",
                        summary.failed,
                        state_path.display()
                    );
                }
                Ok(())
            }

            Commands::Extract { archive, dir } => {
                let region = map_region(&archive)?;
                let stats = automount_cpio::extract(&dir, &region)
                    .wrap_err_with(|| format!("Failed to extract {}", archive.display()))?;

                println!(
                    "Extracted {} directories, {} files, {} symlinks into {} ({} skipped)",
                    stats.directories,
                    stats.files,
                    stats.symlinks,
                    dir.display(),
                    stats.skipped
                );
                Ok(())
            }
        }
    }
}

fn map_region(path: &Path) -> Result<Region> {
    Region::map_file(path).wrap_err_with(|| format!("Failed to map {}", path.display()))
}

/// Boot, then save the registry even if the boot failed part way.
fn boot_and_save<P: Platform>(automount: &mut Automount<P>, state_path: &Path) -> Result<()> {
    let result = automount.boot();
    automount.registry().save_to(state_path)?;

    match result {
        Ok(()) => {
            println!(
                "Mounted {} filesystems, state saved to {}",
                automount.registry().len(),
                state_path.display()
            );
            Ok(())
        }
        Err(err) => Err(eyre!(
            "Boot sequence failed in state {} (errno {}): {}",
            automount.state(),
            err.errno(),
            err
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_up_arguments() {
        let cli = Cli::try_parse_from([
            "automount",
            "--state",
            "/tmp/mounts.json",
            "up",
            "--dry-run",
            "--fstab",
            ":/a:ramfs",
            "--fstab",
            ":/b:ramfs",
        ])
        .unwrap();

        assert_eq!(cli.state_path(), PathBuf::from("/tmp/mounts.json"));
        match cli.command {
            Commands::Up { fstab, dry_run, .. } => {
                assert!(dry_run);
                assert_eq!(fstab, [":/a:ramfs", ":/b:ramfs"]);
            }
            _ => panic!("expected up"),
        }
    }

    #[test]
    fn parse_requires_entries() {
        assert!(Cli::try_parse_from(["automount", "parse"]).is_err());
    }
}
