//! # automount
//!
//! Boot-time volume mounting for a virtual filesystem layer.
//!
//! At boot the orchestrator mounts an implicit root volume, optionally
//! populates it from an initial ramdisk, then mounts every entry of an
//! fstab-style table. At shutdown it unmounts everything in reverse order.
//!
//! ## Features
//!
//! - **Table parsing**: `source:path:driver[:flags[:options[:ukopts]]]` entries
//! - **Mount points**: the `mkmp` option creates missing directories,
//!   refusing `.` and `..` segments
//! - **Archives**: the `extract` driver unpacks `initrd0` or an embedded
//!   cpio archive instead of mounting
//! - **Backends**: a Linux host backend and an in-memory backend behind the
//!   same [`platform::Vfs`] interface
//!
//! ## Usage
//!
//! ```
//! use automount::config::AutomountConfig;
//! use automount::platform::{BootRegions, MemoryVfs};
//! use automount::Automount;
//!
//! # fn example() -> automount_common::AutomountResult<()> {
//! let config = AutomountConfig::default()
//!     .with_root_driver("ramfs")
//!     .with_fstab_entry("none:/tmp:ramfs:::mkmp")?;
//!
//! let mut automount = Automount::new(config, MemoryVfs::new(), BootRegions::new());
//! automount.boot()?;
//! assert_eq!(automount.registry().len(), 2);
//!
//! let summary = automount.shutdown();
//! assert_eq!(summary.unmounted, 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]

pub mod boot;
pub mod cli;
pub mod config;
pub mod fstab;
pub mod lifecycle;
pub mod mounter;
pub mod mountpoint;
pub mod platform;
pub mod registry;
pub mod shutdown;
pub mod ukopts;
pub mod volume;

pub use boot::{BootSequencer, BootState};
pub use lifecycle::Automount;
pub use registry::{ActiveMount, MountRegistry};
pub use volume::Volume;
