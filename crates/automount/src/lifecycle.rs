//! Boot phase registration.
//!
//! Services register an [`Initcall`] with a level and a priority. The
//! [`InitTable`] runs them in ascending (level, priority) order at boot and
//! runs their termination hooks in reverse at shutdown.

use automount_common::AutomountResult;

use crate::boot::{BootSequencer, BootState};
use crate::config::AutomountConfig;
use crate::platform::{ArchiveRegions, BootRegions, Platform};
use crate::registry::MountRegistry;
use crate::shutdown::{ShutdownSummary, unmount_all};

/// Priority of the automount service within [`InitLevel::Rootfs`].
pub const ROOTFS_PRIORITY: u8 = 4;

/// Boot phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InitLevel {
    /// Before anything else.
    Early,
    /// Platform bring-up.
    Platform,
    /// Bus and device drivers.
    Bus,
    /// Root filesystem setup.
    Rootfs,
    /// System services.
    Sys,
    /// Everything else.
    Late,
}

/// A boot phase entry point with a termination hook.
pub trait Initcall {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Phase this call runs in.
    fn level(&self) -> InitLevel;

    /// Order within the phase; lower runs first.
    fn priority(&self) -> u8;

    /// Run at boot.
    fn init(&mut self) -> AutomountResult<()>;

    /// Run at shutdown, only if [`Self::init`] succeeded.
    fn term(&mut self) {}
}

impl<T: Initcall + ?Sized> Initcall for &mut T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn level(&self) -> InitLevel {
        (**self).level()
    }

    fn priority(&self) -> u8 {
        (**self).priority()
    }

    fn init(&mut self) -> AutomountResult<()> {
        (**self).init()
    }

    fn term(&mut self) {
        (**self).term();
    }
}

/// Registered initcalls.
#[derive(Default)]
pub struct InitTable<'a> {
    calls: Vec<Box<dyn Initcall + 'a>>,
    initialized: usize,
}

impl<'a> InitTable<'a> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `call`.
    pub fn register(&mut self, call: impl Initcall + 'a) {
        self.calls.push(Box::new(call));
    }

    /// Number of registered calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Run every init hook in order, stopping at the first failure.
    ///
    /// Calls registered with the same level and priority keep their
    /// registration order.
    pub fn init(&mut self) -> AutomountResult<()> {
        self.calls.sort_by_key(|call| (call.level(), call.priority()));
        self.initialized = 0;

        for call in &mut self.calls {
            tracing::debug!(
                name = call.name(),
                level = ?call.level(),
                priority = call.priority(),
                "Running initcall"
            );
            call.init().inspect_err(|err| {
                tracing::error!(name = call.name(), error = %err, "Initcall failed");
            })?;
            self.initialized += 1;
        }

        Ok(())
    }

    /// Run the term hooks of the initialized calls, last first.
    pub fn shutdown(&mut self) {
        for call in self.calls[..self.initialized].iter_mut().rev() {
            tracing::debug!(name = call.name(), "Running termination hook");
            call.term();
        }
        self.initialized = 0;
    }
}

/// The automount service.
///
/// Owns everything the boot and shutdown sequences need. Registered at
/// [`InitLevel::Rootfs`] with [`ROOTFS_PRIORITY`].
#[derive(Debug)]
pub struct Automount<P, R = BootRegions> {
    config: AutomountConfig,
    platform: P,
    regions: R,
    registry: MountRegistry,
    state: BootState,
    last_shutdown: Option<ShutdownSummary>,
}

impl<P: Platform, R: ArchiveRegions> Automount<P, R> {
    /// Create the service with an empty registry.
    pub fn new(config: AutomountConfig, platform: P, regions: R) -> Self {
        Self {
            config,
            platform,
            regions,
            registry: MountRegistry::new(),
            state: BootState::Init,
            last_shutdown: None,
        }
    }

    /// Start from an existing registry, e.g. one loaded from a state file.
    #[must_use]
    pub fn with_registry(mut self, registry: MountRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run the boot sequence.
    pub fn boot(&mut self) -> AutomountResult<()> {
        let mut sequencer = BootSequencer::new(
            &self.config,
            &mut self.platform,
            &self.regions,
            &mut self.registry,
        );
        let result = sequencer.run();
        self.state = sequencer.state();
        result
    }

    /// Run the shutdown sequence.
    pub fn shutdown(&mut self) -> ShutdownSummary {
        let summary = unmount_all(&mut self.platform, &mut self.registry);
        self.last_shutdown = Some(summary);
        summary
    }

    /// The configuration.
    pub const fn config(&self) -> &AutomountConfig {
        &self.config
    }

    /// Active mounts.
    pub const fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    /// The platform backend.
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Where the last boot sequence stopped.
    pub const fn state(&self) -> BootState {
        self.state
    }

    /// Outcome of the last shutdown sequence.
    pub const fn last_shutdown(&self) -> Option<ShutdownSummary> {
        self.last_shutdown
    }

    /// Give back the registry.
    pub fn into_registry(self) -> MountRegistry {
        self.registry
    }
}

impl<P: Platform, R: ArchiveRegions> Initcall for Automount<P, R> {
    fn name(&self) -> &str {
        "automount"
    }

    fn level(&self) -> InitLevel {
        InitLevel::Rootfs
    }

    fn priority(&self) -> u8 {
        ROOTFS_PRIORITY
    }

    fn init(&mut self) -> AutomountResult<()> {
        self.boot()
    }

    fn term(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryVfs;
    use automount_common::AutomountError;
    use std::cell::RefCell;

    struct Probe<'a> {
        name: &'static str,
        level: InitLevel,
        priority: u8,
        fail: bool,
        log: &'a RefCell<Vec<String>>,
    }

    impl Initcall for Probe<'_> {
        fn name(&self) -> &str {
            self.name
        }

        fn level(&self) -> InitLevel {
            self.level
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn init(&mut self) -> AutomountResult<()> {
            self.log.borrow_mut().push(format!("init {}", self.name));
            if self.fail {
                return Err(AutomountError::Config {
                    message: self.name.to_string(),
                });
            }
            Ok(())
        }

        fn term(&mut self) {
            self.log.borrow_mut().push(format!("term {}", self.name));
        }
    }

    fn probe<'a>(
        log: &'a RefCell<Vec<String>>,
        name: &'static str,
        level: InitLevel,
        priority: u8,
    ) -> Probe<'a> {
        Probe {
            name,
            level,
            priority,
            fail: false,
            log,
        }
    }

    #[test]
    fn runs_in_level_and_priority_order() {
        let log = RefCell::new(Vec::new());
        let mut table = InitTable::new();
        table.register(probe(&log, "sys", InitLevel::Sys, 0));
        table.register(probe(&log, "rootfs-4", InitLevel::Rootfs, 4));
        table.register(probe(&log, "rootfs-1", InitLevel::Rootfs, 1));
        table.register(probe(&log, "early", InitLevel::Early, 9));

        table.init().unwrap();
        table.shutdown();

        assert_eq!(
            *log.borrow(),
            [
                "init early",
                "init rootfs-1",
                "init rootfs-4",
                "init sys",
                "term sys",
                "term rootfs-4",
                "term rootfs-1",
                "term early",
            ]
        );
    }

    #[test]
    fn failure_stops_init_and_limits_term() {
        let log = RefCell::new(Vec::new());
        let mut table = InitTable::new();
        table.register(probe(&log, "a", InitLevel::Bus, 0));
        table.register(Probe {
            fail: true,
            ..probe(&log, "b", InitLevel::Rootfs, 0)
        });
        table.register(probe(&log, "c", InitLevel::Late, 0));

        assert!(table.init().is_err());
        table.shutdown();

        assert_eq!(*log.borrow(), ["init a", "init b", "term a"]);
    }

    #[test]
    fn automount_registers_at_rootfs() {
        let mut automount = Automount::new(
            AutomountConfig::default()
                .with_root_driver("ramfs")
                .with_fstab_entry(":/tmp:ramfs:::mkmp")
                .unwrap(),
            MemoryVfs::new(),
            BootRegions::new(),
        );
        assert_eq!(automount.level(), InitLevel::Rootfs);
        assert_eq!(automount.priority(), ROOTFS_PRIORITY);

        let mut table = InitTable::new();
        table.register(&mut automount);
        table.init().unwrap();
        table.shutdown();
        drop(table);

        assert_eq!(automount.state(), BootState::Done);
        assert!(automount.registry().is_empty());
        assert_eq!(
            automount.last_shutdown(),
            Some(ShutdownSummary {
                unmounted: 2,
                failed: 0
            })
        );
        assert_eq!(automount.platform().unmount_log(), ["/tmp", "/"]);
    }
}
