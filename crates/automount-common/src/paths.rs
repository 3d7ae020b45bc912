//! Standard filesystem paths for automount.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Default configuration file.
pub static AUTOMOUNT_CONFIG: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("AUTOMOUNT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/etc/automount.toml"))
});

/// Default runtime directory holding the mount registry state.
pub static AUTOMOUNT_RUNTIME_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("AUTOMOUNT_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/automount"))
});

/// Standard paths used by the automount front end.
#[derive(Debug, Clone)]
pub struct AutomountPaths {
    /// Configuration file (default: /etc/automount.toml).
    pub config: PathBuf,
    /// Runtime directory (default: /run/automount).
    pub runtime: PathBuf,
}

impl AutomountPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom runtime directory.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<PathBuf>) -> Self {
        self.runtime = runtime.into();
        self
    }

    /// Create paths with a custom configuration file.
    #[must_use]
    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = config.into();
        self
    }

    /// Mount registry state file.
    #[must_use]
    pub fn state(&self) -> PathBuf {
        self.runtime.join("mounts.json")
    }
}

impl Default for AutomountPaths {
    fn default() -> Self {
        Self {
            config: AUTOMOUNT_CONFIG.clone(),
            runtime: AUTOMOUNT_RUNTIME_DIR.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_runtime() {
        let paths = AutomountPaths::new().with_runtime("/tmp/automount-test");
        assert_eq!(
            paths.state(),
            PathBuf::from("/tmp/automount-test/mounts.json")
        );
    }

    #[test]
    fn custom_config() {
        let paths = AutomountPaths::new().with_config("/tmp/fstab.toml");
        assert_eq!(paths.config, PathBuf::from("/tmp/fstab.toml"));
    }
}
