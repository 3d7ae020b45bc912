//! # automount-common
//!
//! Shared types for the automount workspace.
//!
//! This crate provides functionality used across the automount crates:
//! - The common error type and its errno mapping
//! - Mount flag literal parsing
//! - Standard configuration and state paths

#![warn(missing_docs)]

pub mod error;
pub mod flags;
pub mod paths;

pub use error::{AutomountError, AutomountResult};
pub use flags::MountFlags;
pub use paths::AutomountPaths;
