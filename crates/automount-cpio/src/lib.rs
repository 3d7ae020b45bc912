//! A safe CPIO (the newc format) decoder and extractor.
//!
//! Initial ramdisks handed to the boot sequence are newc archives. This
//! crate decodes them entry by entry and unpacks them below a directory.
//!
//! # Example
//!
//! ```rust
//! use automount_cpio::{ArchiveBuilder, CpioDecoder};
//!
//! let archive = ArchiveBuilder::new()
//!     .dir("etc", 0o755)
//!     .file("etc/hostname", 0o644, b"unikernel\n")
//!     .finish();
//!
//! let mut decoder = CpioDecoder::new(archive.as_slice());
//! for entry in decoder.decode_entries() {
//!     let entry = entry.unwrap();
//!     println!("{} ({} bytes)", entry.name(), entry.data().len());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod decoder;
pub mod error;
mod extract;

pub use builder::ArchiveBuilder;
pub use decoder::{CpioDecoder, CpioEntry, CpioEntryIter, FileMetadata, FileType};
pub use error::{CpioError, CpioResult};
pub use extract::{ExtractStats, extract};
