//! newc encoding, used to produce archives for tests and tooling.

use std::fmt::Write as _;

use crate::decoder::{FileType, HEADER_LEN, MAGIC, TRAILER_NAME, align_up_pad};

/// Builds a newc archive in memory.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    buf: Vec<u8>,
    next_ino: u32,
}

impl ArchiveBuilder {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directory.
    #[must_use]
    pub fn dir(mut self, name: &str, mode: u16) -> Self {
        self.push(name, FileType::Dir, mode, 2, &[]);
        self
    }

    /// Append a regular file.
    #[must_use]
    pub fn file(mut self, name: &str, mode: u16, data: &[u8]) -> Self {
        self.push(name, FileType::File, mode, 1, data);
        self
    }

    /// Append a symbolic link pointing at `target`.
    #[must_use]
    pub fn symlink(mut self, name: &str, target: &str) -> Self {
        self.push(name, FileType::Link, 0o777, 1, target.as_bytes());
        self
    }

    /// Append an entry of any type without data, e.g. a device node.
    #[must_use]
    pub fn special(mut self, name: &str, file_type: FileType, mode: u16) -> Self {
        self.push(name, file_type, mode, 1, &[]);
        self
    }

    /// Append the trailer and return the encoded archive.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.next_ino = 0;
        self.push_raw(TRAILER_NAME, 0, 1, &[]);
        self.buf
    }

    fn push(&mut self, name: &str, file_type: FileType, mode: u16, nlink: u32, data: &[u8]) {
        self.next_ino += 1;
        let raw_mode = file_type.to_mode() | u32::from(mode & 0o7777);
        self.push_raw(name, raw_mode, nlink, data);
    }

    fn push_raw(&mut self, name: &str, raw_mode: u32, nlink: u32, data: &[u8]) {
        let name_size = name.len() + 1;
        let fields = [
            self.next_ino,
            raw_mode,
            0, // uid
            0, // gid
            nlink,
            0, // mtime
            u32::try_from(data.len()).unwrap_or(u32::MAX),
            0, // dev major
            0, // dev minor
            0, // rdev major
            0, // rdev minor
            u32::try_from(name_size).unwrap_or(u32::MAX),
            0, // check
        ];

        let mut header = String::with_capacity(HEADER_LEN);
        header.push_str(std::str::from_utf8(MAGIC).unwrap_or("070701"));
        for field in fields {
            let _ = write!(header, "{field:08x}");
        }
        self.buf.extend_from_slice(header.as_bytes());

        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        self.pad(align_up_pad(HEADER_LEN + name_size, 4));

        self.buf.extend_from_slice(data);
        self.pad(align_up_pad(data.len(), 4));
    }

    fn pad(&mut self, len: usize) {
        self.buf.resize(self.buf.len() + len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_archive_is_a_trailer() {
        let archive = ArchiveBuilder::new().finish();
        assert_eq!(archive.len(), 124);
        assert!(archive.starts_with(MAGIC));
        assert_eq!(&archive[HEADER_LEN..HEADER_LEN + 10], TRAILER_NAME.as_bytes());
    }

    #[test]
    fn entries_are_four_byte_aligned() {
        let archive = ArchiveBuilder::new()
            .file("a", 0o644, b"abcde")
            .finish();
        assert_eq!(archive.len() % 4, 0);
    }
}
