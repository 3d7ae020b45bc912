//! newc decoding.
//!
//! "newc" is the new portable format. Each file has a 110 byte header, a
//! variable length NUL-terminated filename and variable length file data,
//! both padded to a multiple of four bytes. A header for the filename
//! "TRAILER!!!" indicates the end of the archive.
//!
//! All header fields are ASCII strings of hexadecimal numbers, left padded
//! and not NUL-terminated.

use std::ffi::CStr;
use std::io::Read;
use std::ops::Range;

use crate::error::{CpioError, CpioResult};

pub(crate) const MAGIC: &[u8] = b"070701";
pub(crate) const TRAILER_NAME: &str = "TRAILER!!!";
pub(crate) const HEADER_LEN: usize = 110;

/// A newc decoder over any reader.
pub struct CpioDecoder<R> {
    inner: R,
}

impl<R: Read> CpioDecoder<R> {
    /// Create a decoder reading from `inner`.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Return an iterator decoding the entries of the archive.
    pub fn decode_entries(&mut self) -> CpioEntryIter<'_, R> {
        CpioEntryIter {
            reader: &mut self.inner,
            done: false,
        }
    }
}

/// An iterator over the decoded entries of an archive.
///
/// It stops at the trailer entry or after yielding the first error.
pub struct CpioEntryIter<'a, R> {
    reader: &'a mut R,
    done: bool,
}

impl<R: Read> Iterator for CpioEntryIter<'_, R> {
    type Item = CpioResult<CpioEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match CpioEntry::read_from(self.reader) {
            Ok(entry) if entry.is_trailer() => {
                self.done = true;
                None
            }
            Ok(entry) => Some(Ok(entry)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// A file entry of the archive.
#[derive(Debug)]
pub struct CpioEntry {
    metadata: FileMetadata,
    name: String,
    data: Vec<u8>,
}

impl CpioEntry {
    fn read_from<R: Read>(reader: &mut R) -> CpioResult<Self> {
        let header = Header::read_from(reader)?;

        let name_size = header.field(NAME_SIZE, "namesize")? as usize;
        let name_bytes = read_vec(reader, name_size)?;
        let name = CStr::from_bytes_with_nul(&name_bytes)
            .map_err(|_| CpioError::FileName)?
            .to_str()
            .map_err(|_| CpioError::Utf8)?
            .to_string();
        skip(reader, align_up_pad(HEADER_LEN + name_size, 4))?;

        let metadata = if name == TRAILER_NAME {
            FileMetadata::default()
        } else {
            FileMetadata::new(&header)?
        };

        let data = read_vec(reader, metadata.size as usize)?;
        skip(reader, align_up_pad(data.len(), 4))?;

        Ok(Self {
            metadata,
            name,
            data,
        })
    }

    /// The metadata of the file.
    pub const fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// The name of the file, relative to the archive root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file contents; the link target for symbolic links.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn is_trailer(&self) -> bool {
        self.name == TRAILER_NAME
    }
}

/// The metadata of a file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FileMetadata {
    ino: u32,
    file_type: FileType,
    mode: u16,
    uid: u32,
    gid: u32,
    nlink: u32,
    mtime: u32,
    size: u32,
}

impl FileMetadata {
    fn new(header: &Header) -> CpioResult<Self> {
        const MODE_MASK: u32 = 0o7777;
        const TYPE_MASK: u32 = 0o170000;

        let raw_mode = header.field(MODE, "mode")?;
        Ok(Self {
            ino: header.field(INO, "ino")?,
            file_type: FileType::from_mode(raw_mode & TYPE_MASK)?,
            mode: (raw_mode & MODE_MASK) as u16,
            uid: header.field(UID, "uid")?,
            gid: header.field(GID, "gid")?,
            nlink: header.field(NLINK, "nlink")?,
            mtime: header.field(MTIME, "mtime")?,
            size: header.field(FILE_SIZE, "filesize")?,
        })
    }

    /// The inode number.
    pub const fn ino(&self) -> u32 {
        self.ino
    }

    /// The file type.
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    /// The permission bits, e.g. `0o755`.
    pub const fn permission_mode(&self) -> u16 {
        self.mode
    }

    /// The user ID of the owner.
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    /// The group ID of the owner.
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    /// The number of hard links.
    pub const fn nlink(&self) -> u32 {
        self.nlink
    }

    /// The last modification time.
    pub const fn mtime(&self) -> u32 {
        self.mtime
    }

    /// The size of the file data in bytes.
    pub const fn size(&self) -> u32 {
        self.size
    }
}

/// The type of a file.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum FileType {
    /// FIFO special file
    FiFo,
    /// Character device
    Char,
    /// Directory
    Dir,
    /// Block device
    Block,
    /// Regular file
    #[default]
    File,
    /// Symbolic link
    Link,
    /// Socket
    Socket,
}

impl FileType {
    pub(crate) const fn to_mode(self) -> u32 {
        match self {
            Self::FiFo => 0o010000,
            Self::Char => 0o020000,
            Self::Dir => 0o040000,
            Self::Block => 0o060000,
            Self::File => 0o100000,
            Self::Link => 0o120000,
            Self::Socket => 0o140000,
        }
    }

    fn from_mode(bits: u32) -> CpioResult<Self> {
        Ok(match bits {
            0o010000 => Self::FiFo,
            0o020000 => Self::Char,
            0o040000 => Self::Dir,
            0o060000 => Self::Block,
            0o100000 => Self::File,
            0o120000 => Self::Link,
            0o140000 => Self::Socket,
            other => return Err(CpioError::FileType(other)),
        })
    }
}

const INO: Range<usize> = 6..14;
const MODE: Range<usize> = 14..22;
const UID: Range<usize> = 22..30;
const GID: Range<usize> = 30..38;
const NLINK: Range<usize> = 38..46;
const MTIME: Range<usize> = 46..54;
const FILE_SIZE: Range<usize> = 54..62;
const NAME_SIZE: Range<usize> = 94..102;

struct Header {
    raw: [u8; HEADER_LEN],
}

impl Header {
    fn read_from<R: Read>(reader: &mut R) -> CpioResult<Self> {
        let mut raw = [0u8; HEADER_LEN];
        read_exact(reader, &mut raw)?;
        if &raw[..MAGIC.len()] != MAGIC {
            return Err(CpioError::Magic);
        }
        Ok(Self { raw })
    }

    fn field(&self, range: Range<usize>, name: &'static str) -> CpioResult<u32> {
        let text = std::str::from_utf8(&self.raw[range]).map_err(|_| CpioError::Utf8)?;
        u32::from_str_radix(text, 16).map_err(|_| CpioError::ParseInt { field: name })
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> CpioResult<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => CpioError::BufferShort,
        _ => CpioError::Io(err),
    })
}

/// Read exactly `len` bytes, growing the buffer only as input arrives.
fn read_vec<R: Read>(reader: &mut R, len: usize) -> CpioResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(CpioError::BufferShort);
    }
    Ok(buf)
}

fn skip<R: Read>(reader: &mut R, len: usize) -> CpioResult<()> {
    let mut pad = [0u8; 4];
    read_exact(reader, &mut pad[..len])
}

pub(crate) const fn align_up_pad(size: usize, align: usize) -> usize {
    align_up(size, align) - size
}

const fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align >= 2 && align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}
