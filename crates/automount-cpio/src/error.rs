//! Errors raised while decoding or extracting an archive.

use thiserror::Error;

/// Result type alias using [`CpioError`].
pub type CpioResult<T> = Result<T, CpioError>;

/// Errors raised while decoding or extracting a newc archive.
#[derive(Error, Debug)]
pub enum CpioError {
    /// The archive ended in the middle of a header, name or file body.
    #[error("archive is truncated")]
    BufferShort,

    /// A header does not start with the newc magic.
    #[error("bad header magic, only the newc format is supported")]
    Magic,

    /// An entry name is not NUL-terminated.
    #[error("entry name is not NUL-terminated")]
    FileName,

    /// A header field or entry name is not valid UTF-8.
    #[error("header field or entry name is not valid UTF-8")]
    Utf8,

    /// A header field is not a hexadecimal number.
    #[error("header field {field} is not a hexadecimal number")]
    ParseInt {
        /// The header field.
        field: &'static str,
    },

    /// The mode field carries an unknown file type.
    #[error("unknown file type {0:#o}")]
    FileType(u32),

    /// An entry name would escape the extraction directory.
    #[error("entry name \"{0}\" escapes the extraction directory")]
    UnsafeName(String),

    /// Writing an entry failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CpioError> for std::io::Error {
    fn from(err: CpioError) -> Self {
        match err {
            CpioError::Io(io) => io,
            CpioError::BufferShort => Self::new(std::io::ErrorKind::UnexpectedEof, err),
            other => Self::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
