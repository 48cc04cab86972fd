use core::fmt;
use std::io;

/// Everything a [`crate::Volume`] operation can fail with.
#[derive(Debug)]
pub enum Error {
    /// The boot sector or the allocation table is internally inconsistent.
    Format(String),
    /// A path segment or file name has no matching directory entry.
    /// Carries the path exactly as the caller passed it.
    NotFound(String),
    /// Operation intentionally left unimplemented.
    Unsupported(&'static str),
    /// The underlying storage failed; propagated unchanged.
    Io(io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "malformed FAT volume: {msg}"),
            Error::NotFound(path) => write!(f, "the file or directory \"{path}\" doesn't exist"),
            Error::Unsupported(what) => write!(f, "{what} is not supported"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
