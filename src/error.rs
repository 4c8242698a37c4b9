//! Extraction error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure category of an [`ExtractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The archive path does not exist
    ArchiveNotFound,
    /// The archive exists but could not be opened or read
    ArchiveRead,
    /// The archive is not a valid ZIP file or fails an integrity check
    ArchiveCorrupt,
    /// The archive uses a feature this extractor does not handle
    Unsupported,
    /// An entry could not be written under the destination
    FilesystemWrite,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive {0:?} not found")]
    ArchiveNotFound(PathBuf),
    #[error("failed to read archive")]
    ArchiveRead(#[source] io::Error),
    #[error("corrupt archive: {0}")]
    ArchiveCorrupt(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("failed to write {path:?}")]
    FilesystemWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArchiveNotFound(_) => ErrorKind::ArchiveNotFound,
            Self::ArchiveRead(_) => ErrorKind::ArchiveRead,
            Self::ArchiveCorrupt(_) => ErrorKind::ArchiveCorrupt,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::FilesystemWrite { .. } => ErrorKind::FilesystemWrite,
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::ArchiveCorrupt(message.into())
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FilesystemWrite {
            path: path.into(),
            source,
        }
    }
}

/// Short reads while decoding fixed-size records mean the archive is truncated.
impl From<io::Error> for ExtractError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt("unexpected end of data")
        } else {
            Self::ArchiveRead(e)
        }
    }
}

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;
