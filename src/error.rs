use thiserror::Error;

use crate::disk::DiskError;

/// Errors surfaced by the public file system API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OsError {
    #[error("general failure")]
    General,
    #[error("cannot create file or directory")]
    Create,
    #[error("no such file")]
    NoSuchFile,
    #[error("no such directory")]
    NoSuchDir,
    #[error("file is in use")]
    FileInUse,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("bad file descriptor")]
    BadFd,
    #[error("no space left on disk")]
    NoSpace,
    #[error("file too big")]
    FileTooBig,
    #[error("seek out of bounds")]
    SeekOutOfBounds,
    #[error("buffer too small")]
    BufferTooSmall,
    #[error("directory not empty")]
    DirNotEmpty,
    #[error("cannot unlink the root directory")]
    RootDir,
}

impl OsError {
    /// Numeric code for callers that poll an errno-style value.
    pub fn errno(self) -> i32 {
        match self {
            OsError::General => -1,
            OsError::Create => -2,
            OsError::NoSuchFile => -3,
            OsError::NoSuchDir => -4,
            OsError::FileInUse => -5,
            OsError::TooManyOpenFiles => -6,
            OsError::BadFd => -7,
            OsError::NoSpace => -8,
            OsError::FileTooBig => -9,
            OsError::SeekOutOfBounds => -10,
            OsError::BufferTooSmall => -11,
            OsError::DirNotEmpty => -12,
            OsError::RootDir => -13,
        }
    }
}

// block device failures surface as the general error
impl From<DiskError> for OsError {
    fn from(err: DiskError) -> Self {
        log::debug!("disk error: {err}");
        OsError::General
    }
}
