use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("archive not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("not a valid zip container: {}: {source}", .path.display())]
    MalformedArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("failed to create/open index store at {}: {source}", .path.display())]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("index store error: {0}")]
    Store(#[from] heed::Error),
    #[error("corrupt archive record: {0}")]
    Record(#[from] serde_json::Error),
    #[error("unknown archive id: {0}")]
    UnknownArchive(u64),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("nested archive depth limit ({limit}) exceeded at {}", .path.display())]
    NestingTooDeep { path: PathBuf, limit: usize },
    #[error("nested entry {entry} exceeds the size limit of {limit} bytes")]
    EntryTooLarge { entry: String, limit: u64 },
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures that only cost the current nested entry, not its parent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IndexError::MalformedArchive { .. }
                | IndexError::NestingTooDeep { .. }
                | IndexError::EntryTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
