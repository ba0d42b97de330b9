//! Errors returned by the file system adapter.

use crate::client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The key does not exist in the store.
    #[error("object `{0}` not found")]
    NotFound(String),

    /// The container being listed does not exist.
    #[error("directory not found")]
    DirectoryNotFound,

    /// The operation needs a container but the adapter is at the store root.
    #[error("container name required")]
    ContainerRequired,

    #[error("hash type not supported")]
    UnsupportedHash,

    /// Server-side copy between different clients.
    #[error("can't copy object - incompatible remotes")]
    CantCopy,

    /// Missing addressing information. Not retryable.
    #[error("fatal error: {0}")]
    Fatal(String),

    /// One or more deletions of a purge failed.
    #[error("failed to delete {count} objects: {first}")]
    DeleteFailed { count: usize, first: Box<Error> },

    #[error("purge worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the object-not-found condition, whichever layer raised it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Client(ClientError::ObjectNotFound)
        )
    }
}
