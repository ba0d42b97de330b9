//! The object-storage capability the adapter is built on.
//!
//! Implementations speak to an actual store; the adapter only relies on the
//! behaviour documented on [`ObjectClient`].

use crate::models::{container::ContainerInfo, metadata::Headers, object::ObjectInfo};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::{io, ops::Range};
use thiserror::Error;
use tokio::io::AsyncRead;

/// Object payload as a stream of chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Upload body. Must yield exactly the declared number of bytes.
pub type Body<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("object not found")]
    ObjectNotFound,
    #[error("container not found")]
    ContainerNotFound,
    #[error("container not empty")]
    ContainerNotEmpty,
    #[error("container already exists")]
    ContainerExists,
    #[error("body length {actual} does not match declared length {expected}")]
    LengthMismatch { expected: u64, actual: u64 },
    #[error("invalid name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Parameters of one listing request.
#[derive(Clone, Debug, Default)]
pub struct ListOpts {
    /// Only keys starting with this prefix are returned.
    pub prefix: String,

    /// Collapse keys containing this character after the prefix into a
    /// single pseudo-directory entry ending in the delimiter.
    pub delimiter: Option<char>,

    /// Maximum number of entries per page.
    pub limit: usize,

    /// Only entries strictly after this name are returned.
    pub marker: Option<String>,
}

/// Operations of an object store with a flat container/key namespace.
///
/// Listing semantics: entries come back in byte order of their names. With a
/// delimiter, every key having the delimiter somewhere after `prefix` is
/// folded into one entry named `prefix + segment + delimiter` whose `bytes`
/// and `count` roll up the folded keys.
///
/// Large objects: `head` and `get` of a key carrying an `X-Object-Manifest`
/// header report the concatenation of the objects under the referenced
/// prefix, in key order. Listings report the manifest's own zero size.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// All containers with their rollups.
    async fn list_containers(&self) -> ClientResult<Vec<ContainerInfo>>;

    /// Probe a single container. `ContainerNotFound` if absent.
    async fn container_info(&self, container: &str) -> ClientResult<ContainerInfo>;

    /// Create a container. May fail with `ContainerExists`.
    async fn create_container(&self, container: &str) -> ClientResult<()>;

    /// Delete an empty container. `ContainerNotEmpty` if objects remain.
    async fn delete_container(&self, container: &str) -> ClientResult<()>;

    /// One page of a listing. `ContainerNotFound` if absent.
    async fn list(&self, container: &str, opts: &ListOpts) -> ClientResult<Vec<ObjectInfo>>;

    /// Metadata and headers of one key. `ObjectNotFound` if absent.
    async fn head(&self, container: &str, key: &str) -> ClientResult<(ObjectInfo, Headers)>;

    /// Stream the content of a key, optionally restricted to a byte range.
    async fn get(
        &self,
        container: &str,
        key: &str,
        range: Option<Range<u64>>,
    ) -> ClientResult<ByteStream>;

    /// Store `size` bytes read from `body` at `key`, returning the etag.
    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Body<'_>,
        size: u64,
        content_type: Option<&str>,
        headers: &Headers,
    ) -> ClientResult<String>;

    /// Replace the metadata headers of an existing key.
    async fn post(&self, container: &str, key: &str, headers: &Headers) -> ClientResult<()>;

    /// Delete a key. `ObjectNotFound` if absent.
    async fn delete(&self, container: &str, key: &str) -> ClientResult<()>;

    /// Server-side copy.
    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> ClientResult<()>;
}
