//! Object: a lazily loaded handle on one key.
//!
//! Listing metadata (`ObjectInfo`) is always present; the full headers are
//! fetched on first need and dropped again after every successful write.

use super::{
    reaper,
    swift_fs::{HashType, SwiftFs},
    uploader,
};
use crate::{
    client::{ByteStream, ClientError},
    errors::{Error, Result},
    models::{
        metadata::{
            Headers, OBJECT_HEADER_PREFIX, OBJECT_MANIFEST_HEADER, STATIC_LARGE_OBJECT_HEADER,
        },
        object::{DIRECTORY_MARKER_CONTENT_TYPE, ObjectInfo},
    },
};
use chrono::{DateTime, Utc};
use std::{fmt, ops::Range};
use tokio::io::AsyncRead;
use tracing::{debug, warn};

/// Description of content about to be uploaded.
#[derive(Clone, Debug)]
pub struct ObjectSource {
    /// Destination path relative to the adapter root.
    pub remote: String,

    /// Exact number of bytes the reader will yield.
    pub size: u64,

    pub mod_time: DateTime<Utc>,

    /// Guessed from the remote's extension when absent.
    pub content_type: Option<String>,
}

impl ObjectSource {
    fn mime_type(&self) -> String {
        match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => mime_guess::from_path(&self.remote)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

/// Whether the full headers of an object have been read.
#[derive(Clone, Debug, Default)]
enum MetaState {
    #[default]
    Unloaded,
    Loaded(Headers),
}

/// Handle on one object.
///
/// Not meant to be shared between concurrent writers; mutating calls take
/// `&mut self`.
#[derive(Debug)]
pub struct Object {
    fs: SwiftFs,
    remote: String,
    info: ObjectInfo,
    meta: MetaState,
}

impl Object {
    /// Handle with no metadata yet.
    pub(crate) fn empty(fs: SwiftFs, remote: &str) -> Self {
        Self {
            fs,
            remote: remote.to_string(),
            info: ObjectInfo::default(),
            meta: MetaState::Unloaded,
        }
    }

    /// Handle seeded with listing metadata; headers still unloaded.
    pub(crate) fn with_info(fs: SwiftFs, remote: &str, info: ObjectInfo) -> Self {
        Self {
            fs,
            remote: remote.to_string(),
            info,
            meta: MetaState::Unloaded,
        }
    }

    pub fn fs(&self) -> &SwiftFs {
        &self.fs
    }

    /// Path relative to the adapter root.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    fn key(&self) -> String {
        self.fs.full_key(&self.remote)
    }

    /// Last known size in bytes.
    pub fn size(&self) -> u64 {
        self.info.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.info.content_type
    }

    /// Directory markers are placeholders and never part of a transfer.
    pub fn storable(&self) -> bool {
        self.info.content_type != DIRECTORY_MARKER_CONTENT_TYPE
    }

    pub fn is_metadata_loaded(&self) -> bool {
        matches!(self.meta, MetaState::Loaded(_))
    }

    /// Read the object's info and headers if not loaded yet.
    pub(crate) async fn read_metadata(&mut self) -> Result<&Headers> {
        if let MetaState::Unloaded = self.meta {
            let (info, headers) = self
                .fs
                .client()
                .head(self.fs.container(), &self.key())
                .await
                .map_err(|err| match err {
                    ClientError::ObjectNotFound | ClientError::ContainerNotFound => {
                        Error::NotFound(self.remote.clone())
                    }
                    other => Error::Client(other),
                })?;
            self.info = info;
            self.meta = MetaState::Loaded(headers);
        }
        match &self.meta {
            MetaState::Loaded(headers) => Ok(headers),
            MetaState::Unloaded => Err(Error::NotFound(self.remote.clone())),
        }
    }

    /// Whether `header` is present. A missing object has no headers, so
    /// `NotFound` answers `false`.
    async fn has_header(&mut self, header: &str) -> Result<bool> {
        match self.read_metadata().await {
            Ok(headers) => Ok(headers.contains(header)),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn is_dynamic_large_object(&mut self) -> Result<bool> {
        self.has_header(OBJECT_MANIFEST_HEADER).await
    }

    pub async fn is_static_large_object(&mut self) -> Result<bool> {
        self.has_header(STATIC_LARGE_OBJECT_HEADER).await
    }

    pub async fn is_large_object(&mut self) -> Result<bool> {
        Ok(self.is_dynamic_large_object().await? || self.is_static_large_object().await?)
    }

    /// Provider MD5 in lower case; empty for large objects, which have no
    /// whole-object checksum.
    pub async fn hash(&mut self, hash_type: HashType) -> Result<String> {
        if hash_type != HashType::Md5 {
            return Err(Error::UnsupportedHash);
        }
        if self.is_large_object().await? {
            debug!("{}: returning empty md5 for large object", self.remote);
            return Ok(String::new());
        }
        Ok(self.info.hash.to_lowercase())
    }

    /// Modification time from the metadata header, else the provider's
    /// last-modified time.
    pub async fn mod_time(&mut self) -> DateTime<Utc> {
        match self.read_metadata().await {
            Ok(headers) => {
                if let Some(t) = headers.mod_time() {
                    return t;
                }
            }
            Err(err) => debug!("{}: failed to read metadata: {}", self.remote, err),
        }
        self.info.last_modified
    }

    /// Store `t` as the modification time, keeping every other `X-Object-*`
    /// header (including a large object's manifest).
    pub async fn set_mod_time(&mut self, t: DateTime<Utc>) -> Result<()> {
        let current = self.read_metadata().await?.clone();
        let mut updated: Headers = current
            .iter()
            .filter(|(name, _)| name.starts_with(OBJECT_HEADER_PREFIX))
            .collect();
        updated.set_mod_time(t);

        self.fs
            .client()
            .post(self.fs.container(), &self.key(), &updated)
            .await?;

        let mut cached = current;
        cached.set_mod_time(t);
        self.meta = MetaState::Loaded(cached);
        Ok(())
    }

    /// Stream the content, optionally limited to a byte range.
    pub async fn open(&self, range: Option<Range<u64>>) -> Result<ByteStream> {
        self.fs
            .client()
            .get(self.fs.container(), &self.key(), range)
            .await
            .map_err(|err| match err {
                ClientError::ObjectNotFound => Error::NotFound(self.remote.clone()),
                other => Error::Client(other),
            })
    }

    /// Replace the content with `src.size` bytes from `input`.
    ///
    /// Payloads above the chunk size become a manifest plus segments. If the
    /// previous version was a large object its segments are removed
    /// afterwards, sparing those just written. The object may have been
    /// written even if an error is returned.
    pub async fn update<R>(&mut self, mut input: R, src: &ObjectSource) -> Result<()>
    where
        R: AsyncRead + Send + Unpin,
    {
        if self.fs.container().is_empty() {
            return Err(Error::Fatal("container name needed in remote".into()));
        }
        self.fs.mkdir("").await?;

        // Must be captured before new segments exist.
        let was_large_object = self.is_dynamic_large_object().await?;

        let headers = Headers::with_mod_time(src.mod_time);
        let content_type = src.mime_type();
        let key = self.key();
        let mut unique_prefix = String::new();
        if src.size > self.fs.options().chunk_size {
            unique_prefix = uploader::upload_chunks(
                &self.fs,
                &key,
                &mut input,
                &headers,
                src.size,
                &content_type,
            )
            .await?;
        } else {
            self.fs
                .client()
                .put(
                    self.fs.container(),
                    &key,
                    &mut input,
                    src.size,
                    Some(&content_type),
                    &headers,
                )
                .await?;
        }

        if was_large_object {
            if let Err(err) = reaper::reap_stale(&self.fs, &key, &unique_prefix).await {
                warn!(
                    "{}: failed to remove old segments - carrying on with upload: {}",
                    self.remote, err
                );
            }
        }

        self.meta = MetaState::Unloaded;
        self.read_metadata().await?;
        Ok(())
    }

    /// Delete the object; a dynamic large object's manifest goes first, then its
    /// segments.
    pub async fn remove(&mut self) -> Result<()> {
        let was_large_object = self.is_dynamic_large_object().await?;
        let key = self.key();
        self.fs
            .client()
            .delete(self.fs.container(), &key)
            .await
            .map_err(|err| match err {
                ClientError::ObjectNotFound => Error::NotFound(self.remote.clone()),
                other => Error::Client(other),
            })?;
        self.meta = MetaState::Unloaded;

        if was_large_object {
            if let Err(err) = reaper::reap_all(&self.fs, &key).await {
                warn!("{}: failed to remove segments: {}", self.remote, err);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.remote)
    }
}
