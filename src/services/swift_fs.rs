//! SwiftFs: a hierarchical view of one container (or of the whole store).
//!
//! The adapter is rooted at `container/dir`; object handles address keys
//! relative to that root. Listing lives in [`listing`](super::listing), bulk
//! deletion in [`purge`](super::purge), the large-object machinery in
//! [`uploader`](super::uploader) and [`reaper`](super::reaper).

use super::{
    container::ContainerLifecycle,
    object_handle::{Object, ObjectSource},
    path::{self, parse_path},
};
use crate::{
    client::{ClientError, ObjectClient},
    config::FsOptions,
    errors::{Error, Result},
    models::{container::segments_container, object::ObjectInfo},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::io::AsyncRead;
use tracing::debug;

/// Hash algorithms an object may be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashType {
    Md5,
    Sha1,
}

/// File system view over an [`ObjectClient`].
///
/// Cloning is cheap and clones share the container state.
#[derive(Clone)]
pub struct SwiftFs {
    client: Arc<dyn ObjectClient>,
    container: String,
    /// `""` or a directory path ending in `/`.
    root: String,
    segments_container: String,
    opts: FsOptions,
    lifecycle: Arc<ContainerLifecycle>,
    root_is_file: bool,
}

impl SwiftFs {
    /// Build an adapter rooted at `root` (`container/dir/...`).
    ///
    /// If `root` names an existing object that is not a directory marker,
    /// the adapter is rooted at its parent instead and
    /// [`root_is_file`](Self::root_is_file) reports it.
    pub async fn new(client: Arc<dyn ObjectClient>, root: &str, opts: FsOptions) -> Result<Self> {
        let (container, directory) = parse_path(root);
        let lifecycle = Arc::new(ContainerLifecycle::new(
            container.clone(),
            opts.no_check_container,
        ));
        let mut fs = Self {
            client,
            segments_container: segments_container(&container),
            container,
            root: String::new(),
            opts,
            lifecycle,
            root_is_file: false,
        };
        if directory.is_empty() {
            return Ok(fs);
        }

        fs.root = format!("{directory}/");
        if fs.container.is_empty() {
            return Ok(fs);
        }
        match fs.client.head(&fs.container, &directory).await {
            Ok((info, _)) if !info.is_directory_marker() => {
                let parent = path::parent(&directory);
                fs.root = if parent.is_empty() {
                    String::new()
                } else {
                    format!("{parent}/")
                };
                fs.root_is_file = true;
                debug!("{} points to a file, rooted at parent", root);
            }
            Ok(_) | Err(ClientError::ObjectNotFound) | Err(ClientError::ContainerNotFound) => {}
            Err(err) => return Err(err.into()),
        }
        Ok(fs)
    }

    pub fn client(&self) -> &Arc<dyn ObjectClient> {
        &self.client
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Directory below the container, with trailing `/` when non-empty.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments_container(&self) -> &str {
        &self.segments_container
    }

    pub fn options(&self) -> &FsOptions {
        &self.opts
    }

    pub fn lifecycle(&self) -> &ContainerLifecycle {
        &self.lifecycle
    }

    /// True if the requested root was an object and the adapter was
    /// re-rooted at its parent.
    pub fn root_is_file(&self) -> bool {
        self.root_is_file
    }

    /// Key of `remote` within the container.
    pub fn full_key(&self, remote: &str) -> String {
        format!("{}{}", self.root, remote)
    }

    /// Modification times are stored with nanosecond precision.
    pub fn precision(&self) -> Duration {
        Duration::from_nanos(1)
    }

    pub fn hashes(&self) -> &'static [HashType] {
        &[HashType::Md5]
    }

    /// Handle for an existing object. `NotFound` if absent.
    pub async fn new_object(&self, remote: &str) -> Result<Object> {
        self.new_object_with_info(remote, None).await
    }

    /// Handle for `remote`, seeded with listing metadata when available.
    ///
    /// A listing reports a dynamic large object as zero bytes, so zero-byte
    /// entries that aren't directory markers get their full metadata read
    /// straight away.
    pub(crate) async fn new_object_with_info(
        &self,
        remote: &str,
        info: Option<ObjectInfo>,
    ) -> Result<Object> {
        let info = info.filter(|info| info.bytes != 0 || info.is_directory_marker());
        match info {
            Some(info) => Ok(Object::with_info(self.clone(), remote, info)),
            None => {
                let mut object = Object::empty(self.clone(), remote);
                object.read_metadata().await?;
                Ok(object)
            }
        }
    }

    /// Upload `input` as `src.remote`, returning the new object.
    ///
    /// The object may have been created even if an error is returned.
    pub async fn put<R>(&self, input: R, src: &ObjectSource) -> Result<Object>
    where
        R: AsyncRead + Send + Unpin,
    {
        let mut object = Object::empty(self.clone(), &src.remote);
        object.update(input, src).await?;
        Ok(object)
    }

    /// Make sure the container exists. Directories themselves need no
    /// creation.
    pub async fn mkdir(&self, _dir: &str) -> Result<()> {
        if self.container.is_empty() {
            return Ok(());
        }
        self.lifecycle.ensure(self.client.as_ref()).await
    }

    /// Delete the container if this adapter is at the container root and
    /// `dir` is empty; a no-op otherwise. `ContainerRequired` without a
    /// container. Fails if the container isn't empty.
    pub async fn rmdir(&self, dir: &str) -> Result<()> {
        if self.container.is_empty() {
            return Err(Error::ContainerRequired);
        }
        if !self.root.is_empty() || !dir.is_empty() {
            return Ok(());
        }
        self.lifecycle.destroy(self.client.as_ref()).await
    }

    /// Server-side copy of `src` to `remote`.
    ///
    /// Only possible when `src` was read through the same client.
    pub async fn copy(&self, src: &Object, remote: &str) -> Result<Object> {
        self.mkdir("").await?;
        let src_fs = src.fs();
        if !std::ptr::addr_eq(Arc::as_ptr(&src_fs.client), Arc::as_ptr(&self.client)) {
            debug!("can't copy {} - not same remote type", src.remote());
            return Err(Error::CantCopy);
        }
        self.client
            .copy(
                &src_fs.container,
                &src_fs.full_key(src.remote()),
                &self.container,
                &self.full_key(remote),
            )
            .await?;
        self.new_object(remote).await
    }
}

impl fmt::Display for SwiftFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root.is_empty() {
            write!(f, "Swift container {}", self.container)
        } else {
            write!(f, "Swift container {} path {}", self.container, self.root)
        }
    }
}

impl fmt::Debug for SwiftFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwiftFs")
            .field("container", &self.container)
            .field("root", &self.root)
            .field("segments_container", &self.segments_container)
            .field("opts", &self.opts)
            .finish()
    }
}
