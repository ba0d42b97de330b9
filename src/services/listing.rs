//! Directory emulation over prefix/delimiter listings.

use super::swift_fs::SwiftFs;
use crate::{
    client::{ClientError, ClientResult, ListOpts, ObjectClient},
    errors::{Error, Result},
    models::{
        entry::{DirEntry, Directory},
        object::ObjectInfo,
    },
};
use std::sync::Arc;
use tracing::warn;

/// Page size of every listing request.
pub const LIST_CHUNKS: usize = 1000;

const DELIMITER: char = '/';

/// One raw listing result, addressed relative to the walk's root.
#[derive(Debug)]
pub(crate) struct RawEntry {
    /// Name with the root stripped, and the delimiter for directories.
    pub remote: String,
    pub info: ObjectInfo,
    pub is_dir: bool,
}

/// Pages through every key below a prefix using marker pagination.
pub(crate) struct PrefixWalker {
    client: Arc<dyn ObjectClient>,
    container: String,
    prefix: String,
    root_len: usize,
    delimiter: Option<char>,
    marker: Option<String>,
    done: bool,
}

impl PrefixWalker {
    /// Walk `root + dir + "/"` (or `root` when `dir` is empty). Results are
    /// named relative to `root`. Without `recurse` the walk is one level deep.
    pub(crate) fn new(
        client: Arc<dyn ObjectClient>,
        container: &str,
        root: &str,
        dir: &str,
        recurse: bool,
    ) -> Self {
        let mut prefix = root.to_string();
        if !dir.is_empty() {
            prefix.push_str(dir);
            prefix.push(DELIMITER);
        }
        Self {
            client,
            container: container.to_string(),
            prefix,
            root_len: root.len(),
            delimiter: (!recurse).then_some(DELIMITER),
            marker: None,
            done: false,
        }
    }

    /// Next page of entries, `None` once exhausted. A page may be empty when
    /// everything in it was filtered out.
    pub(crate) async fn next_page(&mut self) -> ClientResult<Option<Vec<RawEntry>>> {
        if self.done {
            return Ok(None);
        }
        let opts = ListOpts {
            prefix: self.prefix.clone(),
            delimiter: self.delimiter,
            limit: LIST_CHUNKS,
            marker: self.marker.clone(),
        };
        let page = self.client.list(&self.container, &opts).await?;
        if page.len() < LIST_CHUNKS {
            self.done = true;
        }
        self.marker = page.last().map(|info| info.name.clone());

        let mut entries = Vec::with_capacity(page.len());
        for info in page {
            if !info.name.starts_with(&self.prefix) {
                warn!("odd name received {:?} in {:?}", info.name, self.container);
                continue;
            }
            // Zero-length markers named after the directory itself.
            if info.name == self.prefix {
                continue;
            }
            let is_dir = self
                .delimiter
                .is_some_and(|delim| info.name.ends_with(delim));
            entries.push(RawEntry {
                remote: info.name[self.root_len..].to_string(),
                info,
                is_dir,
            });
        }
        Ok(Some(entries))
    }
}

impl SwiftFs {
    /// Entries of `dir`: containers when the adapter is at the store root,
    /// one directory level otherwise.
    pub async fn list(&self, dir: &str) -> Result<Vec<DirEntry>> {
        if self.container().is_empty() {
            self.list_containers(dir).await
        } else {
            self.list_dir(dir).await
        }
    }

    /// One level of `dir`. `DirectoryNotFound` if the container is absent.
    pub async fn list_dir(&self, dir: &str) -> Result<Vec<DirEntry>> {
        if self.container().is_empty() {
            return Err(Error::ContainerRequired);
        }
        let mut entries = Vec::new();
        self.list_with(dir, false, |entry| {
            entries.push(entry);
            Ok(())
        })
        .await
        .map_err(|err| match err {
            Error::Client(ClientError::ContainerNotFound) => Error::DirectoryNotFound,
            other => other,
        })?;
        Ok(entries)
    }

    /// Every container with its rolled-up size and object count.
    pub async fn list_containers(&self, dir: &str) -> Result<Vec<DirEntry>> {
        if !dir.is_empty() {
            return Err(Error::ContainerRequired);
        }
        let containers = self.client().list_containers().await?;
        Ok(containers
            .into_iter()
            .map(|container| {
                DirEntry::Directory(Directory {
                    name: container.name,
                    bytes: container.bytes,
                    items: Some(container.count),
                })
            })
            .collect())
    }

    /// Every object below `dir`, handed to `visit` page by page. An error
    /// from `visit` stops the walk and is returned.
    pub async fn list_r<F>(&self, dir: &str, visit: F) -> Result<()>
    where
        F: FnMut(DirEntry) -> Result<()>,
    {
        if self.container().is_empty() {
            return Err(Error::ContainerRequired);
        }
        self.list_with(dir, true, visit).await
    }

    async fn list_with<F>(&self, dir: &str, recurse: bool, mut visit: F) -> Result<()>
    where
        F: FnMut(DirEntry) -> Result<()>,
    {
        let mut walker = PrefixWalker::new(
            self.client().clone(),
            self.container(),
            self.root(),
            dir,
            recurse,
        );
        while let Some(page) = walker.next_page().await? {
            for raw in page {
                if raw.is_dir {
                    visit(DirEntry::Directory(Directory {
                        name: raw.remote.trim_end_matches(DELIMITER).to_string(),
                        bytes: raw.info.bytes,
                        items: raw.info.count,
                    }))?;
                    continue;
                }
                let object = self.new_object_with_info(&raw.remote, Some(raw.info)).await?;
                if object.storable() {
                    visit(DirEntry::File(object))?;
                }
            }
        }
        Ok(())
    }
}
