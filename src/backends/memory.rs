//! In-process object store.
//!
//! Mirrors the observable behaviour of a real store closely enough for the
//! adapter's tests: zero-size manifests in listings, concatenated large
//! objects on `head`/`get`, `ContainerNotEmpty` on deleting a non-empty
//! container. Every call is recorded in a log, and individual operations can
//! be made to fail.

use super::{PageBuilder, list_start, slice_stream};
use crate::{
    client::{Body, ByteStream, ClientError, ClientResult, ListOpts, ObjectClient},
    models::{
        container::ContainerInfo,
        metadata::{Headers, OBJECT_MANIFEST_HEADER},
        object::ObjectInfo,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::{Bound, Range},
};
use tokio::io::AsyncReadExt;

/// A call made against a [`MemoryClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ListContainers,
    ContainerInfo(String),
    CreateContainer(String),
    DeleteContainer(String),
    List { container: String, prefix: String },
    Head { container: String, key: String },
    Get { container: String, key: String },
    Put { container: String, key: String, size: u64 },
    Post { container: String, key: String },
    Delete { container: String, key: String },
    Copy { src: String, dst: String },
}

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    headers: Headers,
    last_modified: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct State {
    containers: BTreeMap<String, BTreeMap<String, StoredObject>>,
    calls: Vec<Call>,
    put_budget: HashMap<String, usize>,
    failing_creates: HashSet<String>,
    failing_container_deletes: HashSet<String>,
    failing_deletes: HashSet<String>,
}

/// Object store held entirely in memory.
#[derive(Default)]
pub struct MemoryClient {
    state: Mutex<State>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `container` without recording a call.
    pub fn seed_container(&self, container: &str) {
        self.state
            .lock()
            .containers
            .entry(container.to_string())
            .or_default();
    }

    /// Store an object directly, creating the container if needed.
    pub fn seed_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
        headers: Headers,
    ) {
        let mut state = self.state.lock();
        state
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::copy_from_slice(data),
                    content_type: content_type.to_string(),
                    headers,
                    last_modified: Utc::now(),
                },
            );
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Keys currently stored in `container`, in order. Empty if absent.
    pub fn keys(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .containers
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().containers.contains_key(container)
    }

    /// Raw content and headers of a key, bypassing large-object handling.
    pub fn raw_object(&self, container: &str, key: &str) -> Option<(Bytes, Headers)> {
        self.state
            .lock()
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|obj| (obj.data.clone(), obj.headers.clone()))
    }

    /// Allow `successes` more puts into `container`, then fail every put.
    pub fn fail_puts_after(&self, container: &str, successes: usize) {
        self.state
            .lock()
            .put_budget
            .insert(container.to_string(), successes);
    }

    pub fn fail_create_container(&self, container: &str) {
        self.state
            .lock()
            .failing_creates
            .insert(container.to_string());
    }

    pub fn fail_delete_container(&self, container: &str) {
        self.state
            .lock()
            .failing_container_deletes
            .insert(container.to_string());
    }

    /// Make deletes of objects in `container` fail.
    pub fn fail_deletes_in(&self, container: &str) {
        self.state
            .lock()
            .failing_deletes
            .insert(container.to_string());
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

impl State {
    fn objects(&self, container: &str) -> ClientResult<&BTreeMap<String, StoredObject>> {
        self.containers
            .get(container)
            .ok_or(ClientError::ContainerNotFound)
    }

    fn object(&self, container: &str, key: &str) -> ClientResult<&StoredObject> {
        self.objects(container)?
            .get(key)
            .ok_or(ClientError::ObjectNotFound)
    }

    /// Segments referenced by a manifest value, in key order.
    fn segments(&self, manifest: &str) -> Vec<&StoredObject> {
        let decoded = percent_decode_str(manifest).decode_utf8_lossy();
        let Some((container, prefix)) = decoded.split_once('/') else {
            return Vec::new();
        };
        match self.containers.get(container) {
            Some(objects) => objects
                .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(_, obj)| obj)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Full content of a key, resolving manifests.
    fn content(&self, obj: &StoredObject) -> Bytes {
        match obj.headers.get(OBJECT_MANIFEST_HEADER) {
            Some(manifest) => {
                let mut joined = Vec::new();
                for segment in self.segments(manifest) {
                    joined.extend_from_slice(&segment.data);
                }
                Bytes::from(joined)
            }
            None => obj.data.clone(),
        }
    }
}

fn info_for(key: &str, obj: &StoredObject, data: &Bytes) -> ObjectInfo {
    ObjectInfo {
        name: key.to_string(),
        bytes: data.len() as u64,
        content_type: obj.content_type.clone(),
        hash: format!("{:x}", md5::compute(data)),
        last_modified: obj.last_modified,
        count: None,
    }
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn list_containers(&self) -> ClientResult<Vec<ContainerInfo>> {
        self.record(Call::ListContainers);
        let state = self.state.lock();
        Ok(state
            .containers
            .iter()
            .map(|(name, objects)| ContainerInfo {
                name: name.clone(),
                bytes: objects.values().map(|o| o.data.len() as u64).sum(),
                count: objects.len() as u64,
            })
            .collect())
    }

    async fn container_info(&self, container: &str) -> ClientResult<ContainerInfo> {
        self.record(Call::ContainerInfo(container.to_string()));
        let state = self.state.lock();
        let objects = state.objects(container)?;
        Ok(ContainerInfo {
            name: container.to_string(),
            bytes: objects.values().map(|o| o.data.len() as u64).sum(),
            count: objects.len() as u64,
        })
    }

    async fn create_container(&self, container: &str) -> ClientResult<()> {
        self.record(Call::CreateContainer(container.to_string()));
        let mut state = self.state.lock();
        if state.failing_creates.contains(container) {
            return Err(ClientError::Transport(format!(
                "injected create failure for `{container}`"
            )));
        }
        if state.containers.contains_key(container) {
            return Err(ClientError::ContainerExists);
        }
        state.containers.insert(container.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_container(&self, container: &str) -> ClientResult<()> {
        self.record(Call::DeleteContainer(container.to_string()));
        let mut state = self.state.lock();
        if state.failing_container_deletes.contains(container) {
            return Err(ClientError::Transport(format!(
                "injected delete failure for `{container}`"
            )));
        }
        if !state.objects(container)?.is_empty() {
            return Err(ClientError::ContainerNotEmpty);
        }
        state.containers.remove(container);
        Ok(())
    }

    async fn list(&self, container: &str, opts: &ListOpts) -> ClientResult<Vec<ObjectInfo>> {
        self.record(Call::List {
            container: container.to_string(),
            prefix: opts.prefix.clone(),
        });
        let state = self.state.lock();
        let objects = state.objects(container)?;
        let mut builder = PageBuilder::new(opts);
        let start = list_start(opts).max(opts.prefix.as_str());
        let lower = if opts.marker.as_deref() == Some(start) {
            Bound::Excluded(start)
        } else {
            Bound::Included(start)
        };
        for (key, obj) in objects.range::<str, _>((lower, Bound::Unbounded)) {
            if !key.starts_with(opts.prefix.as_str()) {
                break;
            }
            // Listings report a manifest's own size.
            if !builder.push(info_for(key, obj, &obj.data)) {
                break;
            }
        }
        Ok(builder.finish())
    }

    async fn head(&self, container: &str, key: &str) -> ClientResult<(ObjectInfo, Headers)> {
        self.record(Call::Head {
            container: container.to_string(),
            key: key.to_string(),
        });
        let state = self.state.lock();
        let obj = state.object(container, key)?;
        let content = state.content(obj);
        Ok((info_for(key, obj, &content), obj.headers.clone()))
    }

    async fn get(
        &self,
        container: &str,
        key: &str,
        range: Option<Range<u64>>,
    ) -> ClientResult<ByteStream> {
        self.record(Call::Get {
            container: container.to_string(),
            key: key.to_string(),
        });
        let content = {
            let state = self.state.lock();
            let obj = state.object(container, key)?;
            state.content(obj)
        };
        let stream: ByteStream = Box::pin(futures::stream::iter([Ok(content)]));
        Ok(match range {
            Some(range) => slice_stream(stream, range),
            None => stream,
        })
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Body<'_>,
        size: u64,
        content_type: Option<&str>,
        headers: &Headers,
    ) -> ClientResult<String> {
        self.record(Call::Put {
            container: container.to_string(),
            key: key.to_string(),
            size,
        });
        {
            let mut state = self.state.lock();
            state.objects(container)?;
            if let Some(budget) = state.put_budget.get_mut(container) {
                if *budget == 0 {
                    return Err(ClientError::Transport(format!(
                        "injected put failure for `{container}/{key}`"
                    )));
                }
                *budget -= 1;
            }
        }

        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        if data.len() as u64 != size {
            return Err(ClientError::LengthMismatch {
                expected: size,
                actual: data.len() as u64,
            });
        }
        let etag = format!("{:x}", md5::compute(&data));

        let mut state = self.state.lock();
        let objects = state
            .containers
            .get_mut(container)
            .ok_or(ClientError::ContainerNotFound)?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::from(data),
                content_type: content_type
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                headers: headers.clone(),
                last_modified: Utc::now(),
            },
        );
        Ok(etag)
    }

    async fn post(&self, container: &str, key: &str, headers: &Headers) -> ClientResult<()> {
        self.record(Call::Post {
            container: container.to_string(),
            key: key.to_string(),
        });
        let mut state = self.state.lock();
        let obj = state
            .containers
            .get_mut(container)
            .ok_or(ClientError::ContainerNotFound)?
            .get_mut(key)
            .ok_or(ClientError::ObjectNotFound)?;
        obj.headers = headers.clone();
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> ClientResult<()> {
        self.record(Call::Delete {
            container: container.to_string(),
            key: key.to_string(),
        });
        let mut state = self.state.lock();
        if state.failing_deletes.contains(container) {
            return Err(ClientError::Transport(format!(
                "injected delete failure for `{container}/{key}`"
            )));
        }
        state
            .containers
            .get_mut(container)
            .ok_or(ClientError::ContainerNotFound)?
            .remove(key)
            .map(|_| ())
            .ok_or(ClientError::ObjectNotFound)
    }

    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> ClientResult<()> {
        self.record(Call::Copy {
            src: format!("{src_container}/{src_key}"),
            dst: format!("{dst_container}/{dst_key}"),
        });
        let mut state = self.state.lock();
        let src = state.object(src_container, src_key)?;
        let data = state.content(src);
        let mut headers = src.headers.clone();
        headers.remove(OBJECT_MANIFEST_HEADER);
        let copied = StoredObject {
            data,
            content_type: src.content_type.clone(),
            headers,
            last_modified: Utc::now(),
        };
        state
            .containers
            .get_mut(dst_container)
            .ok_or(ClientError::ContainerNotFound)?
            .insert(dst_key.to_string(), copied);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_manifest_resolves_on_head_and_get() {
        let client = MemoryClient::new();
        client.seed_object("c_segments", "big/1/6/00000000", b"abc", "text/plain", Headers::new());
        client.seed_object("c_segments", "big/1/6/00000001", b"def", "text/plain", Headers::new());
        let mut manifest = Headers::new();
        manifest.insert(OBJECT_MANIFEST_HEADER, "c%5Fsegments/big/1/6");
        client.seed_object("c", "big", b"", "text/plain", manifest);

        let (info, headers) = client.head("c", "big").await.unwrap();
        assert_eq!(info.bytes, 6);
        assert!(headers.contains(OBJECT_MANIFEST_HEADER));

        let listed = client
            .list("c", &ListOpts { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed[0].bytes, 0);

        let chunks: Vec<Bytes> = client.get("c", "big", None).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"abcdef");
    }

    #[tokio::test]
    async fn test_put_rejects_short_body() {
        let client = MemoryClient::new();
        client.seed_container("c");
        let mut body: &[u8] = b"abc";
        let err = client
            .put("c", "k", &mut body, 5, None, &Headers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::LengthMismatch { expected: 5, actual: 3 }));
    }

    #[tokio::test]
    async fn test_delete_non_empty_container() {
        let client = MemoryClient::new();
        client.seed_object("c", "k", b"x", "text/plain", Headers::new());
        let err = client.delete_container("c").await.unwrap_err();
        assert!(matches!(err, ClientError::ContainerNotEmpty));
        client.delete("c", "k").await.unwrap();
        client.delete_container("c").await.unwrap();
        assert!(!client.has_container("c"));
    }
}
