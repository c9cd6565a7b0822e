// Copyright 2023 oss-adapter Contributors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory [`ObjectStore`] implementation.
//!
//! Backs the test suite and local development. Pagination follows the
//! OSS contract: keys are returned in lexicographic order, rolled up at
//! the delimiter, and pages resume strictly after the marker, so lister
//! code exercises real page boundaries against it.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Utc;

use crate::client::ListObjectsOutput;
use crate::client::ListObjectsQuery;
use crate::client::ListedObject;
use crate::client::ObjectHead;
use crate::client::Reader;
use crate::Error;
use crate::ErrorKind;
use crate::Headers;
use crate::ObjectAcl;
use crate::ObjectStore;
use crate::OperationKey;
use crate::Result;

#[derive(Clone)]
struct StoredObject {
    content: Bytes,
    content_type: Option<String>,
    etag: String,
    last_modified: DateTime<Utc>,
    storage_class: String,
    acl: ObjectAcl,
}

impl StoredObject {
    fn new(content: Bytes, headers: &Headers) -> Self {
        let etag = weak_etag(&content);
        let acl = headers
            .get(OperationKey::Acl.header_name())
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            content,
            content_type: headers.get(OperationKey::ContentType.header_name()).cloned(),
            etag,
            last_modified: Utc::now(),
            storage_class: "Standard".to_string(),
            acl,
        }
    }

    fn head(&self) -> ObjectHead {
        ObjectHead {
            content_length: self.content.len() as u64,
            content_type: self.content_type.clone(),
            etag: Some(self.etag.clone()),
            last_modified: Some(self.last_modified),
            storage_class: Some(self.storage_class.clone()),
        }
    }
}

fn weak_etag(content: &Bytes) -> String {
    let mut hasher = DefaultHasher::new();
    hasher.write(content);
    format!("\"{:016X}\"", hasher.finish())
}

fn not_found(bucket: &str, key: &str) -> Error {
    Error::new(ErrorKind::NotFound, "memory store doesn't have this key")
        .with_context("bucket", bucket)
        .with_context("key", key)
}

type Objects = BTreeMap<String, StoredObject>;

/// In-memory object store keyed by bucket then object key.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Objects>>>,
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_object<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&StoredObject) -> T,
    ) -> Result<T> {
        let data = self.data.lock().unwrap();
        data.get(bucket)
            .and_then(|objects| objects.get(key))
            .map(f)
            .ok_or_else(|| not_found(bucket, key))
    }
}

enum PageItem {
    Object(String),
    CommonPrefix(String),
}

impl PageItem {
    fn as_str(&self) -> &str {
        match self {
            PageItem::Object(v) => v,
            PageItem::CommonPrefix(v) => v,
        }
    }
}

/// Compute one list page over the sorted key space.
///
/// Keys strictly after the marker are grouped at the delimiter; a common
/// prefix that compares `<=` the marker was already consumed by an
/// earlier page and is skipped wholesale.
fn list_page(objects: &Objects, q: &ListObjectsQuery) -> ListObjectsOutput {
    let mut out = ListObjectsOutput::default();
    let mut items: Vec<PageItem> = Vec::new();

    for key in objects.range(q.prefix.clone()..).map(|(k, _)| k) {
        if !key.starts_with(&q.prefix) {
            break;
        }
        if !q.marker.is_empty() && key.as_str() <= q.marker.as_str() {
            continue;
        }

        let rest = &key[q.prefix.len()..];
        let split = if q.delimiter.is_empty() {
            None
        } else {
            rest.find(&q.delimiter)
        };
        let item = match split {
            Some(idx) => {
                let cp = format!("{}{}", q.prefix, &rest[..idx + q.delimiter.len()]);
                if cp.as_str() <= q.marker.as_str() {
                    continue;
                }
                if items
                    .last()
                    .is_some_and(|last| matches!(last, PageItem::CommonPrefix(v) if *v == cp))
                {
                    continue;
                }
                PageItem::CommonPrefix(cp)
            }
            None => PageItem::Object(key.clone()),
        };

        if q.max_keys > 0 && items.len() == q.max_keys {
            out.is_truncated = true;
            out.next_marker = items.last().map(|v| v.as_str().to_string());
            break;
        }

        items.push(item);
    }

    for item in items {
        match item {
            PageItem::Object(key) => {
                let stored = &objects[&key];
                out.objects.push(ListedObject {
                    key,
                    size: stored.content.len() as u64,
                    etag: Some(stored.etag.clone()),
                    last_modified: Some(stored.last_modified),
                    storage_class: Some(stored.storage_class.clone()),
                });
            }
            PageItem::CommonPrefix(cp) => out.common_prefixes.push(cp),
        }
    }

    out
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        headers: Headers,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), StoredObject::new(content, &headers));
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.with_object(bucket, key, |o| o.content.clone())
    }

    async fn get_object_reader(&self, bucket: &str, key: &str) -> Result<Reader> {
        let content = self.with_object(bucket, key, |o| o.content.clone())?;
        Ok(Box::new(futures::io::Cursor::new(content)))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        self.with_object(bucket, key, |o| o.head())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let data = self.data.lock().unwrap();
        Ok(data
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(objects) = data.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(objects) = data.get_mut(bucket) {
            for key in keys {
                objects.remove(&key);
            }
        }
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        headers: Headers,
    ) -> Result<()> {
        let mut data = self.data.lock().unwrap();

        let mut copied = data
            .get(src_bucket)
            .and_then(|objects| objects.get(src_key))
            .cloned()
            .ok_or_else(|| not_found(src_bucket, src_key))?;

        // The ACL is not carried over by a server-side copy, the
        // destination starts from the bucket default unless the request
        // pins one.
        copied.acl = headers
            .get(OperationKey::Acl.header_name())
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        if let Some(v) = headers.get(OperationKey::ContentType.header_name()) {
            copied.content_type = Some(v.clone());
        }
        copied.last_modified = Utc::now();

        data.entry(dst_bucket.to_string())
            .or_default()
            .insert(dst_key.to_string(), copied);
        Ok(())
    }

    async fn create_object_dir(&self, bucket: &str, key: &str, headers: Headers) -> Result<()> {
        let key = if key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        };
        self.put_object(bucket, &key, Bytes::new(), headers).await
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<ObjectAcl> {
        self.with_object(bucket, key, |o| o.acl)
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        data.get_mut(bucket)
            .and_then(|objects| objects.get_mut(key))
            .map(|o| o.acl = acl)
            .ok_or_else(|| not_found(bucket, key))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        query: ListObjectsQuery,
    ) -> Result<ListObjectsOutput> {
        let data = self.data.lock().unwrap();
        let output = match data.get(bucket) {
            Some(objects) => list_page(objects, &query),
            None => ListObjectsOutput::default(),
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    async fn store_with(keys: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for key in keys {
            store
                .put_object("test", key, Bytes::from_static(b"x"), Headers::new())
                .await
                .unwrap();
        }
        store
    }

    fn query(prefix: &str, delimiter: &str, marker: &str, max_keys: usize) -> ListObjectsQuery {
        ListObjectsQuery {
            prefix: prefix.to_string(),
            delimiter: delimiter.to_string(),
            marker: marker.to_string(),
            max_keys,
        }
    }

    #[tokio::test]
    async fn test_list_rolls_up_at_delimiter() {
        let store = store_with(&["a.txt", "dir/one", "dir/two", "other/x"]).await;

        let out = store
            .list_objects("test", query("", "/", "", 1000))
            .await
            .unwrap();

        let keys: Vec<_> = out.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt"]);
        assert_eq!(out.common_prefixes, vec!["dir/", "other/"]);
        assert!(!out.has_more());
    }

    #[tokio::test]
    async fn test_list_paginates_with_marker() {
        let store = store_with(&["p/a", "p/b", "p/c", "p/d", "p/e"]).await;

        let mut marker = String::new();
        let mut seen = Vec::new();
        let mut pages = 0;

        loop {
            let out = store
                .list_objects("test", query("p/", "/", &marker, 2))
                .await
                .unwrap();
            seen.extend(out.objects.iter().map(|o| o.key.clone()));
            pages += 1;
            if !out.has_more() {
                break;
            }
            marker = out.next_marker.unwrap_or_default();
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec!["p/a", "p/b", "p/c", "p/d", "p/e"]);
    }

    #[tokio::test]
    async fn test_list_resumes_after_common_prefix() {
        let store = store_with(&["a/1", "a/2", "a/3", "b.txt"]).await;

        let first = store
            .list_objects("test", query("", "/", "", 1))
            .await
            .unwrap();
        assert_eq!(first.common_prefixes, vec!["a/"]);
        assert!(first.has_more());

        let second = store
            .list_objects(
                "test",
                query("", "/", first.next_marker.as_deref().unwrap(), 1000),
            )
            .await
            .unwrap();
        let keys: Vec<_> = second.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["b.txt"]);
        assert!(second.common_prefixes.is_empty());
        assert!(!second.has_more());
    }

    #[tokio::test]
    async fn test_list_without_delimiter_is_flat() {
        let store = store_with(&["a/1", "a/b/2", "c"]).await;

        let out = store
            .list_objects("test", query("", "", "", 1000))
            .await
            .unwrap();
        let keys: Vec<_> = out.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/1", "a/b/2", "c"]);
        assert!(out.common_prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_acl_is_not_carried_by_copy() {
        let store = MemoryStore::new();
        let mut headers = Headers::new();
        headers.insert(
            OperationKey::Acl.header_name().to_string(),
            "public-read".to_string(),
        );
        store
            .put_object("test", "src", Bytes::from_static(b"x"), headers)
            .await
            .unwrap();

        store
            .copy_object("test", "src", "test", "dst", Headers::new())
            .await
            .unwrap();

        assert_eq!(
            store.get_object_acl("test", "src").await.unwrap(),
            ObjectAcl::PublicRead
        );
        assert_eq!(
            store.get_object_acl("test", "dst").await.unwrap(),
            ObjectAcl::Default
        );
    }

    #[tokio::test]
    async fn test_head_missing_key() {
        let store = MemoryStore::new();
        let err = store.head_object("test", "missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
