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

//! The adapter: filesystem verbs over a bucket-scoped object store.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;

use bytes::Bytes;
use chrono::DateTime;
use chrono::Utc;
use futures::AsyncReadExt;
use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::client::ObjectHead;
use crate::client::Reader;
use crate::lister::DirectoryLister;
use crate::lister::DEFAULT_PAGE_SIZE;
use crate::path::build_abs_path;
use crate::path::build_rel_path;
use crate::path::get_parent;
use crate::path::normalize_path;
use crate::path::normalize_root;
use crate::Entry;
use crate::EntryMode;
use crate::Error;
use crate::ErrorKind;
use crate::Metadata;
use crate::ObjectAcl;
use crate::ObjectStore;
use crate::OperationKey;
use crate::OperationOptions;
use crate::Result;
use crate::Visibility;

/// Upper bound of keys per batch-delete call, the OSS limit.
const DELETE_BATCH_SIZE: usize = 1000;

/// Static configuration consumed at construction.
///
/// The client handle is not part of this struct, it is attached on the
/// builder directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OssAdapterConfig {
    /// Bucket name, required.
    pub bucket: String,
    /// Key prefix applied to every logical path.
    pub prefix: Option<String>,
    /// Endpoint domain, used when composing public urls.
    pub endpoint: Option<String>,
    /// Compose https public urls.
    pub ssl: bool,
    /// The endpoint is a custom domain bound to the bucket.
    pub cname: bool,
    /// CDN domain that fronts the bucket, wins over the endpoint when
    /// composing public urls.
    pub cdn_domain: Option<String>,
    /// Objects plus prefixes per list page. Defaults to the OSS maximum.
    pub list_page_size: Option<usize>,
}

/// Builder for [`OssAdapter`].
#[derive(Default)]
pub struct OssAdapterBuilder {
    config: OssAdapterConfig,
    client: Option<Arc<dyn ObjectStore>>,
    default_options: OperationOptions,
}

impl Debug for OssAdapterBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssAdapterBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OssAdapterBuilder {
    /// Start from a deserialized config.
    pub fn from_config(config: OssAdapterConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Start from string-keyed configuration, unknown keys are ignored.
    pub fn from_map(map: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut config = OssAdapterConfig::default();
        for (k, v) in map {
            match k.as_str() {
                "bucket" => config.bucket = v,
                "prefix" => config.prefix = Some(v),
                "endpoint" => config.endpoint = Some(v),
                "ssl" => config.ssl = v == "true" || v == "on",
                "cname" => config.cname = v == "true" || v == "on",
                "cdn_domain" => config.cdn_domain = Some(v),
                "list_page_size" => config.list_page_size = v.parse().ok(),
                _ => continue,
            }
        }
        Self::from_config(config)
    }

    /// Set the object-store client this adapter delegates to. Required.
    pub fn client(&mut self, client: Arc<dyn ObjectStore>) -> &mut Self {
        self.client = Some(client);
        self
    }

    /// Set bucket name of this adapter. Required.
    pub fn bucket(&mut self, bucket: &str) -> &mut Self {
        self.config.bucket = bucket.to_string();
        self
    }

    /// Set the key prefix of this adapter.
    ///
    /// All operations will happen under this prefix.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.config.prefix = if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_string())
        };
        self
    }

    /// Set endpoint of this adapter, used for public urls.
    pub fn endpoint(&mut self, endpoint: &str) -> &mut Self {
        if !endpoint.is_empty() {
            // Trim trailing `/` so that we can accept `oss-cn-x.aliyuncs.com/`
            self.config.endpoint = Some(endpoint.trim_end_matches('/').to_string());
        }
        self
    }

    /// Compose https public urls.
    pub fn ssl(&mut self, ssl: bool) -> &mut Self {
        self.config.ssl = ssl;
        self
    }

    /// Mark the endpoint as a custom domain bound to the bucket.
    pub fn cname(&mut self, cname: bool) -> &mut Self {
        self.config.cname = cname;
        self
    }

    /// Set the CDN domain that fronts the bucket.
    pub fn cdn_domain(&mut self, domain: &str) -> &mut Self {
        if !domain.is_empty() {
            self.config.cdn_domain = Some(domain.to_string());
        }
        self
    }

    /// Options applied to every call, per-call options win on conflict.
    pub fn default_options(&mut self, options: OperationOptions) -> &mut Self {
        self.default_options = options;
        self
    }

    /// Override the list page size. Production keeps the OSS maximum,
    /// tests lower it to exercise page boundaries.
    pub fn list_page_size(&mut self, v: usize) -> &mut Self {
        self.config.list_page_size = Some(v);
        self
    }

    /// Finish building.
    pub fn build(&mut self) -> Result<OssAdapter> {
        debug!("adapter build started: {:?}", &self);

        let client = self.client.take().ok_or_else(|| {
            Error::new(ErrorKind::ConfigInvalid, "client is required but not set")
        })?;

        if self.config.bucket.is_empty() {
            return Err(Error::new(ErrorKind::ConfigInvalid, "bucket is empty")
                .with_operation("OssAdapterBuilder::build"));
        }

        let root = normalize_root(self.config.prefix.as_deref().unwrap_or_default());
        debug!("adapter use prefix {}", &root);

        let endpoint = self.config.endpoint.as_deref().map(|ep| {
            ep.trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        });

        let list_page_size = self.config.list_page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if list_page_size == 0 {
            return Err(
                Error::new(ErrorKind::ConfigInvalid, "list page size must be positive")
                    .with_operation("OssAdapterBuilder::build"),
            );
        }

        debug!(
            "adapter build finished: bucket {}, endpoint {:?}",
            &self.config.bucket, &endpoint
        );

        Ok(OssAdapter {
            client,
            bucket: self.config.bucket.clone(),
            root,
            endpoint,
            ssl: self.config.ssl,
            cname: self.config.cname,
            cdn_domain: self.config.cdn_domain.clone(),
            default_options: self.default_options.clone(),
            list_page_size,
        })
    }
}

/// Translation layer between filesystem verbs and the OSS client API.
///
/// Holds a configured client handle, the bucket, a key prefix and
/// per-call option defaults; every operation prefixes the logical path,
/// maps options into backend headers and reshapes the response. All
/// configuration is set at construction and never mutated afterwards.
///
/// Every operation is a single pass-through call (listing excepted,
/// which pages) with no retries, timeouts or caching at this layer.
#[derive(Clone)]
pub struct OssAdapter {
    client: Arc<dyn ObjectStore>,
    bucket: String,
    /// Normalized prefix, format `/abc/def/`.
    root: String,
    /// Endpoint domain without scheme.
    endpoint: Option<String>,
    ssl: bool,
    cname: bool,
    cdn_domain: Option<String>,
    default_options: OperationOptions,
    list_page_size: usize,
}

impl Debug for OssAdapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OssAdapter")
            .field("bucket", &self.bucket)
            .field("root", &self.root)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OssAdapter {
    /// The builder of this adapter.
    pub fn builder() -> OssAdapterBuilder {
        OssAdapterBuilder::default()
    }

    /// The configured bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The normalized key prefix, format `/abc/def/`.
    pub fn prefix(&self) -> &str {
        &self.root
    }

    /// The underlying client handle.
    pub fn client(&self) -> Arc<dyn ObjectStore> {
        self.client.clone()
    }

    fn lister(&self) -> DirectoryLister {
        DirectoryLister::new(self.client.clone(), &self.bucket)
            .with_page_size(self.list_page_size)
    }

    /// Backend key of a logical path: the configured prefix prepended
    /// to the normalized path.
    fn apply_prefix(&self, path: &str) -> String {
        build_abs_path(&self.root, &normalize_path(path))
    }

    /// Backend key of a logical directory path, with the trailing
    /// delimiter guaranteed.
    fn apply_dir_prefix(&self, path: &str) -> String {
        let key = self.apply_prefix(path);
        if key.is_empty() || key.ends_with('/') {
            key
        } else {
            format!("{key}/")
        }
    }

    fn merged_headers(&self, options: &OperationOptions) -> crate::Headers {
        self.default_options.merged_with(options).to_headers()
    }

    /// Store content at path, creating or overwriting the object.
    ///
    /// Defaults and per-call options are merged into backend headers.
    /// Content type and length are never inferred from the path or the
    /// content, the caller spells them out or the backend decides.
    pub async fn write(
        &self,
        path: &str,
        content: impl Into<Bytes>,
        options: &OperationOptions,
    ) -> Result<()> {
        let key = self.apply_prefix(path);
        debug!("object {key} write start");
        self.client
            .put_object(&self.bucket, &key, content.into(), self.merged_headers(options))
            .await
            .map_err(|e| e.with_operation("write").with_context("path", path))
    }

    /// Store content from a reader, draining it fully first.
    pub async fn write_stream(
        &self,
        path: &str,
        mut reader: impl futures::AsyncRead + Send + Unpin,
        options: &OperationOptions,
    ) -> Result<()> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.map_err(|e| {
            Error::new(ErrorKind::Unexpected, "reading the input stream failed")
                .with_operation("write_stream")
                .with_context("path", path)
                .set_source(e)
        })?;
        self.write(path, content, options).await
    }

    /// Overwrite the object at path, preserving its visibility.
    ///
    /// An OSS overwrite resets the object ACL, so unless the caller
    /// pinned visibility or an ACL option the current ACL is fetched
    /// and carried forward.
    pub async fn update(
        &self,
        path: &str,
        content: impl Into<Bytes>,
        options: &OperationOptions,
    ) -> Result<()> {
        let mut options = options.clone();
        if !options.carries_acl() {
            let acl = ObjectAcl::from(self.visibility(path).await?);
            options = options.with(OperationKey::Acl, acl.into_static());
        }
        self.write(path, content, &options).await
    }

    /// Overwrite from a reader, preserving visibility like [`update`].
    ///
    /// [`update`]: OssAdapter::update
    pub async fn update_stream(
        &self,
        path: &str,
        mut reader: impl futures::AsyncRead + Send + Unpin,
        options: &OperationOptions,
    ) -> Result<()> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.map_err(|e| {
            Error::new(ErrorKind::Unexpected, "reading the input stream failed")
                .with_operation("update_stream")
                .with_context("path", path)
                .set_source(e)
        })?;
        self.update(path, content, options).await
    }

    /// Fetch the full content of the object at path.
    pub async fn read(&self, path: &str) -> Result<Bytes> {
        let key = self.apply_prefix(path);
        self.client
            .get_object(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("read").with_context("path", path))
    }

    /// Open a lazily-consumed reader over the object at path.
    ///
    /// The returned stream is positioned at the start and stays owned
    /// by the caller.
    pub async fn read_stream(&self, path: &str) -> Result<Reader> {
        let key = self.apply_prefix(path);
        self.client
            .get_object_reader(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("read_stream").with_context("path", path))
    }

    /// Delete the object at path. Deleting a missing key is not an
    /// error at this layer.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let key = self.apply_prefix(path);
        self.client
            .delete_object(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("delete").with_context("path", path))
    }

    /// Delete every object under path, then the directory marker.
    ///
    /// Keys are enumerated recursively page by page; the loop advances
    /// on the backend cursor and stops when the backend reports no
    /// further pages. Zero-object directories skip the batch delete.
    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        let dir = self.apply_dir_prefix(path);
        debug!("dir {dir} delete start");

        let entries = self
            .lister()
            .list(&dir, true)
            .await
            .map_err(|e| e.with_operation("delete_directory").with_context("path", path))?;

        // Sub-prefixes can surface both as roll-ups and as their own
        // marker objects, deleting a key twice is wasted work.
        let keys: Vec<String> = entries
            .into_iter()
            .map(|e| e.key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            self.client
                .delete_objects(&self.bucket, batch.to_vec())
                .await
                .map_err(|e| e.with_operation("delete_directory").with_context("path", path))?;
        }

        if !dir.is_empty() {
            self.client
                .delete_object(&self.bucket, &dir)
                .await
                .map_err(|e| e.with_operation("delete_directory").with_context("path", path))?;
        }

        Ok(())
    }

    /// Create a zero-byte marker object representing a directory.
    pub async fn create_directory(&self, path: &str, options: &OperationOptions) -> Result<Entry> {
        let key = self.apply_dir_prefix(path);
        // With no prefix the bucket root resolves to an empty key, which
        // is not a creatable object.
        if key.is_empty() {
            return Err(Error::new(
                ErrorKind::Unexpected,
                "the bucket root is not a creatable directory",
            )
            .with_operation("create_directory")
            .with_context("path", path));
        }

        self.client
            .create_object_dir(&self.bucket, &key, self.merged_headers(options))
            .await
            .map_err(|e| e.with_operation("create_directory").with_context("path", path))?;

        let mut rel = build_rel_path(&self.root, &key);
        if rel.is_empty() {
            rel = "/".to_string();
        }
        Ok(Entry::new(rel, Metadata::new(EntryMode::DIR)))
    }

    /// Server-side copy. Fails with the backend error when the source
    /// is missing; the source content is left unchanged.
    pub async fn copy(
        &self,
        source: &str,
        destination: &str,
        options: &OperationOptions,
    ) -> Result<()> {
        let src = self.apply_prefix(source);
        let dst = self.apply_prefix(destination);
        self.client
            .copy_object(&self.bucket, &src, &self.bucket, &dst, self.merged_headers(options))
            .await
            .map_err(|e| {
                e.with_operation("copy")
                    .with_context("from", source)
                    .with_context("to", destination)
            })
    }

    /// Move the object by copying then deleting the source.
    ///
    /// OSS has no atomic rename across keys, so this is a two-phase
    /// operation: copy, verify the destination exists, delete the
    /// source. A failure between the phases leaves both keys present;
    /// callers that observe the partial state must remediate.
    pub async fn rename(
        &self,
        source: &str,
        destination: &str,
        options: &OperationOptions,
    ) -> Result<()> {
        debug!("object {source} rename to {destination} start");
        self.copy(source, destination, options).await?;

        let dst = self.apply_prefix(destination);
        let copied = self
            .client
            .object_exists(&self.bucket, &dst)
            .await
            .map_err(|e| e.with_operation("rename").with_context("to", destination))?;
        if !copied {
            return Err(Error::new(
                ErrorKind::Unexpected,
                "destination is missing after copy, source left in place",
            )
            .with_operation("rename")
            .with_context("from", source)
            .with_context("to", destination));
        }

        self.delete(source)
            .await
            .map_err(|e| e.with_operation("rename").with_context("from", source))
    }

    /// Apply a visibility onto the object at path.
    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let key = self.apply_prefix(path);
        self.client
            .put_object_acl(&self.bucket, &key, ObjectAcl::from(visibility))
            .await
            .map_err(|e| e.with_operation("set_visibility").with_context("path", path))
    }

    /// Access classification of the object at path, from its ACL.
    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        let key = self.apply_prefix(path);
        let acl = self
            .client
            .get_object_acl(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("visibility").with_context("path", path))?;
        Ok(Visibility::from(acl))
    }

    /// Check whether an object exists at path.
    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        let key = self.apply_prefix(path);
        self.client
            .object_exists(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("exists").with_context("path", path))
    }

    /// Check whether a directory exists at path.
    ///
    /// The backend can't tell an object from a directory marker, so
    /// this is the same existence check as [`file_exists`]. Pass the
    /// trailing delimiter to probe a marker key.
    ///
    /// [`file_exists`]: OssAdapter::file_exists
    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        self.file_exists(path).await
    }

    /// Enumerate objects under path, flat or recursive.
    ///
    /// Each object is normalized into an [`Entry`]; keys that don't
    /// resolve under the configured prefix are filtered out, and the
    /// intermediate directories a key implies are synthesized since the
    /// backend has no real directories. Order within a page is the
    /// backend's, no cross-page sort is imposed.
    pub async fn list_contents(&self, path: &str, recursive: bool) -> Result<Vec<Entry>> {
        let dir = self.apply_dir_prefix(path);

        let listed = self
            .lister()
            .list(&dir, recursive)
            .await
            .map_err(|e| e.with_operation("list_contents").with_context("path", path))?;

        let listed_rel = if dir.is_empty() {
            String::new()
        } else {
            build_rel_path(&self.root, &dir)
        };

        let mut entries = Vec::with_capacity(listed.len());
        let mut seen_dirs: BTreeSet<String> = BTreeSet::new();

        for item in listed {
            // Keys outside the configured prefix have no resolvable
            // logical path.
            if !item.key.starts_with(&self.root[1..]) {
                continue;
            }
            let rel = build_rel_path(&self.root, &item.key);
            if rel.is_empty() || rel == listed_rel {
                continue;
            }
            if item.metadata.is_dir() && !seen_dirs.insert(rel.clone()) {
                continue;
            }
            entries.push(Entry::new(rel, item.metadata));
        }

        // Synthesize the intermediate directories implied by the keys.
        let mut implied = Vec::new();
        for entry in &entries {
            let mut parent = get_parent(entry.path()).to_string();
            while parent != "/" && parent != listed_rel && seen_dirs.insert(parent.clone()) {
                implied.push(parent.clone());
                parent = get_parent(&parent).to_string();
            }
        }
        for dir in implied {
            entries.push(Entry::new(dir, Metadata::new(EntryMode::DIR)));
        }

        Ok(entries)
    }

    /// Fetch the normalized attribute record of the object at path.
    ///
    /// Fails with a not-found error for a missing key, silent default
    /// metadata is never returned.
    pub async fn metadata(&self, path: &str) -> Result<Metadata> {
        let key = self.apply_prefix(path);
        let head = self
            .client
            .head_object(&self.bucket, &key)
            .await
            .map_err(|e| e.with_operation("metadata").with_context("path", path))?;
        Ok(normalize_head(&key, head))
    }

    /// Content length of the object at path, in bytes.
    ///
    /// One backend round trip, like every metadata accessor.
    pub async fn file_size(&self, path: &str) -> Result<u64> {
        let meta = self.metadata(path).await?;
        Ok(meta.content_length().unwrap_or_default())
    }

    /// Content type of the object at path, if the backend reported one.
    pub async fn mime_type(&self, path: &str) -> Result<Option<String>> {
        let meta = self.metadata(path).await?;
        Ok(meta.content_type().map(String::from))
    }

    /// Last modified time of the object at path.
    pub async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let meta = self.metadata(path).await?;
        meta.last_modified().ok_or_else(|| {
            Error::new(ErrorKind::Unexpected, "backend reported no last-modified time")
                .with_operation("last_modified")
                .with_context("path", path)
        })
    }

    /// Public url of the object at path.
    ///
    /// The CDN domain wins when configured, then the custom domain,
    /// then `{bucket}.{endpoint}`.
    pub fn public_url(&self, path: &str) -> Result<String> {
        let key = self.apply_prefix(path);
        let scheme = if self.ssl { "https" } else { "http" };

        let host = if let Some(cdn) = &self.cdn_domain {
            cdn.clone()
        } else {
            let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                Error::new(ErrorKind::ConfigInvalid, "endpoint is not configured")
                    .with_operation("public_url")
            })?;
            if self.cname {
                endpoint.to_string()
            } else {
                format!("{}.{}", self.bucket, endpoint)
            }
        };

        Ok(format!("{scheme}://{host}/{key}"))
    }
}

fn normalize_head(key: &str, head: ObjectHead) -> Metadata {
    let mut meta = Metadata::new(EntryMode::from_path(key));
    meta.set_content_length(head.content_length);
    if let Some(v) = &head.content_type {
        meta.set_content_type(v);
    }
    if let Some(v) = &head.etag {
        meta.set_etag(v);
    }
    if let Some(v) = head.last_modified {
        meta.set_last_modified(v);
    }
    if let Some(v) = &head.storage_class {
        meta.set_storage_class(v);
    }
    meta
}
