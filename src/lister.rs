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

//! Paginated enumeration of a prefix's keys and sub-prefixes.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::client::ListObjectsQuery;
use crate::EntryMode;
use crate::Metadata;
use crate::ObjectStore;
use crate::Result;

/// Objects plus common prefixes per page, the OSS maximum.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One row of a directory listing, keyed by the full backend key.
///
/// Both objects and sub-prefix directories are surfaced, at every depth.
/// A sub-prefix that exists only as a roll-up (no marker object) carries
/// a bare `DIR` metadata.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListedEntry {
    /// Full backend key, directories end with the delimiter.
    pub key: String,
    /// Attributes known from the listing.
    pub metadata: Metadata,
}

/// DirectoryLister walks a prefix page by page.
///
/// Each page advances on the opaque cursor the backend returned, and the
/// loop stops as soon as the backend stops signalling further pages.
/// Recursion into sub-prefixes is serial, one backend round trip per
/// page per prefix.
#[derive(Clone, Debug)]
pub struct DirectoryLister {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    page_size: usize,
}

impl DirectoryLister {
    /// Create a lister over the given store and bucket.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size. Only useful to exercise page boundaries
    /// in tests, production keeps the OSS maximum.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Enumerate all keys and sub-prefixes under `prefix`.
    ///
    /// With `recursive`, discovered sub-prefixes are descended into
    /// after the current prefix's pages finish; their directory entries
    /// stay in the result alongside their objects.
    pub async fn list(&self, prefix: &str, recursive: bool) -> Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        self.list_into(prefix.to_string(), recursive, &mut entries)
            .await?;
        Ok(entries)
    }

    fn list_into<'a>(
        &'a self,
        prefix: String,
        recursive: bool,
        out: &'a mut Vec<ListedEntry>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut marker = String::new();
            let mut sub_prefixes = Vec::new();

            loop {
                let output = self
                    .store
                    .list_objects(
                        &self.bucket,
                        ListObjectsQuery {
                            prefix: prefix.clone(),
                            delimiter: "/".to_string(),
                            marker: marker.clone(),
                            max_keys: self.page_size,
                        },
                    )
                    .await?;

                let has_more = output.has_more();

                for object in output.objects {
                    let mut metadata = Metadata::new(EntryMode::from_path(&object.key));
                    metadata.set_content_length(object.size);
                    if let Some(v) = &object.etag {
                        metadata.set_etag(v);
                    }
                    if let Some(v) = object.last_modified {
                        metadata.set_last_modified(v);
                    }
                    if let Some(v) = &object.storage_class {
                        metadata.set_storage_class(v);
                    }
                    out.push(ListedEntry {
                        key: object.key,
                        metadata,
                    });
                }

                for sub_prefix in output.common_prefixes {
                    out.push(ListedEntry {
                        key: sub_prefix.clone(),
                        metadata: Metadata::new(EntryMode::DIR),
                    });
                    sub_prefixes.push(sub_prefix);
                }

                // The cursor is opaque. The only valid exit is the
                // backend reporting no further pages, checked on every
                // iteration.
                if !has_more {
                    break;
                }
                marker = output.next_marker.unwrap_or_default();
            }

            if recursive {
                for sub_prefix in sub_prefixes {
                    self.list_into(sub_prefix, recursive, out).await?;
                }
            }

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::Headers;

    async fn lister_with(keys: &[&str], page_size: usize) -> DirectoryLister {
        let store = MemoryStore::new();
        for key in keys {
            store
                .put_object("test", key, Bytes::from_static(b"x"), Headers::new())
                .await
                .unwrap();
        }
        DirectoryLister::new(Arc::new(store), "test").with_page_size(page_size)
    }

    fn keys_of(entries: &[ListedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_flat_listing_stops_at_delimiter() {
        let lister = lister_with(&["dir/a", "dir/sub/b", "dir/sub/c", "dir/z"], 1000).await;

        let entries = lister.list("dir/", false).await.unwrap();
        assert_eq!(keys_of(&entries), vec!["dir/a", "dir/z", "dir/sub/"]);
        assert!(entries[2].metadata.is_dir());
    }

    #[tokio::test]
    async fn test_recursive_listing_keeps_directory_entries() {
        let lister = lister_with(&["dir/a", "dir/sub/b", "dir/sub/deep/c"], 1000).await;

        let entries = lister.list("dir/", true).await.unwrap();
        assert_eq!(
            keys_of(&entries),
            vec!["dir/a", "dir/sub/", "dir/sub/b", "dir/sub/deep/", "dir/sub/deep/c"]
        );
    }

    #[tokio::test]
    async fn test_listing_crosses_page_boundaries() {
        let keys: Vec<String> = (0..7).map(|i| format!("dir/f{i}")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let lister = lister_with(&refs, 3).await;

        let entries = lister.list("dir/", false).await.unwrap();
        assert_eq!(entries.len(), 7);
        assert_eq!(keys_of(&entries), refs);
    }

    #[tokio::test]
    async fn test_listing_at_exact_page_size() {
        let keys: Vec<String> = (0..3).map(|i| format!("dir/f{i}")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let lister = lister_with(&refs, 3).await;

        let entries = lister.list("dir/", false).await.unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_listing_empty_prefix() {
        let lister = lister_with(&["other/a"], 1000).await;

        let entries = lister.list("dir/", false).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_recursive_listing_includes_marker_objects() {
        let lister = lister_with(&["dir/sub/", "dir/sub/a"], 1000).await;

        let entries = lister.list("dir/", true).await.unwrap();
        // `dir/sub/` appears once as the rolled-up prefix and once as
        // its own zero-byte marker object.
        assert_eq!(keys_of(&entries), vec!["dir/sub/", "dir/sub/", "dir/sub/a"]);
        assert_eq!(entries[1].metadata.content_length(), Some(0));
    }
}
