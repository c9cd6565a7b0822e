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

//! The outbound contract towards the object-storage client.
//!
//! The adapter never speaks the OSS wire protocol itself. Everything
//! below this trait, transport, XML codecs and request signing included,
//! belongs to the client implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use chrono::Utc;

use crate::Headers;
use crate::ObjectAcl;
use crate::Result;

/// A lazily-consumed byte stream positioned at the start of an object.
///
/// The caller owns the stream, implementations must not detach or close
/// the underlying transport while it is still being read.
pub type Reader = Box<dyn futures::AsyncRead + Send + Unpin>;

/// Attributes returned by a metadata (head) call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ObjectHead {
    /// Content length, in bytes.
    pub content_length: u64,
    /// Content type the object was stored with.
    pub content_type: Option<String>,
    /// Entity tag of the object.
    pub etag: Option<String>,
    /// Last modified time of the object.
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class of the object.
    pub storage_class: Option<String>,
}

/// Query of a list objects call.
///
/// `marker` is an opaque cursor. Callers feed back whatever the backend
/// returned and never inspect it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListObjectsQuery {
    /// Only keys starting with this prefix are listed.
    pub prefix: String,
    /// Keys are rolled up into common prefixes at this delimiter.
    /// Empty means no roll up.
    pub delimiter: String,
    /// Opaque cursor, empty on the first page.
    pub marker: String,
    /// Upper bound of objects plus common prefixes per page.
    pub max_keys: usize,
}

/// One object row of a list page.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListedObject {
    /// Full backend key of the object.
    pub key: String,
    /// Content length, in bytes.
    pub size: u64,
    /// Entity tag of the object.
    pub etag: Option<String>,
    /// Last modified time of the object.
    pub last_modified: Option<DateTime<Utc>>,
    /// Storage class of the object.
    pub storage_class: Option<String>,
}

/// One page of a list objects call.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ListObjectsOutput {
    /// Objects of this page, in backend order.
    pub objects: Vec<ListedObject>,
    /// Sub-prefixes rolled up at the delimiter.
    pub common_prefixes: Vec<String>,
    /// Cursor of the next page. Absent or empty means no further pages.
    pub next_marker: Option<String>,
    /// Whether the backend reports more pages.
    pub is_truncated: bool,
}

impl ListObjectsOutput {
    /// Whether the backend signalled a further page.
    ///
    /// Listing loops MUST check this every iteration and stop when it
    /// turns false.
    pub fn has_more(&self) -> bool {
        self.is_truncated && self.next_marker.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Bucket-scoped operations the backing client must provide.
///
/// This is the seam between the adapter and the OSS SDK. All methods
/// take the bucket per call the way the OSS client API does, and raise
/// the crate's [`Error`](crate::Error) type on backend failure.
#[async_trait]
pub trait ObjectStore: Debug + Send + Sync + 'static {
    /// Store content at key, creating or overwriting the object.
    ///
    /// Headers are applied verbatim to the request.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        headers: Headers,
    ) -> Result<()>;

    /// Fetch the full content of the object at key.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Open a reader over the object at key, positioned at the start.
    async fn get_object_reader(&self, bucket: &str, key: &str) -> Result<Reader>;

    /// Fetch object attributes without its content.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead>;

    /// Check whether an object exists at key.
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Delete the object at key. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Delete a batch of keys in one call.
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<()>;

    /// Server-side copy of one object onto another key.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        headers: Headers,
    ) -> Result<()>;

    /// Create a zero-byte directory marker at key.
    ///
    /// Implementations append the trailing delimiter if it's missing.
    async fn create_object_dir(&self, bucket: &str, key: &str, headers: Headers) -> Result<()>;

    /// Fetch the canned ACL of the object at key.
    async fn get_object_acl(&self, bucket: &str, key: &str) -> Result<ObjectAcl>;

    /// Apply a canned ACL onto the object at key.
    async fn put_object_acl(&self, bucket: &str, key: &str, acl: ObjectAcl) -> Result<()>;

    /// List one page of objects and common prefixes.
    async fn list_objects(
        &self,
        bucket: &str,
        query: ListObjectsQuery,
    ) -> Result<ListObjectsOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more() {
        let mut out = ListObjectsOutput::default();
        assert!(!out.has_more());

        out.is_truncated = true;
        assert!(!out.has_more(), "truncated without a marker is done");

        out.next_marker = Some("abc".to_string());
        assert!(out.has_more());

        out.next_marker = Some(String::new());
        assert!(!out.has_more(), "empty marker means no further pages");
    }
}
