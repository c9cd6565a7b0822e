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

//! Normalized attribute records for stored objects and listings.

use chrono::DateTime;
use chrono::Utc;

/// EntryMode represents the mode of an entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum EntryMode {
    /// FILE means the entry has data to read.
    FILE,
    /// DIR means the entry can be listed.
    DIR,
    /// Unknown means we don't know what we can do on this entry.
    #[default]
    Unknown,
}

impl EntryMode {
    /// Check if this mode is FILE.
    pub fn is_file(self) -> bool {
        self == EntryMode::FILE
    }

    /// Check if this mode is DIR.
    pub fn is_dir(self) -> bool {
        self == EntryMode::DIR
    }

    /// Create entry mode from a path.
    ///
    /// OSS has no real directories, a trailing delimiter is the only
    /// directory signal a key carries.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with('/') {
            EntryMode::DIR
        } else {
            EntryMode::FILE
        }
    }

    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            EntryMode::FILE => "file",
            EntryMode::DIR => "dir",
            EntryMode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Metadata carries all known attributes of a stored object.
///
/// Attributes that the backend didn't report stay `None`, they are never
/// filled with silent defaults.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct Metadata {
    mode: EntryMode,

    content_length: Option<u64>,
    content_type: Option<String>,
    etag: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    storage_class: Option<String>,
}

impl Metadata {
    /// Create a new metadata with the given mode.
    pub fn new(mode: EntryMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Entry mode of this metadata.
    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Check if this metadata is for a file.
    pub fn is_file(&self) -> bool {
        self.mode.is_file()
    }

    /// Check if this metadata is for a dir.
    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Content length of this entry, in bytes.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Set content length of this entry.
    pub fn set_content_length(&mut self, v: u64) -> &mut Self {
        self.content_length = Some(v);
        self
    }

    /// Content type (mime type) of this entry.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Set content type of this entry.
    pub fn set_content_type(&mut self, v: &str) -> &mut Self {
        self.content_type = Some(v.to_string());
        self
    }

    /// Entity tag of this entry, as the backend reported it.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Set entity tag of this entry.
    pub fn set_etag(&mut self, v: &str) -> &mut Self {
        self.etag = Some(v.to_string());
        self
    }

    /// Last modified time of this entry.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Set last modified time of this entry.
    pub fn set_last_modified(&mut self, v: DateTime<Utc>) -> &mut Self {
        self.last_modified = Some(v);
        self
    }

    /// Storage class of this entry, like `Standard` or `Archive`.
    pub fn storage_class(&self) -> Option<&str> {
        self.storage_class.as_deref()
    }

    /// Set storage class of this entry.
    pub fn set_storage_class(&mut self, v: &str) -> &mut Self {
        self.storage_class = Some(v.to_string());
        self
    }
}

/// Entry is a logical path carrying its [`Metadata`].
///
/// Listings return entries for both files and directories at every
/// depth, directories are not discarded while flattening.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    path: String,
    metadata: Metadata,
}

impl Entry {
    /// Create a new entry.
    pub fn new(path: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            path: path.into(),
            metadata,
        }
    }

    /// Logical path of this entry, relative to the configured prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Entry mode, shorthand for `self.metadata().mode()`.
    pub fn mode(&self) -> EntryMode {
        self.metadata.mode()
    }

    /// Metadata of this entry.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
