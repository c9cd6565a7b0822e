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

//! Per-operation options and their translation into backend headers.
//!
//! The option name to header name mapping is a single declarative table
//! ([`OperationKey::header_name`]), there is no shared mutable lookup
//! state anywhere.

use std::collections::BTreeMap;

use crate::Error;
use crate::ErrorKind;
use crate::Result;

/// Two-valued access classification of a stored object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Visibility {
    /// Anyone can read the object.
    Public,
    /// Only authorized requests can read the object.
    Private,
}

impl Visibility {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl std::str::FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            v => Err(Error::new(
                ErrorKind::ConfigInvalid,
                format!("visibility {v} is not supported"),
            )),
        }
    }
}

/// Canned ACL of an OSS object.
///
/// `Default` means the object inherits the bucket ACL.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum ObjectAcl {
    /// Inherit the bucket ACL.
    #[default]
    Default,
    /// Only the owner can read and write.
    Private,
    /// Anyone can read, only the owner can write.
    PublicRead,
    /// Anyone can read and write.
    PublicReadWrite,
}

impl ObjectAcl {
    /// The ACL string OSS expects in the `x-oss-object-acl` header.
    pub fn into_static(self) -> &'static str {
        match self {
            ObjectAcl::Default => "default",
            ObjectAcl::Private => "private",
            ObjectAcl::PublicRead => "public-read",
            ObjectAcl::PublicReadWrite => "public-read-write",
        }
    }
}

impl std::fmt::Display for ObjectAcl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

impl std::str::FromStr for ObjectAcl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(ObjectAcl::Default),
            "private" => Ok(ObjectAcl::Private),
            "public-read" => Ok(ObjectAcl::PublicRead),
            "public-read-write" => Ok(ObjectAcl::PublicReadWrite),
            v => Err(Error::new(
                ErrorKind::Unexpected,
                format!("object acl {v} is not recognized"),
            )),
        }
    }
}

impl From<Visibility> for ObjectAcl {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => ObjectAcl::PublicRead,
            Visibility::Private => ObjectAcl::Private,
        }
    }
}

impl From<ObjectAcl> for Visibility {
    fn from(v: ObjectAcl) -> Self {
        match v {
            ObjectAcl::PublicRead | ObjectAcl::PublicReadWrite => Visibility::Public,
            ObjectAcl::Private | ObjectAcl::Default => Visibility::Private,
        }
    }
}

/// Recognized per-operation option names.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum OperationKey {
    /// Cache directives for the object.
    CacheControl,
    /// Expiry time for the object.
    Expires,
    /// Server side encryption algorithm.
    ServerSideEncryption,
    /// Metadata directive used by copy.
    MetadataDirective,
    /// Canned ACL for the object.
    Acl,
    /// Content type of the object.
    ContentType,
    /// Content disposition of the object.
    ContentDisposition,
    /// Content language the object responds with.
    ContentLanguage,
    /// Content encoding of the object.
    ContentEncoding,
}

impl OperationKey {
    /// Every recognized option, in table order.
    pub const ALL: [OperationKey; 9] = [
        OperationKey::CacheControl,
        OperationKey::Expires,
        OperationKey::ServerSideEncryption,
        OperationKey::MetadataDirective,
        OperationKey::Acl,
        OperationKey::ContentType,
        OperationKey::ContentDisposition,
        OperationKey::ContentLanguage,
        OperationKey::ContentEncoding,
    ];

    /// The backend header each option maps onto.
    ///
    /// This is the whole translation table, passed verbatim as request
    /// headers to the backend.
    pub fn header_name(self) -> &'static str {
        match self {
            OperationKey::CacheControl => "Cache-Control",
            OperationKey::Expires => "Expires",
            OperationKey::ServerSideEncryption => "x-oss-server-side-encryption",
            OperationKey::MetadataDirective => "x-oss-metadata-directive",
            OperationKey::Acl => "x-oss-object-acl",
            OperationKey::ContentType => "Content-Type",
            OperationKey::ContentDisposition => "Content-Disposition",
            OperationKey::ContentLanguage => "response-content-language",
            OperationKey::ContentEncoding => "Content-Encoding",
        }
    }
}

/// Headers passed verbatim to the backend.
pub type Headers = BTreeMap<String, String>;

/// Options merged from adapter-level defaults and per-call overrides.
///
/// `visibility` and `mime_type` are conveniences that expand into the
/// ACL and Content-Type headers, matching the way framework callers
/// spell them.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OperationOptions {
    entries: BTreeMap<OperationKey, String>,
    visibility: Option<Visibility>,
    mime_type: Option<String>,
}

impl OperationOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option value.
    pub fn set(&mut self, key: OperationKey, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key, value.into());
        self
    }

    /// Set an option value, builder style.
    pub fn with(mut self, key: OperationKey, value: impl Into<String>) -> Self {
        self.entries.insert(key, value.into());
        self
    }

    /// Get an option value.
    pub fn get(&self, key: OperationKey) -> Option<&str> {
        self.entries.get(&key).map(|v| v.as_str())
    }

    /// Request a visibility for the written object.
    pub fn with_visibility(mut self, v: Visibility) -> Self {
        self.visibility = Some(v);
        self
    }

    /// Requested visibility, if any.
    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    /// Request a mime type for the written object.
    pub fn with_mime_type(mut self, v: impl Into<String>) -> Self {
        self.mime_type = Some(v.into());
        self
    }

    /// Check whether the caller pinned the object ACL, either through
    /// the ACL option or the visibility shorthand.
    pub fn carries_acl(&self) -> bool {
        self.visibility.is_some() || self.entries.contains_key(&OperationKey::Acl)
    }

    /// Layer `overrides` on top of `self`, per-call values win.
    pub fn merged_with(&self, overrides: &OperationOptions) -> OperationOptions {
        let mut out = self.clone();
        for (k, v) in &overrides.entries {
            out.entries.insert(*k, v.clone());
        }
        if overrides.visibility.is_some() {
            out.visibility = overrides.visibility;
        }
        if overrides.mime_type.is_some() {
            out.mime_type = overrides.mime_type.clone();
        }
        out
    }

    /// Expand into the backend header map.
    ///
    /// The visibility and mime type shorthands are applied after the
    /// plain entries, so they take precedence on conflict.
    pub fn to_headers(&self) -> Headers {
        let mut headers = Headers::new();

        for (k, v) in &self.entries {
            headers.insert(k.header_name().to_string(), v.clone());
        }

        if let Some(v) = self.visibility {
            headers.insert(
                OperationKey::Acl.header_name().to_string(),
                ObjectAcl::from(v).into_static().to_string(),
            );
        }

        if let Some(v) = &self.mime_type {
            headers.insert(
                OperationKey::ContentType.header_name().to_string(),
                v.clone(),
            );
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_header_table_is_total() {
        for key in OperationKey::ALL {
            assert!(!key.header_name().is_empty());
        }
    }

    #[test]
    fn test_acl_visibility_round_trip() {
        assert_eq!(ObjectAcl::from(Visibility::Public), ObjectAcl::PublicRead);
        assert_eq!(ObjectAcl::from(Visibility::Private), ObjectAcl::Private);
        assert_eq!(Visibility::from(ObjectAcl::PublicReadWrite), Visibility::Public);
        assert_eq!(Visibility::from(ObjectAcl::Default), Visibility::Private);
    }

    #[test]
    fn test_to_headers() {
        let opts = OperationOptions::new()
            .with(OperationKey::CacheControl, "max-age=300")
            .with_visibility(Visibility::Public)
            .with_mime_type("image/png");

        let headers = opts.to_headers();
        assert_eq!(headers.get("Cache-Control").map(String::as_str), Some("max-age=300"));
        assert_eq!(headers.get("x-oss-object-acl").map(String::as_str), Some("public-read"));
        assert_eq!(headers.get("Content-Type").map(String::as_str), Some("image/png"));
    }

    #[test]
    fn test_visibility_shorthand_wins_over_acl_entry() {
        let opts = OperationOptions::new()
            .with(OperationKey::Acl, "private")
            .with_visibility(Visibility::Public);

        let headers = opts.to_headers();
        assert_eq!(headers.get("x-oss-object-acl").map(String::as_str), Some("public-read"));
    }

    #[test]
    fn test_merged_with() {
        let defaults = OperationOptions::new()
            .with(OperationKey::CacheControl, "max-age=60")
            .with(OperationKey::ContentEncoding, "gzip");
        let per_call = OperationOptions::new().with(OperationKey::CacheControl, "no-cache");

        let merged = defaults.merged_with(&per_call);
        assert_eq!(merged.get(OperationKey::CacheControl), Some("no-cache"));
        assert_eq!(merged.get(OperationKey::ContentEncoding), Some("gzip"));
    }

    #[test]
    fn test_carries_acl() {
        assert!(!OperationOptions::new().carries_acl());
        assert!(OperationOptions::new()
            .with(OperationKey::Acl, "private")
            .carries_acl());
        assert!(OperationOptions::new()
            .with_visibility(Visibility::Public)
            .carries_acl());
    }
}
