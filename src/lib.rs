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

//! Filesystem-style adapter for Aliyun Object Storage Service (OSS).
//!
//! The adapter presents a bucket as a filesystem: logical paths in,
//! normalized entries and metadata out. It owns the path prefixing, the
//! option-to-header translation and the pagination loops, and delegates
//! every backend call to an [`ObjectStore`] implementation. Transport,
//! signing and the wire protocol live behind that trait.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use oss_adapter::MemoryStore;
//! use oss_adapter::OperationOptions;
//! use oss_adapter::OssAdapter;
//! use oss_adapter::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut builder = OssAdapter::builder();
//!     builder
//!         .client(Arc::new(MemoryStore::new()))
//!         .bucket("test")
//!         .prefix("uploads");
//!     let adapter = builder.build()?;
//!
//!     adapter
//!         .write("hello.txt", "Hello, World!", &OperationOptions::new())
//!         .await?;
//!     let content = adapter.read("hello.txt").await?;
//!     assert_eq!(content, "Hello, World!");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod error;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;

pub mod path;

mod metadata;
pub use metadata::Entry;
pub use metadata::EntryMode;
pub use metadata::Metadata;

mod options;
pub use options::Headers;
pub use options::ObjectAcl;
pub use options::OperationKey;
pub use options::OperationOptions;
pub use options::Visibility;

pub mod client;
pub use client::ObjectStore;
pub use client::Reader;

mod memory;
pub use memory::MemoryStore;

mod lister;
pub use lister::DirectoryLister;
pub use lister::ListedEntry;
pub use lister::DEFAULT_PAGE_SIZE;

mod adapter;
pub use adapter::OssAdapter;
pub use adapter::OssAdapterBuilder;
pub use adapter::OssAdapterConfig;
