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

//! The failure type every operation reports.
//!
//! There is exactly one error type in this crate; callers branch on
//! [`ErrorKind`] instead of mixing sentinel returns with exceptions:
//!
//! ```no_run
//! # use oss_adapter::{ErrorKind, OssAdapter, Result};
//! # async fn check(adapter: OssAdapter) -> Result<()> {
//! if let Err(e) = adapter.metadata("missing.txt").await {
//!     if e.kind() == ErrorKind::NotFound {
//!         println!("object not exist")
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

/// Result alias used by every fallible function in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classified failures an OSS-backed operation can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The backend failed in a way the adapter can't classify, it is
    /// handed back as-is.
    Unexpected,
    /// The adapter configuration is invalid or incomplete.
    ConfigInvalid,
    /// The requested key doesn't exist on the backend.
    NotFound,
    /// The credentials don't allow this operation on this key.
    PermissionDenied,
    /// The backend is throttling requests for this key.
    RateLimited,
}

impl ErrorKind {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::RateLimited => "RateLimited",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.into_static())
    }
}

/// Error returned by all adapter operations.
///
/// Carries the failing operation, a `key=value` context trail, an
/// optional source error and a retryability flag. `Display` is a single
/// line; `Debug` adds the source chain and a backtrace when one was
/// captured.
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    retryable: bool,
    source: Option<anyhow::Error>,
    backtrace: Backtrace,
}

impl Error {
    /// Create a new error from kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        // A missing key is a routine outcome, not worth a capture.
        let backtrace = if kind == ErrorKind::NotFound {
            Backtrace::disabled()
        } else {
            Backtrace::capture()
        };

        Self {
            kind,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            retryable: false,
            source: None,
            backtrace,
        }
    }

    /// Name the operation this error surfaced from.
    ///
    /// An already-named error keeps the inner name in context as `via`,
    /// so wrapping layers don't erase where the failure started.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("via", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Append a `key=value` pair to the context trail.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying cause.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "the source error has been set");

        self.source = Some(source.into());
        self
    }

    /// Mark this error as retryable, e.g. a throttle or a transient
    /// backend outage.
    pub fn set_temporary(mut self) -> Self {
        self.retryable = true;
        self
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a retry of the failed operation may succeed.
    pub fn is_temporary(&self) -> bool {
        self.retryable
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.operation.is_empty() {
            write!(f, "{}", self.kind)?;
        } else {
            write!(f, "{} failed: {}", self.operation, self.kind)?;
        }

        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        if !self.context.is_empty() {
            let ctx = self
                .context
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({ctx})")?;
        }

        if let Some(source) = &self.source {
            write!(f, ", caused by: {source}")?;
        }

        Ok(())
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        if self.retryable {
            writeln!(f, "retryable: true")?;
        }
        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
            writeln!(f, "    {source:#}")?;
        }
        if self.backtrace.status() == BacktraceStatus::Captured {
            writeln!(f)?;
            writeln!(f, "Backtrace:")?;
            write!(f, "{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|v| v.as_ref())
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => std::io::ErrorKind::NotFound,
            ErrorKind::PermissionDenied => std::io::ErrorKind::PermissionDenied,
            _ => std::io::ErrorKind::Other,
        };

        std::io::Error::new(kind, err)
    }
}
