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

//! Translation between logical paths and backend keys.
//!
//! Logical paths are what callers pass in; backend keys are what goes on
//! the wire. The configured prefix sits between the two. A trailing `/`
//! marks a directory on both sides, it is the only directory signal an
//! OSS key carries.

/// Normalize the configured prefix into `/segment/segment/` form.
///
/// Surrounding whitespace, repeated separators and missing edge slashes
/// are all accepted; an empty prefix becomes `/`, meaning keys map to
/// logical paths one-to-one.
pub fn normalize_root(prefix: &str) -> String {
    let segments: Vec<&str> = prefix
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", segments.join("/"))
}

/// Normalize a caller-supplied logical path.
///
/// Leading slashes and duplicate separators are dropped, the trailing
/// slash is kept. An empty path normalizes to `/`, the logical root.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let is_dir = trimmed.ends_with('/');

    let mut out = trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    if out.is_empty() {
        return "/".to_string();
    }
    if is_dir {
        out.push('/');
    }
    out
}

/// Build the backend key of a normalized logical path.
///
/// `root` must be in `/abc/` form. The output never carries a leading
/// slash, OSS keys don't.
pub fn build_abs_path(root: &str, path: &str) -> String {
    debug_assert!(
        root.starts_with('/') && root.ends_with('/'),
        "root {root} is not normalized"
    );

    if path == "/" {
        return root[1..].to_string();
    }

    debug_assert!(!path.starts_with('/'), "path {path} is not normalized");
    format!("{}{}", &root[1..], path)
}

/// Recover the logical path from a backend key.
///
/// The key must sit under `root`; listing code filters foreign keys
/// before calling this.
pub fn build_rel_path(root: &str, key: &str) -> String {
    let prefix = &root[1..];
    debug_assert!(key.starts_with(prefix), "key {key} is outside root {root}");

    key[prefix.len()..].to_string()
}

/// Parent directory of a logical path, `/` for top-level entries.
///
/// A directory input (trailing slash) yields its containing directory,
/// not itself.
pub fn get_parent(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) => &path[..idx + 1],
        None => "/",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root(""), "/");
        assert_eq!(normalize_root("/"), "/");
        assert_eq!(normalize_root("uploads"), "/uploads/");
        assert_eq!(normalize_root("  uploads/images  "), "/uploads/images/");
        assert_eq!(normalize_root("//uploads///images//"), "/uploads/images/");
        // Already normalized input is a fixed point.
        assert_eq!(normalize_root("/uploads/"), "/uploads/");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("cat.png"), "cat.png");
        assert_eq!(normalize_path("/uploads/cat.png"), "uploads/cat.png");
        assert_eq!(normalize_path("uploads//cat.png "), "uploads/cat.png");
        assert_eq!(normalize_path("uploads/"), "uploads/");
        assert_eq!(normalize_path("a///b///"), "a/b/");
    }

    #[test]
    fn test_build_abs_path() {
        assert_eq!(build_abs_path("/", "cat.png"), "cat.png");
        assert_eq!(build_abs_path("/uploads/", "cat.png"), "uploads/cat.png");
        assert_eq!(build_abs_path("/uploads/", "dir/"), "uploads/dir/");
        // The logical root maps to the bare prefix.
        assert_eq!(build_abs_path("/uploads/", "/"), "uploads/");
        assert_eq!(build_abs_path("/", "/"), "");
    }

    #[test]
    fn test_build_rel_path() {
        assert_eq!(build_rel_path("/", "cat.png"), "cat.png");
        assert_eq!(build_rel_path("/uploads/", "uploads/cat.png"), "cat.png");
        assert_eq!(build_rel_path("/uploads/", "uploads/dir/"), "dir/");
        assert_eq!(build_rel_path("/uploads/", "uploads/"), "");
    }

    #[test]
    fn test_abs_rel_round_trip() {
        let root = "/uploads/";
        for path in ["cat.png", "dir/", "a/b/c.txt"] {
            assert_eq!(build_rel_path(root, &build_abs_path(root, path)), path);
        }
    }

    #[test]
    fn test_get_parent() {
        assert_eq!(get_parent("/"), "/");
        assert_eq!(get_parent("cat.png"), "/");
        assert_eq!(get_parent("dir/"), "/");
        assert_eq!(get_parent("dir/cat.png"), "dir/");
        assert_eq!(get_parent("a/b/c/"), "a/b/");
        assert_eq!(get_parent("a/b/c.txt"), "a/b/");
    }
}
