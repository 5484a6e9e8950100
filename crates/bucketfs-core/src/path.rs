//! Canonicalization of caller paths into object keys.
//!
//! Object stores have a flat key space, so a "path" is just a key. The
//! [`PathNormalizer`] turns whatever the caller hands us (`/dir1/file1`,
//! `C:\dir1\file1`, `dir1/./x/../file1`) into one canonical [`ObjectKey`].
//!
//! A trailing `/` on the input is preserved: it is the only signal a caller
//! has to say "treat this as a directory".

use std::fmt;

/// A normalized object key.
///
/// Keys never start with `/`. A key ending in `/` carries directory intent.
/// The bucket root is the empty key, or the configured key prefix followed by
/// `/` when a prefix is in use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    key: String,
    root: bool,
}

impl ObjectKey {
    /// Wrap an already-normalized key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let root = key.is_empty();
        Self { key, root }
    }

    fn root_of(key: String) -> Self {
        Self { key, root: true }
    }

    /// The key as sent to the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Whether this key is the root of the filesystem.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Whether the caller asked for this key as a directory (trailing `/`).
    #[must_use]
    pub fn has_dir_hint(&self) -> bool {
        self.key.ends_with('/')
    }

    /// The key without any trailing `/`: the key of a plain object.
    #[must_use]
    pub fn file_key(&self) -> &str {
        self.key.trim_end_matches('/')
    }

    /// The listing prefix for children of this key: the key with exactly one
    /// trailing `/`, or the empty string for an unprefixed root.
    ///
    /// This is also the key of the directory marker object.
    #[must_use]
    pub fn dir_prefix(&self) -> String {
        let file_key = self.file_key();
        if file_key.is_empty() {
            String::new()
        } else {
            format!("{file_key}/")
        }
    }

    /// Last path segment, or `/` for the root.
    #[must_use]
    pub fn base_name(&self) -> &str {
        if self.root {
            return "/";
        }
        base_name(self.file_key())
    }

    /// Child key `name` under this key.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        Self {
            key: format!("{}{}", self.dir_prefix(), name.trim_start_matches('/')),
            root: false,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root && self.key.is_empty() {
            f.write_str("/")
        } else {
            f.write_str(&self.key)
        }
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// Last `/`-separated segment of a key, ignoring a trailing `/`.
#[must_use]
pub fn base_name(key: &str) -> &str {
    let key = key.trim_end_matches('/');
    key.rsplit('/').next().unwrap_or(key)
}

/// Turns caller-supplied paths into [`ObjectKey`]s.
///
/// Pure and infallible: no network calls, every input maps to some key.
///
/// # Examples
///
/// ```
/// use bucketfs_core::PathNormalizer;
///
/// let normalizer = PathNormalizer::default();
/// assert_eq!(normalizer.normalize("/dir1/./file1").as_str(), "dir1/file1");
/// assert_eq!(normalizer.normalize("C:\\dir1\\dir2\\").as_str(), "dir1/dir2/");
/// assert!(normalizer.normalize("/").is_root());
///
/// let prefixed = PathNormalizer::new(Some("tenant-a"), false);
/// assert_eq!(prefixed.normalize("/file1").as_str(), "tenant-a/file1");
/// assert_eq!(prefixed.normalize("tenant-a/file1").as_str(), "tenant-a/file1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathNormalizer {
    prefix: Option<String>,
    raw: bool,
}

impl PathNormalizer {
    /// Create a normalizer. `prefix` is joined in front of every key that does
    /// not already carry it; `raw` disables sanitation.
    #[must_use]
    pub fn new(prefix: Option<&str>, raw: bool) -> Self {
        let prefix = prefix
            .map(|p| clean(&p.replace('\\', "/")))
            .filter(|p| !p.is_empty());
        Self { prefix, raw }
    }

    /// The configured key prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The root key of this filesystem.
    #[must_use]
    pub fn root(&self) -> ObjectKey {
        match &self.prefix {
            Some(prefix) => ObjectKey::root_of(format!("{prefix}/")),
            None => ObjectKey::root_of(String::new()),
        }
    }

    /// Normalize `path` into an object key.
    #[must_use]
    pub fn normalize(&self, path: &str) -> ObjectKey {
        let key = if self.raw {
            path.strip_prefix('/').unwrap_or(path).to_owned()
        } else {
            sanitize(path)
        };
        self.apply_prefix(key)
    }

    fn apply_prefix(&self, key: String) -> ObjectKey {
        let Some(prefix) = &self.prefix else {
            return if key.is_empty() {
                self.root()
            } else {
                ObjectKey::new(key)
            };
        };

        let trimmed = key.trim_end_matches('/');
        if trimmed.is_empty() || trimmed == prefix {
            return self.root();
        }
        if key.starts_with(prefix.as_str()) && key[prefix.len()..].starts_with('/') {
            return ObjectKey::new(key);
        }
        ObjectKey::new(format!("{prefix}/{key}"))
    }
}

/// Sanitize a path: forward slashes, no drive letter, lexically cleaned, no
/// leading `/`, trailing `/` preserved.
fn sanitize(path: &str) -> String {
    if path.trim().is_empty() {
        return String::new();
    }

    let path = path.replace('\\', "/");
    let path = strip_drive(&path);
    let dir_hint = path.ends_with('/');

    let mut key = clean(path);
    if dir_hint && !key.is_empty() {
        key.push('/');
    }
    key
}

/// Strip a leading `X:` drive designator.
fn strip_drive(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &path[2..]
    } else {
        path
    }
}

/// Rooted lexical cleaning. `..` never climbs above the root.
fn clean(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
