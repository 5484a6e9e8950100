//! Filesystem configuration.
//!
//! Provides [`FsConfig`], the immutable settings an `ObjectFs` is built from:
//! bucket identity, key prefix, default upload properties and tuning knobs.
//! Values can be loaded from `BUCKETFS_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::path::PathNormalizer;
use crate::types::{CannedAcl, UploadProperties};

/// Default part size for streamed uploads (5 MiB).
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;
/// Default page size used when listing a whole directory.
pub const DEFAULT_READDIR_PAGE_SIZE: usize = 100;
/// Default time `create` waits for a new object to become visible.
pub const DEFAULT_CREATE_TIMEOUT_SECS: u64 = 30;

/// Filesystem configuration.
///
/// # Examples
///
/// ```
/// use bucketfs_core::FsConfig;
///
/// let config = FsConfig::builder()
///     .bucket("media".into())
///     .key_prefix("tenant-a")
///     .build();
/// assert_eq!(config.bucket, "media");
/// assert_eq!(config.part_size, 5 * 1024 * 1024);
/// assert_eq!(config.normalizer().normalize("/a.txt").as_str(), "tenant-a/a.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct FsConfig {
    /// Bucket that backs the filesystem.
    #[builder(default)]
    pub bucket: String,

    /// Prefix joined in front of every key.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,

    /// Use caller paths verbatim instead of sanitizing them.
    #[builder(default = false)]
    pub raw_paths: bool,

    /// Canned ACL for new objects (`private` when unset).
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<CannedAcl>,

    /// `Cache-Control` for new objects.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,

    /// `Content-Type` for new objects (guessed from the extension when unset).
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Part size for streamed uploads, also the write pipe buffer size.
    #[builder(default = DEFAULT_PART_SIZE)]
    pub part_size: usize,

    /// Page size used by `readdir(n <= 0)`.
    #[builder(default = DEFAULT_READDIR_PAGE_SIZE)]
    pub readdir_page_size: usize,

    /// Seconds `create` waits for the new object to become visible.
    #[builder(default = DEFAULT_CREATE_TIMEOUT_SECS)]
    pub create_timeout_secs: u64,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key_prefix: None,
            raw_paths: false,
            acl: None,
            cache_control: None,
            content_type: None,
            part_size: DEFAULT_PART_SIZE,
            readdir_page_size: DEFAULT_READDIR_PAGE_SIZE,
            create_timeout_secs: DEFAULT_CREATE_TIMEOUT_SECS,
        }
    }
}

impl FsConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BUCKETFS_BUCKET` | `""` |
    /// | `BUCKETFS_KEY_PREFIX` | unset |
    /// | `BUCKETFS_RAW_PATHS` | `false` |
    /// | `BUCKETFS_ACL` | unset (`private`) |
    /// | `BUCKETFS_CACHE_CONTROL` | unset |
    /// | `BUCKETFS_CONTENT_TYPE` | unset (guessed) |
    /// | `BUCKETFS_PART_SIZE` | `5242880` |
    /// | `BUCKETFS_READDIR_PAGE_SIZE` | `100` |
    /// | `BUCKETFS_CREATE_TIMEOUT_SECS` | `30` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("BUCKETFS_BUCKET") {
            config.bucket = v;
        }
        if let Some(v) = lookup("BUCKETFS_KEY_PREFIX") {
            config.key_prefix = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = lookup("BUCKETFS_RAW_PATHS") {
            config.raw_paths = parse_bool(&v);
        }
        if let Some(v) = lookup("BUCKETFS_ACL") {
            match v.parse::<CannedAcl>() {
                Ok(acl) => config.acl = Some(acl),
                Err(e) => warn!(error = %e, "ignoring BUCKETFS_ACL"),
            }
        }
        if let Some(v) = lookup("BUCKETFS_CACHE_CONTROL") {
            config.cache_control = Some(v);
        }
        if let Some(v) = lookup("BUCKETFS_CONTENT_TYPE") {
            config.content_type = Some(v);
        }
        if let Some(v) = lookup("BUCKETFS_PART_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.part_size = n;
            }
        }
        if let Some(v) = lookup("BUCKETFS_READDIR_PAGE_SIZE") {
            if let Ok(n) = v.parse::<usize>() {
                config.readdir_page_size = n;
            }
        }
        if let Some(v) = lookup("BUCKETFS_CREATE_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                config.create_timeout_secs = n;
            }
        }

        config
    }

    /// Default upload properties for new objects.
    #[must_use]
    pub fn upload_properties(&self) -> UploadProperties {
        UploadProperties {
            acl: self.acl,
            cache_control: self.cache_control.clone(),
            content_type: self.content_type.clone(),
        }
    }

    /// Path normalizer for this configuration.
    #[must_use]
    pub fn normalizer(&self) -> PathNormalizer {
        PathNormalizer::new(self.key_prefix.as_deref(), self.raw_paths)
    }

    /// Time `create` waits for a new object to become visible.
    #[must_use]
    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
