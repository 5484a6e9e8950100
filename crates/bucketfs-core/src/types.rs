//! Metadata and upload property types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CannedAcl
// ---------------------------------------------------------------------------

/// Predefined (canned) ACL applied to objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    /// Owner gets `FULL_CONTROL`. No one else has access rights (default).
    #[default]
    Private,
    /// Owner gets `FULL_CONTROL`. The `AllUsers` group gets `READ` access.
    PublicRead,
    /// Owner gets `FULL_CONTROL`. The `AllUsers` group gets `READ` and `WRITE` access.
    PublicReadWrite,
    /// Owner gets `FULL_CONTROL`. The `AuthenticatedUsers` group gets `READ` access.
    AuthenticatedRead,
    /// Object owner gets `FULL_CONTROL`. Bucket owner gets `READ` access.
    BucketOwnerRead,
    /// Both the object owner and the bucket owner get `FULL_CONTROL` over the object.
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Return the wire name of the canned ACL.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
            Self::BucketOwnerRead => "bucket-owner-read",
            Self::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }

    /// Map Unix permission bits onto a canned ACL.
    ///
    /// Only the "other" read (`0o004`) and write (`0o002`) bits are consulted.
    ///
    /// ```
    /// use bucketfs_core::CannedAcl;
    ///
    /// assert_eq!(CannedAcl::from_mode(0o666), CannedAcl::PublicReadWrite);
    /// assert_eq!(CannedAcl::from_mode(0o644), CannedAcl::PublicRead);
    /// assert_eq!(CannedAcl::from_mode(0o600), CannedAcl::Private);
    /// ```
    #[must_use]
    pub fn from_mode(mode: u32) -> Self {
        const OTHER_READ: u32 = 1 << 2;
        const OTHER_WRITE: u32 = 1 << 1;

        match (mode & OTHER_READ != 0, mode & OTHER_WRITE != 0) {
            (true, true) => Self::PublicReadWrite,
            (true, false) => Self::PublicRead,
            _ => Self::Private,
        }
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`CannedAcl`] from a string fails.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown canned ACL: {0}")]
pub struct ParseCannedAclError(String);

impl FromStr for CannedAcl {
    type Err = ParseCannedAclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            "bucket-owner-read" => Ok(Self::BucketOwnerRead),
            "bucket-owner-full-control" => Ok(Self::BucketOwnerFullControl),
            _ => Err(ParseCannedAclError(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload properties
// ---------------------------------------------------------------------------

/// Properties stamped on newly created objects. Unset fields fall back to
/// defaults when resolved for a concrete key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProperties {
    /// Canned ACL, `private` when unset.
    pub acl: Option<CannedAcl>,
    /// `Cache-Control` header value.
    pub cache_control: Option<String>,
    /// `Content-Type`, guessed from the key's extension when unset.
    pub content_type: Option<String>,
}

impl UploadProperties {
    /// Resolve the properties for `key`.
    #[must_use]
    pub fn resolve(&self, key: &str) -> ObjectProperties {
        let content_type = self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(key)
                .first_or_octet_stream()
                .essence_str()
                .to_owned()
        });

        ObjectProperties {
            acl: self.acl.unwrap_or_default(),
            cache_control: self.cache_control.clone(),
            content_type,
        }
    }
}

/// Fully resolved properties for one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectProperties {
    /// Canned ACL.
    pub acl: CannedAcl,
    /// `Cache-Control` header value.
    pub cache_control: Option<String>,
    /// `Content-Type` header value.
    pub content_type: String,
}

impl Default for ObjectProperties {
    fn default() -> Self {
        Self {
            acl: CannedAcl::Private,
            cache_control: None,
            content_type: String::from("application/octet-stream"),
        }
    }
}

// ---------------------------------------------------------------------------
// FileInfo
// ---------------------------------------------------------------------------

/// Metadata for a file or directory.
///
/// The mode is fixed and independent of the object's actual ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Base name of the entry.
    pub name: String,
    /// Size in bytes, `0` for directories.
    pub size: u64,
    /// Last modification time. Directories without a marker report the Unix epoch.
    pub modified: DateTime<Utc>,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

impl FileInfo {
    /// Metadata for a regular file.
    #[must_use]
    pub fn file(name: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            modified,
            is_dir: false,
        }
    }

    /// Metadata for a directory.
    #[must_use]
    pub fn dir(name: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            modified,
            is_dir: true,
        }
    }

    /// Permission bits: `0o755` for directories, `0o664` for files.
    #[must_use]
    pub fn mode(&self) -> u32 {
        if self.is_dir { 0o755 } else { 0o664 }
    }
}
