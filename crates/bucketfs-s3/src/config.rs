//! Client configuration for [`S3Store`](crate::S3Store).

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// How to reach the S3 endpoint. Credentials come from the standard AWS
/// provider chain.
///
/// # Examples
///
/// ```
/// use bucketfs_s3::S3StoreConfig;
///
/// let config = S3StoreConfig::default();
/// assert_eq!(config.region, "us-east-1");
/// assert!(config.endpoint_url.is_none());
/// assert!(!config.force_path_style);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct S3StoreConfig {
    /// Custom endpoint (e.g. `http://localhost:4566`); AWS when unset.
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// AWS region.
    #[builder(default = String::from("us-east-1"), setter(into))]
    pub region: String,

    /// Use path-style (`endpoint/bucket/key`) addressing.
    #[builder(default = false)]
    pub force_path_style: bool,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            region: String::from("us-east-1"),
            force_path_style: false,
        }
    }
}

impl S3StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ENDPOINT_URL` | unset |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | `us-east-1` |
    /// | `S3_FORCE_PATH_STYLE` | `false` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("S3_ENDPOINT_URL").filter(|v| !v.is_empty()) {
            config.endpoint_url = Some(v);
        }
        if let Some(v) = lookup("AWS_REGION").or_else(|| lookup("DEFAULT_REGION")) {
            config.region = v;
        }
        if let Some(v) = lookup("S3_FORCE_PATH_STYLE") {
            config.force_path_style = v == "1" || v.eq_ignore_ascii_case("true");
        }

        config
    }
}
