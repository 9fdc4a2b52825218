//! Connection configuration for Cloudstore
//!
//! Example config:
//! ```toml
//! bucket_name = "my-bucket"
//! api_key = "..."
//! resource_crn = "crn:v1:bluemix:public:cloud-object-storage:global:a/...::"
//! endpoint = "https://s3.private.us-east.cloud-object-storage.appdomain.cloud"
//! ```

use crate::{Error, Result, DEFAULT_AUTH_ENDPOINT, DEFAULT_ENDPOINT, DEFAULT_REGION};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Immutable connection settings for one bucket
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bucket all operations are bound to
    pub bucket_name: String,

    /// IAM API key (Service credentials -> apikey)
    pub api_key: String,

    /// Service instance CRN (bucket -> Configuration -> Bucket instance CRN)
    pub resource_crn: String,

    /// Data endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// IAM token endpoint URL
    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,

    /// Region label used when signing requests
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_auth_endpoint() -> String {
    DEFAULT_AUTH_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("bucket_name", &self.bucket_name)
            .field("api_key", &"***")
            .field("resource_crn", &self.resource_crn)
            .field("endpoint", &self.endpoint)
            .field("auth_endpoint", &self.auth_endpoint)
            .field("region", &self.region)
            .finish()
    }
}

impl StoreConfig {
    pub fn new(
        bucket_name: impl Into<String>,
        api_key: impl Into<String>,
        resource_crn: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            api_key: api_key.into(),
            resource_crn: resource_crn.into(),
            endpoint: default_endpoint(),
            auth_endpoint: default_auth_endpoint(),
            region: default_region(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_auth_endpoint(mut self, auth_endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = auth_endpoint.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("Failed to read config {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build from `COS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; bucket, API key and CRN are required
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("{} must be set", name)))
        };

        let mut config = Self::new(
            required("COS_BUCKET")?,
            required("COS_API_KEY")?,
            required("COS_RESOURCE_CRN")?,
        );

        if let Some(endpoint) = lookup("COS_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(auth_endpoint) = lookup("COS_AUTH_ENDPOINT") {
            config.auth_endpoint = auth_endpoint;
        }
        if let Some(region) = lookup("COS_REGION") {
            config.region = region;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(Error::InvalidConfig("bucket_name is empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::InvalidConfig("api_key is empty".into()));
        }
        if self.resource_crn.trim().is_empty() {
            return Err(Error::InvalidConfig("resource_crn is empty".into()));
        }
        if self.region.trim().is_empty() {
            return Err(Error::InvalidConfig("region is empty".into()));
        }

        check_url("endpoint", &self.endpoint)?;
        check_url("auth_endpoint", &self.auth_endpoint)?;

        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| Error::InvalidConfig(format!("{} is not a valid URL ({}): {}", field, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidConfig(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}
