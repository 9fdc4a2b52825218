//! Profile configuration for the Cloudstore CLI
//!
//! Config file location: ~/.cloudstore/config.toml
//!
//! Example config:
//! ```toml
//! [default]
//! bucket = "reports"
//! api_key = "..."
//! resource_crn = "crn:v1:bluemix:public:cloud-object-storage:global:a/...::"
//!
//! [private]
//! bucket = "reports"
//! endpoint = "https://s3.private.us-east.cloud-object-storage.appdomain.cloud"
//! ```

use anyhow::{Context, Result};
use cloudstore_core::StoreConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "default";

/// One named profile; unset fields fall back to environment or library defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bucket name
    pub bucket: Option<String>,

    /// IAM API key
    pub api_key: Option<String>,

    /// Service instance CRN
    pub resource_crn: Option<String>,

    /// Data endpoint URL
    pub endpoint: Option<String>,

    /// IAM token endpoint URL
    pub auth_endpoint: Option<String>,

    /// Signing region label
    pub region: Option<String>,
}

/// Configuration file with multiple profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub profiles: BTreeMap<String, Config>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {:?}", path))
    }
}

impl Config {
    /// Get config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let home = directories::BaseDirs::new()
            .context("Could not determine home directory")?
            .home_dir()
            .to_path_buf();

        Ok(home.join(".cloudstore"))
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load a profile from the config file, then apply `COS_*` environment overrides
    pub fn load(profile: Option<&str>) -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?, profile)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path, profile: Option<&str>) -> Result<Self> {
        let profile_name = profile.unwrap_or(DEFAULT_PROFILE);
        Ok(ConfigFile::read(path)?
            .profiles
            .get(profile_name)
            .cloned()
            .unwrap_or_default())
    }

    pub fn save(&self, profile: Option<&str>) -> Result<()> {
        self.save_to(&Self::config_path()?, profile)
    }

    pub fn save_to(&self, path: &Path, profile: Option<&str>) -> Result<()> {
        let mut config_file = ConfigFile::read(path)?;
        config_file.profiles.insert(
            profile.unwrap_or(DEFAULT_PROFILE).to_string(),
            self.clone(),
        );
        config_file.write(path)
    }

    pub fn list_profiles(path: &Path) -> Result<Vec<String>> {
        Ok(ConfigFile::read(path)?.profiles.into_keys().collect())
    }

    pub fn delete_profile(path: &Path, profile: &str) -> Result<bool> {
        let mut config_file = ConfigFile::read(path)?;
        let removed = config_file.profiles.remove(profile).is_some();
        if removed {
            config_file.write(path)?;
        }
        Ok(removed)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields = [
            ("COS_BUCKET", &mut self.bucket),
            ("COS_API_KEY", &mut self.api_key),
            ("COS_RESOURCE_CRN", &mut self.resource_crn),
            ("COS_ENDPOINT", &mut self.endpoint),
            ("COS_AUTH_ENDPOINT", &mut self.auth_endpoint),
            ("COS_REGION", &mut self.region),
        ];

        for (name, field) in fields {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *field = Some(value);
            }
        }
    }

    /// Resolve into a validated connection config
    pub fn to_store_config(&self) -> Result<StoreConfig> {
        let bucket = self
            .bucket
            .clone()
            .context("Bucket not configured. Set COS_BUCKET, pass --bucket or use 'cloudstore configure'")?;
        let api_key = self
            .api_key
            .clone()
            .context("API key not configured. Set COS_API_KEY or use 'cloudstore configure'")?;
        let resource_crn = self
            .resource_crn
            .clone()
            .context("Resource CRN not configured. Set COS_RESOURCE_CRN or use 'cloudstore configure'")?;

        let mut store_config = StoreConfig::new(bucket, api_key, resource_crn);
        if let Some(endpoint) = &self.endpoint {
            store_config = store_config.with_endpoint(endpoint);
        }
        if let Some(auth_endpoint) = &self.auth_endpoint {
            store_config = store_config.with_auth_endpoint(auth_endpoint);
        }
        if let Some(region) = &self.region {
            store_config = store_config.with_region(region);
        }

        store_config.validate()?;
        Ok(store_config)
    }

    /// Get a config value by key name
    pub fn get_value(&self, key: &str) -> Option<String> {
        match key {
            "bucket" => self.bucket.clone(),
            "api_key" => self.api_key.as_ref().map(|_| "***".to_string()), // Hide secret
            "resource_crn" => self.resource_crn.clone(),
            "endpoint" => self.endpoint.clone(),
            "auth_endpoint" => self.auth_endpoint.clone(),
            "region" => self.region.clone(),
            _ => None,
        }
    }

    /// Set a config value by key name
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = Some(value.to_string());
        match key {
            "bucket" => self.bucket = value,
            "api_key" => self.api_key = value,
            "resource_crn" => self.resource_crn = value,
            "endpoint" => self.endpoint = value,
            "auth_endpoint" => self.auth_endpoint = value,
            "region" => self.region = value,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "bucket",
            "api_key",
            "resource_crn",
            "endpoint",
            "auth_endpoint",
            "region",
        ]
    }
}
