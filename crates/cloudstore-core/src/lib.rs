//! Cloudstore Core Library
//!
//! Configuration and error types shared by the Cloudstore client and CLI.

pub mod config;
pub mod error;

pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};

/// Cloudstore version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default public data endpoint (us-east cross-region)
pub const DEFAULT_ENDPOINT: &str = "https://s3.us-east.cloud-object-storage.appdomain.cloud";

/// Default IAM token endpoint
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";

/// Default signing region label
pub const DEFAULT_REGION: &str = "us-east";

/// Maximum object key length
pub const MAX_KEY_LENGTH: usize = 1024;
