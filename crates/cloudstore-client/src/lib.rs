//! Cloudstore Client
//!
//! A bucket-bound object store client. [`ObjectStore`] forwards list/get/put
//! to an injected [`ObjectBackend`]; [`CosBackend`] talks to IBM Cloud Object
//! Storage through `aws-sdk-s3` and [`MemoryBackend`] keeps objects in memory.

pub mod backend;
pub mod cos;
pub mod iam;
pub mod store;

pub use backend::{MemoryBackend, ObjectBackend};
pub use cos::CosBackend;
pub use iam::{IamToken, IamTokenProvider};
pub use store::ObjectStore;

pub use cloudstore_core::{Error, ErrorKind, Result, StoreConfig};
