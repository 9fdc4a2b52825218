//! CLI command implementations

pub mod configure;
pub mod get;
pub mod ls;
pub mod put;

use crate::config::Config;
use crate::OutputFormat;
use anyhow::Result;
use cloudstore_client::ObjectStore;

/// Context passed to all commands
pub struct CommandContext {
    pub config: Config,
    pub profile: Option<String>,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg);
        }
    }

    /// Connect to the bucket named by the active profile
    pub fn store(&self) -> Result<ObjectStore> {
        let store_config = self.config.to_store_config()?;
        Ok(ObjectStore::connect(store_config)?)
    }
}
