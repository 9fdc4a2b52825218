//! get command - download an object

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tokio::io::{stdout, AsyncWriteExt};

pub async fn execute(ctx: &CommandContext, key: &str, output: Option<&Path>) -> Result<()> {
    let store = ctx.store()?;
    let data = store
        .get_item(key)
        .await
        .with_context(|| format!("Failed to get cos://{}/{}", store.bucket(), key))?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            ctx.info(&format!(
                "{}: cos://{}/{} -> {} ({} bytes)",
                "download".green(),
                store.bucket(),
                key,
                path.display(),
                data.len()
            ));
        }
        None => {
            let mut out = stdout();
            out.write_all(&data).await?;
            out.flush().await?;
        }
    }

    Ok(())
}
