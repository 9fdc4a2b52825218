//! put command - upload a file or text

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub async fn execute(
    ctx: &CommandContext,
    key: &str,
    file: Option<&Path>,
    text: Option<String>,
) -> Result<()> {
    let store = ctx.store()?;
    let (content, source) = read_content(file, text).await?;
    let size = content.len();

    store
        .create_item(key, content)
        .await
        .with_context(|| format!("Failed to upload to cos://{}/{}", store.bucket(), key))?;

    ctx.info(&format!(
        "{}: {} -> cos://{}/{} ({} bytes)",
        "upload".green(),
        source,
        store.bucket(),
        key,
        size
    ));

    Ok(())
}

/// Object body plus a label describing where it came from
async fn read_content(file: Option<&Path>, text: Option<String>) -> Result<(Vec<u8>, String)> {
    match (file, text) {
        (_, Some(text)) => Ok((text.into_bytes(), "<text>".to_string())),
        (Some(path), None) => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((data, path.display().to_string()))
        }
        (None, None) => anyhow::bail!("Nothing to upload: pass a file or --text"),
    }
}
