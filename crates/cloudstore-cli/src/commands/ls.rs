//! ls command - list every key in the bucket

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct ListResult<'a> {
    bucket: &'a str,
    keys: &'a [String],
    total_objects: usize,
}

pub async fn execute(ctx: &CommandContext) -> Result<()> {
    let store = ctx.store()?;
    let keys = store
        .list_keys()
        .await
        .with_context(|| format!("Failed to list bucket '{}'", store.bucket()))?;

    if ctx.is_json() {
        let result = ListResult {
            bucket: store.bucket(),
            keys: &keys,
            total_objects: keys.len(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for key in &keys {
        println!("{}", key);
    }

    ctx.info(&format!(
        "\nTotal: {} object(s) in {}",
        keys.len(),
        store.bucket().blue().bold()
    ));

    Ok(())
}
