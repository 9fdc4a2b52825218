//! configure command - manage configuration profiles

use super::CommandContext;
use crate::config::{Config, DEFAULT_PROFILE};
use crate::ConfigureAction;
use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

pub fn execute(ctx: &CommandContext, action: Option<ConfigureAction>) -> Result<()> {
    let profile = ctx.profile.as_deref();
    match action {
        Some(ConfigureAction::Set { key, value }) => set_config(profile, &key, &value),
        Some(ConfigureAction::Get { key }) => get_config(ctx, &key),
        Some(ConfigureAction::List) => list_config(ctx),
        Some(ConfigureAction::RemoveProfile { name }) => remove_profile(&name),
        None => interactive_configure(profile),
    }
}

fn set_config(profile: Option<&str>, key: &str, value: &str) -> Result<()> {
    let path = Config::config_path()?;
    let mut config = Config::load_from(&path, profile)?;
    config.set_value(key, value)?;
    config.save_to(&path, profile)?;
    println!("Set {} = {}", key.cyan(), if key == "api_key" { "***" } else { value });
    Ok(())
}

fn get_config(ctx: &CommandContext, key: &str) -> Result<()> {
    let values = profile_values(&Config::config_path()?, ctx.profile.as_deref())?;
    match values.into_iter().find(|(name, _)| *name == key) {
        Some((_, value)) => println!("{}", value),
        None => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}

/// Values saved in the profile, without environment or flag overrides
fn profile_values(path: &Path, profile: Option<&str>) -> Result<Vec<(&'static str, String)>> {
    let stored = Config::load_from(path, profile)?;
    Ok(Config::keys()
        .iter()
        .map(|key| {
            let value = stored
                .get_value(key)
                .unwrap_or_else(|| "(not set)".to_string());
            (*key, value)
        })
        .collect())
}

fn list_config(ctx: &CommandContext) -> Result<()> {
    let path = Config::config_path()?;

    println!(
        "{}",
        format!(
            "Profile '{}':",
            ctx.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
        )
        .bold()
    );
    for (key, value) in profile_values(&path, ctx.profile.as_deref())? {
        println!("  {}: {}", key.cyan(), value);
    }

    println!();
    println!("{}", "Available profiles:".bold());
    let profiles = Config::list_profiles(&path)?;
    if profiles.is_empty() {
        println!("  (none)");
    } else {
        for profile in profiles {
            println!("  - {}", profile);
        }
    }

    println!();
    println!("Config file: {}", path.display().to_string().dimmed());
    Ok(())
}

fn remove_profile(name: &str) -> Result<()> {
    if Config::delete_profile(&Config::config_path()?, name)? {
        println!("Removed profile: {}", name.red());
    } else {
        println!("No such profile: {}", name);
    }
    Ok(())
}

fn prompt(label: &str, current: Option<&str>) -> Result<Option<String>> {
    print!("{} [{}]: ", label, current.unwrap_or(""));
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok((!input.is_empty()).then(|| input.to_string()))
}

fn interactive_configure(profile: Option<&str>) -> Result<()> {
    println!("{}", "Cloudstore Configuration".bold());
    println!("Press Enter to keep current value.\n");

    let path = Config::config_path()?;
    let mut config = Config::load_from(&path, profile).unwrap_or_default();

    if let Some(value) = prompt("Bucket", config.bucket.as_deref())? {
        config.bucket = Some(value);
    }
    let masked = config.api_key.as_ref().map(|_| "***");
    if let Some(value) = prompt("API Key", masked)? {
        config.api_key = Some(value);
    }
    if let Some(value) = prompt("Resource CRN", config.resource_crn.as_deref())? {
        config.resource_crn = Some(value);
    }
    if let Some(value) = prompt("Endpoint URL", config.endpoint.as_deref())? {
        config.endpoint = Some(value);
    }

    config.save_to(&path, profile)?;

    println!();
    println!("{} Configuration saved to {}", "✓".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_values_show_saved_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let saved = Config {
            bucket: Some("saved-bucket".to_string()),
            api_key: Some("secret".to_string()),
            ..Config::default()
        };
        saved.save_to(&path, Some("prod")).unwrap();

        let values = profile_values(&path, Some("prod")).unwrap();
        let value = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(values.len(), Config::keys().len());
        assert_eq!(value("bucket"), "saved-bucket");
        assert_eq!(value("api_key"), "***");
        assert_eq!(value("region"), "(not set)");
    }

    #[test]
    fn test_profile_values_for_unknown_profile() {
        let dir = tempfile::tempdir().unwrap();
        let values = profile_values(&dir.path().join("config.toml"), Some("absent")).unwrap();
        assert!(values.iter().all(|(_, v)| v == "(not set)"));
    }
}
