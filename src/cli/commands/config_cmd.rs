//! config command - Get, set, or list configuration values

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{Config, ProjectConfig};
use crate::core::schema::MergePolicy;

/// Keys accepted by `get` and `set`.
const KEYS: &[&str] = &["max_nesting_depth", "merge_policy", "shared_resources"];

fn load(ctx: &Context) -> Result<(PathBuf, Config)> {
    let dir = ctx.working_dir()?;
    let loaded = Config::load(Some(&dir)).context("Failed to load config")?;
    Ok((dir, loaded.config))
}

fn policy_name(policy: MergePolicy) -> &'static str {
    match policy {
        MergePolicy::FirstWins => "first_wins",
        MergePolicy::Strict => "strict",
    }
}

fn effective(config: &Config, key: &str) -> Result<String> {
    Ok(match key {
        "max_nesting_depth" => config.max_nesting_depth().to_string(),
        "merge_policy" => policy_name(config.merge_policy()).to_string(),
        "shared_resources" => config
            .shared_resources()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        _ => bail!(
            "Unknown configuration key: {} (expected one of: {})",
            key,
            KEYS.join(", ")
        ),
    })
}

/// Get an effective configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let (_, config) = load(ctx)?;
    let value = effective(&config, key)?;
    if !value.is_empty() {
        println!("{}", value);
    }
    Ok(())
}

/// Set a value in the project config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let (dir, config) = load(ctx)?;
    let mut project: ProjectConfig = config.project.unwrap_or_default();

    match key {
        "max_nesting_depth" => {
            let depth: usize = value
                .parse()
                .with_context(|| format!("Invalid depth '{}'", value))?;
            project.max_nesting_depth = Some(depth);
        }
        "merge_policy" => project.merge_policy = Some(value.to_string()),
        "shared_resources" => project.shared_resources = Some(PathBuf::from(value)),
        _ => bail!(
            "Unknown configuration key: {} (expected one of: {})",
            key,
            KEYS.join(", ")
        ),
    }

    let path = Config::write_project(&dir, &project).context("Failed to write config")?;
    tracing::debug!(path = %path.display(), key, "project config written");

    if !ctx.quiet() {
        println!("Set {} = {}", key, value);
    }
    Ok(())
}

/// List effective configuration values and where they came from.
pub fn list(ctx: &Context) -> Result<()> {
    let (_, config) = load(ctx)?;

    println!("# Effective Configuration");
    for key in KEYS {
        let value = effective(&config, key)?;
        if value.is_empty() {
            println!("{} = (not set)", key);
        } else {
            println!("{} = {}", key, value);
        }
    }

    if !ctx.quiet() {
        let describe = |p: Option<&std::path::Path>| {
            p.map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        };
        println!();
        println!("# Sources");
        println!("global = {}", describe(config.global_config_loaded_from()));
        println!("project = {}", describe(config.project_config_loaded_from()));
    }
    Ok(())
}
