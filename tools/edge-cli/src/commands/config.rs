//! Configuration management commands.

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use edge_cache::DecisionEngine;
use edge_core::CacheConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_NAMES};
use crate::context::Context;
use crate::output::Output;

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Validate => validate_config(ctx),
        ConfigCommand::Init { .. } => bail!("config init does not take a loaded config"),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }
    ctx.output.line("");
    ctx.output.line(&ctx.config.to_toml_string()?);

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating Configuration");

    let mut warnings = Vec::new();
    let config = &ctx.config;

    let engine = DecisionEngine::new(config.clone()).context("Invalid cache configuration")?;

    if config.ttl.public == 0 {
        warnings.push("ttl.public is 0: cacheable pages expire immediately".to_string());
    }
    if config.no_cache {
        warnings.push("no_cache is set: every response is no-cache".to_string());
    }
    if config.mobile.enabled && config.mobile.vary_value.is_empty() {
        warnings.push("mobile.enabled without vary_value: mobile requests are never cached".to_string());
    }
    if config.exclusions.uris.iter().any(|u| !u.trim().is_empty() && !u.trim().starts_with('/')) {
        warnings.push("exclusions.uris has rules not starting with '/'".to_string());
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": true,
            "user_agent_rule": engine.rules().has_user_agent_rule(),
            "warnings": warnings,
        }));
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(warning);
    }
    ctx.output.success("Configuration is valid");

    Ok(())
}

/// Write a default config file.
pub fn init(args: ConfigArgs, config_path: Option<&str>, output: &Output) -> Result<()> {
    let force = matches!(args.command, ConfigCommand::Init { force: true });
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_NAMES[0]));

    if path.exists() && !force {
        bail!("{} already exists. Use --force to overwrite.", path.display());
    }

    let content = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_string_pretty(&CacheConfig::recommended())?
    } else {
        generate_default_config()
    };

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    output.success(&format!("Created {}", path.display()));
    Ok(())
}
