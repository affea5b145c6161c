//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init {
            base_url,
            cart_url,
            force,
        } => init_config(&base_url, &cart_url, force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(built-in defaults)"),
    }

    let store = &ctx.config.store;
    ctx.output.info("[store]");
    ctx.output.kv("base_url", &store.base_url);
    ctx.output.kv("cart_url", &store.cart_url);
    ctx.output.kv("products_path", &store.products_path);
    ctx.output.kv("batch_path", &store.batch_path);
    ctx.output.kv("legacy_batch_path", &store.legacy_batch_path);
    ctx.output.kv("item_path", &store.item_path);
    ctx.output.kv("per_page", &store.per_page.to_string());
    ctx.output.kv("request_nonce", redact(store.request_nonce.as_deref()));
    ctx.output.kv("cart_nonce", redact(store.cart_nonce.as_deref()));

    ctx.output.info("[session]");
    ctx.output.kv(
        "priority_slot_count",
        &ctx.config.session.priority_slot_count.to_string(),
    );
    ctx.output
        .kv("timeout_secs", &ctx.config.session.timeout_secs.to_string());

    ctx.output.info("Slots:");
    for slot in &ctx.config.slots {
        ctx.output.list_item(&format!("{} ({})", slot.slot_key, slot.label));
    }
    Ok(())
}

fn redact(value: Option<&str>) -> &'static str {
    match value {
        Some(_) => "(set)",
        None => "(unset)",
    }
}

fn init_config(base_url: &str, cart_url: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join("builder.toml");

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = generate_default_config(base_url, cart_url)?;
    fs::write(&config_path, content)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let (errors, warnings) = ctx.config.validate();

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");
    Ok(())
}
