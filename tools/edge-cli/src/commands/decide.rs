//! Evaluate a request fixture against the loaded configuration.

use std::path::Path;

use anyhow::{Context as _, Result};
use edge_cache::{DecisionEngine, EsiContext};
use edge_core::RequestContext;
use edge_observability::{DecisionLogger, LogFormat, LogLevel};
use serde::Deserialize;

use super::DecideArgs;
use crate::context::Context;
use crate::output::scope_badge;

/// A request as described in a fixture file.
#[derive(Debug, Deserialize)]
pub struct RequestFixture {
    #[serde(flatten)]
    pub request: RequestContext,
    #[serde(default)]
    pub esi: EsiContext,
    /// Custom TTL a plugin would set, as raw text.
    #[serde(default)]
    pub custom_ttl: Option<String>,
    /// Whether a plugin marks the page as mobile.
    #[serde(default)]
    pub mark_mobile: bool,
}

impl RequestFixture {
    /// Parse a fixture from TOML or JSON text.
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            serde_json::from_str(content).context("Failed to parse JSON request fixture")
        } else {
            toml::from_str(content).context("Failed to parse TOML request fixture")
        }
    }

    /// Load a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request fixture: {}", path.display()))?;
        Self::parse(&content, path.extension().is_some_and(|ext| ext == "json"))
    }
}

/// Build the engine for a fixture, registering the fixture's plugin overrides
/// as hooks.
fn build_engine(ctx: &Context, args: &DecideArgs, fixture: &RequestFixture) -> Result<DecisionEngine> {
    let mut engine = if args.lenient {
        DecisionEngine::new_lenient(ctx.config.clone())
    } else {
        DecisionEngine::new(ctx.config.clone())
    }
    .context("Invalid cache configuration")?;

    if let Some(ttl) = fixture.custom_ttl.clone() {
        engine.register_fn(move |control, _| {
            control.set_custom_ttl_raw(&ttl);
        });
    }
    if fixture.mark_mobile {
        engine.register_fn(|control, _| control.set_mobile());
    }

    Ok(engine)
}

/// Run the decide command.
pub fn run(args: DecideArgs, ctx: &Context) -> Result<()> {
    let fixture = RequestFixture::load(&ctx.resolve_path(&args.request))?;
    let engine = build_engine(ctx, &args, &fixture)?;

    let request = &fixture.request;
    let mut control = engine.begin();
    let stage = engine.finalize(request, &fixture.esi, &mut control);
    let header = engine.output(request, &fixture.esi, &mut control);
    let ttl = engine.ttl_for(request, &control);

    if ctx.output.is_verbose() {
        DecisionLogger::for_request(request)
            .with_format(LogFormat::Human)
            .with_min_level(LogLevel::Debug)
            .emit(&control, Some(&header));
    }

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "request_id": request.request_id.to_string(),
            "header": header.to_string(),
            "value": header.value(),
            "cacheable": control.get_cacheable(),
            "stage": stage.to_string(),
            "ttl": ttl,
            "reason": control.nocache_reason(),
            "events": control.events(),
        }));
        return Ok(());
    }

    ctx.output
        .line(&format!("{}: {}", header.name(), scope_badge(header.value())));

    if args.explain {
        ctx.output.header("Decision");
        ctx.output.kv("stage", &stage.to_string());
        ctx.output.kv("cacheable", &control.get_cacheable().to_string());
        ctx.output.kv("ttl", &ttl.to_string());
        if let Some(reason) = control.nocache_reason() {
            ctx.output.kv("reason", reason);
        }

        if !control.events().is_empty() {
            ctx.output.header("Events");
            for event in control.events() {
                ctx.output.list_item(&format!("[{}] {}", event.kind, event.message));
            }
        }
    }

    Ok(())
}
