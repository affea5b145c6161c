//! Select items per slot and add the build to the cart.

use anyhow::{bail, Context as _, Result};
use builder_commerce::catalog::ComponentSlot;
use builder_commerce::{ItemId, SlotKey};
use builder_engine::{BuilderEngine, SelectOutcome, SubmissionState};
use serde_json::json;

use super::prefetch::prefetch;
use super::BuildArgs;
use crate::context::Context;

/// One `slot=item` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Pick {
    slot: SlotKey,
    item: ItemId,
}

fn parse_pick(raw: &str) -> Result<Pick> {
    let Some((slot, item)) = raw.split_once('=') else {
        bail!("Expected SLOT=ITEM, got '{}'", raw);
    };
    let (slot, item) = (slot.trim(), item.trim());
    if slot.is_empty() || item.is_empty() {
        bail!("Expected SLOT=ITEM, got '{}'", raw);
    }
    Ok(Pick {
        slot: SlotKey::new(slot),
        item: ItemId::new(item),
    })
}

/// Run the build command.
pub async fn run(args: BuildArgs, ctx: &Context) -> Result<()> {
    let picks = args
        .picks
        .iter()
        .map(|raw| parse_pick(raw))
        .collect::<Result<Vec<_>>>()?;

    let slots: Vec<ComponentSlot> = ctx
        .config
        .slots
        .iter()
        .filter(|slot| picks.iter().any(|p| p.slot == slot.slot_key))
        .cloned()
        .collect();
    for pick in &picks {
        if !slots.iter().any(|slot| slot.slot_key == pick.slot) {
            bail!("Unknown slot: {}", pick.slot);
        }
    }

    let engine = ctx.engine()?;
    ctx.output.header("Assembling build");
    prefetch(&engine, &slots, ctx).await;

    for pick in &picks {
        apply_pick(&engine, pick, ctx)
            .with_context(|| format!("Could not select {} in {}", pick.item, pick.slot))?;
    }
    engine.flush_deferred();

    let lines = engine.order_lines();
    if !ctx.output.is_json() {
        for slot in &slots {
            if let Some(value) = engine.slot_value(&slot.slot_key) {
                for item in value.items() {
                    ctx.output
                        .kv(&slot.label, &format!("{} ({})", item.name, item.unit_price));
                }
            }
        }
        ctx.output.kv("Total", &engine.formatted_total());
    }

    if args.dry_run {
        if ctx.output.is_json() {
            ctx.output.json(&json!({
                "lines": lines,
                "total": engine.formatted_total(),
            }));
        }
        ctx.output.info("Dry run: nothing was added to the cart");
        return Ok(());
    }

    let spinner = ctx.output.spinner("Adding to cart...");
    let attempt = engine.submit_cart().await?;
    spinner.finish_and_clear();

    let stages: Vec<&str> = attempt.stages.iter().map(|s| s.as_str()).collect();
    ctx.output.debug(&format!("Stages: {}", stages.join(" -> ")));

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "lines": attempt.lines,
            "total": engine.formatted_total(),
            "stages": stages,
            "succeeded": attempt.is_succeeded(),
            "error": attempt.error().map(|e| e.to_string()),
            "redirect": attempt.redirect,
        }));
    }

    match &attempt.state {
        SubmissionState::Succeeded { via } => {
            engine.clear_optimistic_updates();
            ctx.output
                .success(&format!("Added {} item(s) to the cart via {}", lines.len(), via));
            Ok(())
        }
        SubmissionState::Failed(failure) => bail!("{}", failure.message()),
        state => bail!("Submission stopped in an unexpected state: {:?}", state),
    }
}

fn apply_pick(engine: &BuilderEngine, pick: &Pick, ctx: &Context) -> Result<()> {
    let Some(item) = engine
        .slot_items(&pick.slot)
        .into_iter()
        .find(|item| item.id == pick.item)
    else {
        bail!("No item {} is offered for slot {}", pick.item, pick.slot);
    };

    match engine.select(&pick.slot, item)? {
        SelectOutcome::Selected => ctx.output.debug(&format!("{} <- {}", pick.slot, pick.item)),
        SelectOutcome::Deselected => ctx
            .output
            .warn(&format!("{} was picked twice for {} and is now deselected", pick.item, pick.slot)),
        SelectOutcome::UnknownSlot => bail!("Unknown slot: {}", pick.slot),
    }
    Ok(())
}
