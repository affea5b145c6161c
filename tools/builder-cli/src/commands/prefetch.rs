//! Warm the catalog for the configured slots.

use anyhow::{bail, Result};
use builder_commerce::catalog::ComponentSlot;
use builder_commerce::CategoryKey;
use builder_engine::{BuilderEngine, CategoryStatus};
use futures::StreamExt;
use serde::Serialize;

use super::PrefetchArgs;
use crate::context::Context;
use crate::output::{category_badge, category_label};

#[derive(Serialize)]
struct CategorySummary {
    category: String,
    status: String,
    items: usize,
}

/// Run the prefetch command.
pub async fn run(args: PrefetchArgs, ctx: &Context) -> Result<()> {
    let slots = select_slots(&ctx.config.slots, &args.slot)?;
    let engine = ctx.engine()?;

    ctx.output.header("Prefetching catalog");
    prefetch(&engine, &slots, ctx).await;

    let rows: Vec<(CategoryKey, Option<CategoryStatus>, usize)> = category_keys(&slots)
        .into_iter()
        .map(|key| {
            let status = engine.category_status(&key);
            let items = engine.category_items(&key).len();
            (key, status, items)
        })
        .collect();

    if ctx.output.is_json() {
        let summary: Vec<CategorySummary> = rows
            .iter()
            .map(|(key, status, items)| CategorySummary {
                category: key.to_string(),
                status: category_label(status.as_ref()),
                items: *items,
            })
            .collect();
        ctx.output.json(&summary);
        return Ok(());
    }

    for (key, status, _) in &rows {
        ctx.output.kv(key.as_str(), &category_badge(status.as_ref()));
    }

    let failed = rows
        .iter()
        .filter(|(_, status, _)| matches!(status, Some(CategoryStatus::Failed(_))))
        .count();
    if failed > 0 {
        ctx.output.warn(&format!(
            "{failed} category fetch(es) failed; they are retried on the next request"
        ));
    } else {
        ctx.output.success(&format!("{} categories ready", rows.len()));
    }
    Ok(())
}

/// Drive a prefetch run to completion behind a progress bar.
pub async fn prefetch(engine: &BuilderEngine, slots: &[ComponentSlot], ctx: &Context) {
    let bar = ctx.output.progress("fetching categories");
    let mut run = engine.run_prefetch(slots);
    ctx.output
        .debug(&format!("{} categories to fetch", run.total()));

    while let Some(progress) = run.next().await {
        bar.set_position(u64::from(progress.percent()));
        bar.set_message(format!("{}/{}", progress.completed, progress.total));
    }
    bar.finish_and_clear();
}

/// The configured slots, or only the named ones.
fn select_slots(all: &[ComponentSlot], names: &[String]) -> Result<Vec<ComponentSlot>> {
    if names.is_empty() {
        return Ok(all.to_vec());
    }
    let mut picked = Vec::with_capacity(names.len());
    for name in names {
        match all.iter().find(|slot| slot.slot_key.as_str() == name.as_str()) {
            Some(slot) => picked.push(slot.clone()),
            None => bail!("Unknown slot: {}", name),
        }
    }
    Ok(picked)
}

fn category_keys(slots: &[ComponentSlot]) -> Vec<CategoryKey> {
    let mut keys = Vec::new();
    for slot in slots {
        for key in &slot.category_keys {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder_commerce::catalog::default_slots;

    #[test]
    fn test_select_slots_by_name() {
        let slots = default_slots();
        let picked = select_slots(&slots, &["gpu".to_string(), "cpu".to_string()]).unwrap();
        let keys: Vec<_> = picked.iter().map(|s| s.slot_key.to_string()).collect();
        assert_eq!(keys, vec!["gpu", "cpu"]);
        assert!(select_slots(&slots, &["monitor".to_string()]).is_err());
    }

    #[test]
    fn test_category_keys_are_distinct() {
        let slots = vec![
            ComponentSlot::single("cpu", "Processor", ["cpu"]),
            ComponentSlot::single("cooler", "Cooler", ["air-cooler", "cpu"]),
        ];
        let keys: Vec<_> = category_keys(&slots).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["cpu", "air-cooler"]);
    }
}
