//! List slots and browse slot items.

use anyhow::{bail, Result};
use builder_commerce::catalog::{attribute_terms, Item, ItemFilter};
use builder_commerce::SlotKey;
use serde_json::json;

use super::{SlotsArgs, SlotsCommand};
use crate::context::Context;

/// Run the slots command.
pub async fn run(args: SlotsArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(SlotsCommand::List) {
        SlotsCommand::List => list_slots(ctx),
        SlotsCommand::Show {
            slot,
            search,
            category,
            type_value,
            capacity,
        } => {
            let mut filter = ItemFilter::default();
            if let Some(query) = search {
                filter = filter.search(query);
            }
            if let Some(category) = category {
                filter = filter.category(category);
            }
            if let Some(value) = type_value {
                filter = filter.type_value(value);
            }
            if let Some(value) = capacity {
                filter = filter.capacity_value(value);
            }
            show_slot(&slot, &filter, ctx).await
        }
    }
}

fn list_slots(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config.slots);
        return Ok(());
    }

    ctx.output.header("Slots");
    let widths = [12, 16, 28, 6];
    ctx.output.table_row(&["KEY", "LABEL", "CATEGORIES", "MULTI"], &widths);
    for slot in &ctx.config.slots {
        let categories = slot
            .category_keys
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let multi = if slot.is_multi_select { "yes" } else { "no" };
        ctx.output.table_row(
            &[slot.slot_key.as_str(), &slot.label, &categories, multi],
            &widths,
        );
    }
    Ok(())
}

async fn show_slot(key: &str, filter: &ItemFilter, ctx: &Context) -> Result<()> {
    let Some(slot) = ctx.config.slot(key).cloned() else {
        bail!("Unknown slot: {}", key);
    };
    let engine = ctx.engine()?;

    let spinner = ctx.output.spinner(&format!("Loading {}", slot.label));
    let requests: Vec<_> = slot
        .category_keys
        .iter()
        .map(|category| engine.request_category(category))
        .collect();
    let fetched = futures::future::join_all(requests).await;
    spinner.finish_and_clear();

    for fetch in &fetched {
        if let Some(err) = fetch.error() {
            ctx.output.warn(&err.to_string());
        }
    }

    let items = engine.slot_items(&SlotKey::new(key));
    let shown = filter.apply(&slot, &items);

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "slot": slot.slot_key,
            "items": shown,
            "type_terms": terms(&items, slot.type_attribute_key.as_deref()),
            "capacity_terms": terms(&items, slot.capacity_attribute_key.as_deref()),
        }));
        return Ok(());
    }

    ctx.output.header(&format!("{} ({} of {})", slot.label, shown.len(), items.len()));
    for item in &shown {
        ctx.output.list_item(&describe(item));
    }
    if let Some(attr) = &slot.type_attribute_key {
        ctx.output.kv(attr, &terms(&items, Some(attr.as_str())).join(", "));
    }
    if let Some(attr) = &slot.capacity_attribute_key {
        ctx.output.kv(attr, &terms(&items, Some(attr.as_str())).join(", "));
    }
    Ok(())
}

fn terms(items: &[Item], key: Option<&str>) -> Vec<String> {
    key.map(|key| attribute_terms(items, key)).unwrap_or_default()
}

fn describe(item: &Item) -> String {
    let stock = if item.is_in_stock() { "" } else { " (out of stock)" };
    format!("{}  {}  {}{}", item.id, item.name, item.unit_price, stock)
}
