//! Two-layer selection state: an optimistic overlay for instant feedback
//! and a confirmed layer fed by a deferred write queue.
//!
//! The merged view reads the overlay first and falls back to the confirmed
//! layer, per slot. Every selection computes its new slot value from the
//! merged view, writes it to the overlay at once and queues the same value
//! for the confirmed layer. Queued writes coalesce per slot (the latest
//! value wins) and apply in the order they were last scheduled.

use std::collections::BTreeMap;

use builder_commerce::catalog::{ComponentSlot, Item};
use builder_commerce::{Currency, ItemId, Money, OrderLine, SlotKey};

use crate::EngineError;

/// The chosen item(s) of one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Single(Item),
    /// Distinct by item id, in selection order.
    Multi(Vec<Item>),
}

impl SlotValue {
    pub fn items(&self) -> &[Item] {
        match self {
            SlotValue::Single(item) => std::slice::from_ref(item),
            SlotValue::Multi(items) => items,
        }
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items().iter().any(|item| &item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn subtotal(&self) -> Money {
        self.items().iter().map(|item| item.unit_price).sum()
    }
}

/// What a call to [`SelectionStore::select`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Item now chosen (single slots replace any previous choice).
    Selected,
    /// Multi-select item toggled off.
    Deselected,
    /// Slot key not configured; nothing changed.
    UnknownSlot,
}

pub type Selection = BTreeMap<SlotKey, SlotValue>;

#[derive(Debug, Clone)]
pub struct SelectionStore {
    slots: Vec<ComponentSlot>,
    currency: Currency,
    confirmed: Selection,
    overlay: Selection,
    deferred: Vec<(SlotKey, SlotValue)>,
}

impl SelectionStore {
    pub fn new(slots: Vec<ComponentSlot>) -> Self {
        Self {
            slots,
            currency: Currency::default(),
            confirmed: Selection::new(),
            overlay: Selection::new(),
            deferred: Vec::new(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn slots(&self) -> &[ComponentSlot] {
        &self.slots
    }

    pub fn slot(&self, key: &SlotKey) -> Option<&ComponentSlot> {
        self.slots.iter().find(|slot| &slot.slot_key == key)
    }

    /// Choose or toggle `item` in `slot_key`.
    ///
    /// Single-select slots replace their value. Multi-select slots add the
    /// item, or remove it when its id is already present.
    pub fn select(&mut self, slot_key: &SlotKey, item: Item) -> Result<SelectOutcome, EngineError> {
        let Some(slot) = self.slot(slot_key) else {
            tracing::debug!(slot = %slot_key, "ignoring selection for unknown slot");
            return Ok(SelectOutcome::UnknownSlot);
        };
        let multi = slot.is_multi_select;

        item.validate()?;
        if !item.is_in_stock() {
            return Err(EngineError::OutOfStock(item.id));
        }
        // Totals are summed in the store's single currency.
        Money::zero(self.currency).try_add(&item.unit_price)?;

        let (next, outcome) = if multi {
            let mut items = self
                .merged_value(slot_key)
                .map(|value| value.items().to_vec())
                .unwrap_or_default();
            match items.iter().position(|chosen| chosen.id == item.id) {
                Some(index) => {
                    items.remove(index);
                    (SlotValue::Multi(items), SelectOutcome::Deselected)
                }
                None => {
                    items.push(item);
                    (SlotValue::Multi(items), SelectOutcome::Selected)
                }
            }
        } else {
            (SlotValue::Single(item), SelectOutcome::Selected)
        };

        tracing::debug!(slot = %slot_key, ?outcome, "selection updated");
        self.overlay.insert(slot_key.clone(), next.clone());
        self.schedule(slot_key.clone(), next);
        Ok(outcome)
    }

    fn schedule(&mut self, slot_key: SlotKey, value: SlotValue) {
        self.deferred.retain(|(key, _)| key != &slot_key);
        self.deferred.push((slot_key, value));
    }

    /// Apply every queued confirmed write. Returns how many were applied.
    pub fn flush_deferred(&mut self) -> usize {
        let writes = std::mem::take(&mut self.deferred);
        let count = writes.len();
        for (key, value) in writes {
            self.confirmed.insert(key, value);
        }
        count
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Drop overlay entries the confirmed layer already reflects.
    ///
    /// Entries whose confirmed write is still queued stay, so the merged
    /// view never steps backwards.
    pub fn clear_optimistic_updates(&mut self) {
        let deferred = &self.deferred;
        self.overlay
            .retain(|key, _| deferred.iter().any(|(pending, _)| pending == key));
    }

    pub fn merged_value(&self, slot_key: &SlotKey) -> Option<&SlotValue> {
        self.overlay
            .get(slot_key)
            .or_else(|| self.confirmed.get(slot_key))
    }

    /// Overlay over confirmed, per slot.
    pub fn merged(&self) -> Selection {
        let mut merged = self.confirmed.clone();
        merged.extend(self.overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn confirmed(&self) -> &Selection {
        &self.confirmed
    }

    pub fn overlay(&self) -> &Selection {
        &self.overlay
    }

    /// Every chosen item, in slot configuration order.
    pub fn selected_items(&self) -> Vec<&Item> {
        self.slots
            .iter()
            .filter_map(|slot| self.merged_value(&slot.slot_key))
            .flat_map(|value| value.items())
            .collect()
    }

    /// One line per chosen item. Duplicate ids across slots are kept.
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.selected_items()
            .into_iter()
            .map(|item| OrderLine::single(item.id.clone()))
            .collect()
    }

    pub fn total(&self) -> Money {
        self.selected_items()
            .into_iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.unit_price)
    }

    /// Total in display form, e.g. `$1,234.56`.
    pub fn formatted_total(&self) -> String {
        self.total().display()
    }

    pub fn slot_total(&self, slot_key: &SlotKey) -> Money {
        self.merged_value(slot_key)
            .map(|value| {
                value
                    .items()
                    .iter()
                    .fold(Money::zero(self.currency), |acc, item| acc + item.unit_price)
            })
            .unwrap_or_else(|| Money::zero(self.currency))
    }

    pub fn is_chosen(&self, slot_key: &SlotKey, id: &ItemId) -> bool {
        self.merged_value(slot_key)
            .is_some_and(|value| value.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder_commerce::catalog::StockStatus;
    use builder_commerce::CommerceError;
    use pretty_assertions::assert_eq;

    fn item(id: &str, dollars: f64) -> Item {
        Item::new(id, format!("Item {id}"), Money::from_decimal(dollars, Currency::USD))
    }

    fn store() -> SelectionStore {
        SelectionStore::new(vec![
            ComponentSlot::single("cpu", "Processor", ["cpu"]),
            ComponentSlot::single("gpu", "Graphics", ["gpu"]),
            ComponentSlot::multi("storage", "Storage", ["ssd", "hdd"]),
        ])
    }

    fn slot(key: &str) -> SlotKey {
        SlotKey::new(key)
    }

    fn ids(value: Option<&SlotValue>) -> Vec<String> {
        value
            .map(|v| v.items().iter().map(|i| i.id.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_single_select_replaces() {
        let mut store = store();
        store.select(&slot("cpu"), item("A", 199.0)).unwrap();
        store.select(&slot("cpu"), item("B", 299.0)).unwrap();

        assert_eq!(ids(store.merged_value(&slot("cpu"))), vec!["B"]);
        assert_eq!(store.formatted_total(), "$299.00");
    }

    #[test]
    fn test_multi_select_toggles() {
        let mut store = store();
        let storage = slot("storage");

        assert_eq!(store.select(&storage, item("X", 50.0)).unwrap(), SelectOutcome::Selected);
        assert_eq!(store.select(&storage, item("Y", 80.0)).unwrap(), SelectOutcome::Selected);
        assert_eq!(ids(store.merged_value(&storage)), vec!["X", "Y"]);

        assert_eq!(
            store.select(&storage, item("X", 50.0)).unwrap(),
            SelectOutcome::Deselected
        );
        assert_eq!(ids(store.merged_value(&storage)), vec!["Y"]);
    }

    #[test]
    fn test_toggle_twice_restores_value() {
        let mut store = store();
        let storage = slot("storage");
        store.select(&storage, item("X", 50.0)).unwrap();
        let before = store.merged_value(&storage).cloned();

        store.select(&storage, item("Z", 10.0)).unwrap();
        store.select(&storage, item("Z", 10.0)).unwrap();
        assert_eq!(store.merged_value(&storage).cloned(), before);
    }

    #[test]
    fn test_unknown_slot_is_noop() {
        let mut store = store();
        let outcome = store.select(&slot("monitor"), item("M", 120.0)).unwrap();
        assert_eq!(outcome, SelectOutcome::UnknownSlot);
        assert!(store.merged().is_empty());
        assert!(!store.has_pending_writes());
    }

    #[test]
    fn test_foreign_currency_item_rejected() {
        let mut store = store();
        let euro = Item::new("E", "Imported cooler", Money::new(4_500, Currency::EUR));
        assert!(matches!(
            store.select(&slot("cpu"), euro),
            Err(EngineError::InvalidItem(CommerceError::CurrencyMismatch { .. }))
        ));
        assert!(store.merged().is_empty());
        assert!(!store.has_pending_writes());
        assert_eq!(store.total(), Money::zero(Currency::USD));
    }

    #[test]
    fn test_invalid_and_out_of_stock_items_rejected() {
        let mut store = store();
        let nameless = Item::new("Q", "", Money::zero(Currency::USD));
        assert!(matches!(
            store.select(&slot("cpu"), nameless),
            Err(EngineError::InvalidItem(_))
        ));

        let sold_out = item("S", 99.0).with_stock_status(StockStatus::OutOfStock);
        assert_eq!(
            store.select(&slot("cpu"), sold_out),
            Err(EngineError::OutOfStock(ItemId::new("S")))
        );
        assert!(store.merged().is_empty());
    }

    #[test]
    fn test_overlay_visible_before_flush() {
        let mut store = store();
        store.select(&slot("gpu"), item("G", 599.0)).unwrap();

        assert!(store.confirmed().is_empty());
        assert!(store.has_pending_writes());
        assert!(store.is_chosen(&slot("gpu"), &ItemId::new("G")));

        assert_eq!(store.flush_deferred(), 1);
        assert_eq!(ids(store.confirmed().get(&slot("gpu"))), vec!["G"]);
    }

    #[test]
    fn test_rapid_toggles_coalesce_to_latest() {
        let mut store = store();
        let storage = slot("storage");
        store.select(&storage, item("X", 50.0)).unwrap();
        store.select(&storage, item("Y", 80.0)).unwrap();
        store.select(&slot("cpu"), item("A", 199.0)).unwrap();
        store.select(&storage, item("X", 50.0)).unwrap();

        assert_eq!(store.flush_deferred(), 2);
        assert_eq!(ids(store.confirmed().get(&storage)), vec!["Y"]);
        assert_eq!(store.merged(), *store.confirmed());
    }

    #[test]
    fn test_clear_keeps_merged_view() {
        let mut store = store();
        store.select(&slot("cpu"), item("A", 199.0)).unwrap();
        store.flush_deferred();
        store.select(&slot("gpu"), item("G", 599.0)).unwrap();

        let before = store.merged();
        store.clear_optimistic_updates();
        assert_eq!(store.merged(), before);
        assert!(store.overlay().contains_key(&slot("gpu")));
        assert!(!store.overlay().contains_key(&slot("cpu")));
    }

    #[test]
    fn test_total_matches_order_lines() {
        let mut store = store();
        store.select(&slot("cpu"), item("A", 199.99)).unwrap();
        store.select(&slot("storage"), item("X", 50.5)).unwrap();
        store.select(&slot("storage"), item("Y", 80.0)).unwrap();

        let lines = store.order_lines();
        let line_ids: Vec<_> = lines.iter().map(|l| l.id.to_string()).collect();
        assert_eq!(line_ids, vec!["A", "X", "Y"]);
        assert!(lines.iter().all(|l| l.quantity == 1));

        assert_eq!(store.total().amount_cents, 19999 + 5050 + 8000);
        assert_eq!(store.formatted_total(), "$330.49");
        assert_eq!(store.slot_total(&slot("storage")).amount_cents, 13050);
    }

    #[test]
    fn test_duplicate_ids_across_slots_kept() {
        let mut store = SelectionStore::new(vec![
            ComponentSlot::multi("fans", "Fans", ["fans"]),
            ComponentSlot::multi("extra-fans", "Extra fans", ["fans"]),
        ]);
        store.select(&slot("fans"), item("F", 15.0)).unwrap();
        store.select(&slot("extra-fans"), item("F", 15.0)).unwrap();

        assert_eq!(store.order_lines().len(), 2);
        assert_eq!(store.formatted_total(), "$30.00");
    }
}
