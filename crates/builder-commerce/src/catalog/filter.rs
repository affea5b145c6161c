//! Chooser filters over a slot's items.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::{ComponentSlot, Item};
use crate::ids::CategoryKey;

/// Filter state of the item chooser for one slot.
///
/// Empty fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring of the item name.
    pub search: Option<String>,
    /// Active category tab, only honoured for slots with several categories.
    pub category: Option<CategoryKey>,
    /// Required value of the slot's type attribute.
    pub type_value: Option<String>,
    /// Required value of the slot's capacity attribute.
    pub capacity_value: Option<String>,
}

impl ItemFilter {
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn category(mut self, key: impl Into<CategoryKey>) -> Self {
        self.category = Some(key.into());
        self
    }

    pub fn type_value(mut self, value: impl Into<String>) -> Self {
        self.type_value = Some(value.into());
        self
    }

    pub fn capacity_value(mut self, value: impl Into<String>) -> Self {
        self.capacity_value = Some(value.into());
        self
    }

    /// Check one item against the filter in the context of `slot`.
    pub fn matches(&self, slot: &ComponentSlot, item: &Item) -> bool {
        if let Some(query) = self.search.as_deref().filter(|q| !q.is_empty()) {
            if !item.name.to_lowercase().contains(&query.to_lowercase()) {
                return false;
            }
        }

        if slot.has_category_tabs() {
            if let Some(tab) = &self.category {
                if !item.category_memberships.contains(tab) {
                    return false;
                }
            }
        }

        attribute_matches(item, slot.type_attribute_key.as_deref(), self.type_value.as_deref())
            && attribute_matches(
                item,
                slot.capacity_attribute_key.as_deref(),
                self.capacity_value.as_deref(),
            )
    }

    /// Apply the filter, keeping catalog order.
    pub fn apply<'a>(&self, slot: &ComponentSlot, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(slot, item)).collect()
    }
}

fn attribute_matches(item: &Item, key: Option<&str>, wanted: Option<&str>) -> bool {
    match (wanted.filter(|w| !w.is_empty()), key) {
        (None, _) => true,
        // A value filter on a slot without that attribute matches nothing.
        (Some(_), None) => false,
        (Some(value), Some(key)) => item.has_attribute_value(key, value),
    }
}

/// Sorted distinct values of attribute `key` across `items`.
pub fn attribute_terms<'a>(items: impl IntoIterator<Item = &'a Item>, key: &str) -> Vec<String> {
    let terms: BTreeSet<String> = items
        .into_iter()
        .flat_map(|item| item.attribute_values(key).cloned().collect::<Vec<_>>())
        .collect();
    terms.into_iter().collect()
}
