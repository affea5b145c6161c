//! Component slot definitions.

use serde::{Deserialize, Serialize};

use crate::ids::{CategoryKey, SlotKey};

/// One configurable position of the bundle and the categories that feed it.
///
/// This is configuration, not runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSlot {
    #[serde(rename = "key")]
    pub slot_key: SlotKey,
    pub label: String,
    /// Categories offered by this slot, in tab order.
    #[serde(rename = "categories")]
    pub category_keys: Vec<CategoryKey>,
    #[serde(default, rename = "multi")]
    pub is_multi_select: bool,
    /// Attribute used for the chooser's "type" filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_attribute_key: Option<String>,
    /// Attribute used for the chooser's "capacity" filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_attribute_key: Option<String>,
}

impl ComponentSlot {
    /// Create a single-select slot.
    pub fn single<I, C>(key: impl Into<SlotKey>, label: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryKey>,
    {
        Self {
            slot_key: key.into(),
            label: label.into(),
            category_keys: categories.into_iter().map(Into::into).collect(),
            is_multi_select: false,
            type_attribute_key: None,
            capacity_attribute_key: None,
        }
    }

    /// Create a multi-select slot.
    pub fn multi<I, C>(key: impl Into<SlotKey>, label: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<CategoryKey>,
    {
        Self {
            is_multi_select: true,
            ..Self::single(key, label, categories)
        }
    }

    pub fn with_type_attribute(mut self, key: impl Into<String>) -> Self {
        self.type_attribute_key = Some(key.into());
        self
    }

    pub fn with_capacity_attribute(mut self, key: impl Into<String>) -> Self {
        self.capacity_attribute_key = Some(key.into());
        self
    }

    /// True when the chooser shows one tab per category.
    pub fn has_category_tabs(&self) -> bool {
        self.category_keys.len() > 1
    }
}

/// The stock PC-builder configuration.
pub fn default_slots() -> Vec<ComponentSlot> {
    vec![
        ComponentSlot::single("cpu", "Processor", ["cpu"]).with_type_attribute("socket"),
        ComponentSlot::single("motherboard", "Motherboard", ["motherboard"])
            .with_type_attribute("socket")
            .with_capacity_attribute("form-factor"),
        ComponentSlot::single("memory", "Memory", ["memory"])
            .with_type_attribute("memory-type")
            .with_capacity_attribute("capacity"),
        ComponentSlot::single("gpu", "Graphics Card", ["gpu"]).with_capacity_attribute("vram"),
        ComponentSlot::multi("storage", "Storage", ["ssd", "hdd"])
            .with_type_attribute("interface")
            .with_capacity_attribute("capacity"),
        ComponentSlot::single("case", "Case", ["case"]).with_type_attribute("form-factor"),
        ComponentSlot::single("psu", "Power Supply", ["psu"]).with_capacity_attribute("wattage"),
        ComponentSlot::single("cooler", "CPU Cooler", ["air-cooler", "liquid-cooler"]),
        ComponentSlot::multi("fans", "Case Fans", ["fans"]).with_capacity_attribute("size"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slot_keys_are_unique() {
        let slots = default_slots();
        let mut keys: Vec<_> = slots.iter().map(|s| s.slot_key.clone()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), slots.len());
    }

    #[test]
    fn test_multi_slot() {
        let slot = ComponentSlot::multi("fans", "Case Fans", ["fans"]);
        assert!(slot.is_multi_select);
        assert!(!slot.has_category_tabs());
    }

    #[test]
    fn test_slot_from_config_json() {
        let slot: ComponentSlot = serde_json::from_value(serde_json::json!({
            "key": "storage",
            "label": "Storage",
            "categories": ["ssd", "hdd"],
            "multi": true,
            "capacity_attribute_key": "capacity"
        }))
        .unwrap();
        assert!(slot.is_multi_select);
        assert!(slot.has_category_tabs());
        assert_eq!(slot.capacity_attribute_key.as_deref(), Some("capacity"));
        assert_eq!(slot.type_attribute_key, None);
    }
}
