//! Catalog items and their wire payloads.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CommerceError;
use crate::ids::{CategoryKey, ItemId};
use crate::money::{Currency, Money};

/// Stock status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "instock",
            StockStatus::OutOfStock => "outofstock",
        }
    }

    /// Parse the store's stock status. Anything other than `outofstock`
    /// (e.g. `onbackorder`) is purchasable.
    pub fn from_wire(s: &str) -> Self {
        if s.eq_ignore_ascii_case("outofstock") {
            StockStatus::OutOfStock
        } else {
            StockStatus::InStock
        }
    }
}

/// A purchasable catalog item. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub stock_status: StockStatus,
    /// Categories this item is listed under.
    pub category_memberships: BTreeSet<CategoryKey>,
    /// Attribute key to the set of values the item carries.
    pub attributes: BTreeMap<String, BTreeSet<String>>,
    pub short_description: Option<String>,
    pub image_url: Option<String>,
    pub stock_quantity: Option<i64>,
}

impl Item {
    /// Create an in-stock item with no categories or attributes.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            stock_status: StockStatus::InStock,
            category_memberships: BTreeSet::new(),
            attributes: BTreeMap::new(),
            short_description: None,
            image_url: None,
            stock_quantity: None,
        }
    }

    /// Add a category membership.
    pub fn in_category(mut self, key: impl Into<CategoryKey>) -> Self {
        self.category_memberships.insert(key.into());
        self
    }

    /// Add an attribute value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .entry(key.into())
            .or_default()
            .insert(value.into());
        self
    }

    /// Set the stock status.
    pub fn with_stock_status(mut self, status: StockStatus) -> Self {
        self.stock_status = status;
        self
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_status == StockStatus::InStock
    }

    /// Check the identity fields a selection depends on.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.id.is_blank() {
            return Err(CommerceError::MissingField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(CommerceError::MissingField("name"));
        }
        Ok(())
    }

    /// Values of an attribute, matching either `key` or the store's
    /// `pa_<key>` taxonomy form.
    pub fn attribute_values(&self, key: &str) -> impl Iterator<Item = &String> {
        let plain = key.to_string();
        let prefixed = format!("pa_{key}");
        self.attributes
            .iter()
            .filter(move |(k, _)| **k == plain || **k == prefixed)
            .flat_map(|(_, values)| values.iter())
    }

    /// True when the item carries `value` for the attribute `key`.
    pub fn has_attribute_value(&self, key: &str, value: &str) -> bool {
        self.attribute_values(key).any(|v| v == value)
    }
}

/// Response envelope of the catalog read endpoint.
///
/// Entries stay raw JSON so one malformed item cannot sink the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductsEnvelope {
    #[serde(default)]
    pub body: Option<Vec<serde_json::Value>>,
}

impl ProductsEnvelope {
    pub fn len(&self) -> usize {
        self.body.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode each entry on its own.
    pub fn into_items(self) -> impl Iterator<Item = Result<Item, CommerceError>> {
        self.body.unwrap_or_default().into_iter().map(|raw| {
            let payload: ItemPayload = serde_json::from_value(raw)?;
            Item::try_from(payload)
        })
    }
}

/// An item as the catalog API sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub id: Option<WireScalar>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<WireScalar>,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<CategoryRef>>,
    #[serde(default)]
    pub attributes: Option<Vec<AttributePayload>>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImagePayload>>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
}

/// A field the store sends either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireScalar {
    Number(serde_json::Number),
    Text(String),
}

impl WireScalar {
    fn into_string(self) -> String {
        match self {
            WireScalar::Number(n) => n.to_string(),
            WireScalar::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRef {
    pub slug: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributePayload {
    pub slug: String,
    #[serde(default)]
    pub options: Option<Vec<WireScalar>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagePayload {
    pub src: String,
}

fn parse_price(raw: Option<WireScalar>) -> Result<Money, CommerceError> {
    let text = match raw {
        None => return Ok(Money::zero(Currency::USD)),
        Some(scalar) => scalar.into_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Money::zero(Currency::USD));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| Money::from_decimal(v, Currency::USD))
        .ok_or_else(|| CommerceError::InvalidPrice(text.clone()))
}

impl TryFrom<ItemPayload> for Item {
    type Error = CommerceError;

    fn try_from(payload: ItemPayload) -> Result<Self, Self::Error> {
        let id = payload
            .id
            .map(WireScalar::into_string)
            .filter(|s| !s.trim().is_empty())
            .ok_or(CommerceError::MissingField("id"))?;
        let name = payload
            .name
            .filter(|s| !s.trim().is_empty())
            .ok_or(CommerceError::MissingField("name"))?;
        let unit_price = parse_price(payload.price)?;

        let mut attributes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for attr in payload.attributes.unwrap_or_default() {
            let values = attr.options.unwrap_or_default();
            attributes
                .entry(attr.slug)
                .or_default()
                .extend(values.into_iter().map(WireScalar::into_string));
        }

        Ok(Item {
            id: ItemId::new(id),
            name,
            unit_price,
            stock_status: payload
                .stock_status
                .as_deref()
                .map(StockStatus::from_wire)
                .unwrap_or_default(),
            category_memberships: payload
                .categories
                .unwrap_or_default()
                .into_iter()
                .map(|c| CategoryKey::new(c.slug))
                .collect(),
            attributes,
            short_description: payload.short_description,
            image_url: payload
                .images
                .unwrap_or_default()
                .into_iter()
                .next()
                .map(|i| i.src),
            stock_quantity: payload.stock_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(json: serde_json::Value) -> ItemPayload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_item_from_payload() {
        let item = Item::try_from(payload(serde_json::json!({
            "id": 101,
            "name": "Ryzen 7 7800X3D",
            "price": "449.00",
            "stock_status": "instock",
            "categories": [{ "slug": "cpu" }],
            "attributes": [{ "slug": "pa_socket", "options": ["AM5"] }],
            "images": [{ "src": "https://cdn.example/7800x3d.png" }]
        })))
        .unwrap();

        assert_eq!(item.id, ItemId::new("101"));
        assert_eq!(item.unit_price.amount_cents, 44900);
        assert!(item.is_in_stock());
        assert!(item.category_memberships.contains("cpu"));
        assert!(item.has_attribute_value("socket", "AM5"));
        assert_eq!(item.image_url.as_deref(), Some("https://cdn.example/7800x3d.png"));
    }

    #[test]
    fn test_numeric_price_and_out_of_stock() {
        let item = Item::try_from(payload(serde_json::json!({
            "id": "7", "name": "RTX 4070", "price": 599.99, "stock_status": "outofstock"
        })))
        .unwrap();
        assert_eq!(item.unit_price.amount_cents, 59999);
        assert_eq!(item.stock_status, StockStatus::OutOfStock);
    }

    #[test]
    fn test_empty_price_is_zero() {
        let item = Item::try_from(payload(serde_json::json!({
            "id": "8", "name": "Bundle fan", "price": ""
        })))
        .unwrap();
        assert!(item.unit_price.is_zero());
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let err = Item::try_from(payload(serde_json::json!({ "name": "No id" }))).unwrap_err();
        assert_eq!(err, CommerceError::MissingField("id"));

        let err = Item::try_from(payload(serde_json::json!({ "id": 3, "name": "  " }))).unwrap_err();
        assert_eq!(err, CommerceError::MissingField("name"));
    }

    #[test]
    fn test_non_numeric_price_is_rejected() {
        let err = Item::try_from(payload(serde_json::json!({
            "id": 3, "name": "Case", "price": "call us"
        })))
        .unwrap_err();
        assert!(matches!(err, CommerceError::InvalidPrice(_)));
    }

    #[test]
    fn test_null_lists_and_numeric_options() {
        let item = Item::try_from(payload(serde_json::json!({
            "id": 12,
            "name": "DDR5 kit",
            "price": "129.99",
            "categories": null,
            "images": null,
            "attributes": [
                { "slug": "pa_capacity", "options": [32] },
                { "slug": "pa_speed", "options": null }
            ]
        })))
        .unwrap();

        assert!(item.category_memberships.is_empty());
        assert_eq!(item.image_url, None);
        assert!(item.has_attribute_value("capacity", "32"));
        assert_eq!(item.attribute_values("speed").count(), 0);
    }

    #[test]
    fn test_envelope_decodes_entries_independently() {
        let envelope: ProductsEnvelope = serde_json::from_value(serde_json::json!({
            "body": [
                { "id": 1, "name": "Good", "price": "10" },
                { "id": 2, "name": "Broken", "attributes": [{ "slug": "pa_x", "options": [{}] }] },
                { "id": 3, "name": "Also good", "price": 20 }
            ]
        }))
        .unwrap();
        assert_eq!(envelope.len(), 3);

        let results: Vec<_> = envelope.into_items().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CommerceError::SerializationError(_))));
        assert_eq!(results[2].as_ref().map(|i| i.unit_price.amount_cents), Ok(2000));
    }

    #[test]
    fn test_null_body_is_empty() {
        let envelope: ProductsEnvelope =
            serde_json::from_value(serde_json::json!({ "body": null })).unwrap();
        assert!(envelope.is_empty());
        assert_eq!(envelope.into_items().count(), 0);
    }

    #[test]
    fn test_backorder_counts_as_in_stock() {
        assert_eq!(StockStatus::from_wire("onbackorder"), StockStatus::InStock);
        assert_eq!(StockStatus::from_wire("OUTOFSTOCK"), StockStatus::OutOfStock);
    }

    #[test]
    fn test_validate_constructed_item() {
        let money = Money::new(100, Currency::USD);
        assert!(Item::new("1", "Fan", money).validate().is_ok());
        assert_eq!(
            Item::new("", "Fan", money).validate(),
            Err(CommerceError::MissingField("id"))
        );
    }
}
