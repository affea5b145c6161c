//! Order lines submitted to the cart service.

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

/// One `(item id, quantity)` pair of a cart submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: ItemId,
    pub quantity: u32,
}

impl OrderLine {
    /// A line for a single unit of `id`.
    pub fn single(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            quantity: 1,
        }
    }
}

/// Body of the batch add endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchAddRequest<'a> {
    pub items: &'a [OrderLine],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_body_shape() {
        let lines = [OrderLine::single("11"), OrderLine::single("12")];
        let json = serde_json::to_value(BatchAddRequest { items: &lines }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "items": [
                { "id": "11", "quantity": 1 },
                { "id": "12", "quantity": 1 }
            ]})
        );
    }
}
