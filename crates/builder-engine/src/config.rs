//! Engine configuration.

use builder_data::EndpointConfig;
use serde::{Deserialize, Serialize};

/// Session-level settings of one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cart page: redirect target after a successful submission and base
    /// of the query fallback URL.
    pub cart_url: String,
    /// How many leading slots form the prefetch priority tier.
    #[serde(default = "default_priority_slot_count")]
    pub priority_slot_count: usize,
}

fn default_priority_slot_count() -> usize {
    3
}

impl EngineConfig {
    pub fn new(cart_url: impl Into<String>) -> Self {
        Self {
            cart_url: cart_url.into(),
            priority_slot_count: default_priority_slot_count(),
        }
    }

    /// Take the cart page from the store endpoints.
    pub fn from_endpoints(endpoints: &EndpointConfig) -> Self {
        Self::new(endpoints.cart_url.clone())
    }

    pub fn with_priority_slot_count(mut self, count: usize) -> Self {
        self.priority_slot_count = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_priority_tier() {
        let config: EngineConfig =
            serde_json::from_value(serde_json::json!({ "cart_url": "https://shop.test/cart" }))
                .unwrap();
        assert_eq!(config.priority_slot_count, 3);
    }

    #[test]
    fn test_from_endpoints() {
        let endpoints = EndpointConfig::new("https://shop.test/api", "https://shop.test/cart");
        assert_eq!(
            EngineConfig::from_endpoints(&endpoints).cart_url,
            "https://shop.test/cart"
        );
    }
}
