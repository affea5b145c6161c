//! CLI configuration.

use anyhow::{Context, Result};
use builder_commerce::catalog::{default_slots, ComponentSlot};
use builder_data::EndpointConfig;
use builder_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `store.base_url`.
pub const BASE_URL_ENV: &str = "BUILDER_BASE_URL";
/// Environment variable overriding `store.request_nonce`.
pub const REQUEST_NONCE_ENV: &str = "BUILDER_REQUEST_NONCE";
/// Environment variable overriding `store.cart_nonce`.
pub const CART_NONCE_ENV: &str = "BUILDER_CART_NONCE";

/// File names searched from the working directory upwards.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["builder.toml", ".builder.toml", "builder.json"];

/// CLI configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Store endpoints.
    #[serde(default = "default_store")]
    pub store: EndpointConfig,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Slots of the bundle, in display order.
    #[serde(default = "default_slots")]
    pub slots: Vec<ComponentSlot>,
}

fn default_store() -> EndpointConfig {
    EndpointConfig::new(
        "http://localhost:8080/wp-json/builder/v1",
        "http://localhost:8080/cart",
    )
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            session: SessionConfig::default(),
            slots: default_slots(),
        }
    }
}

impl BuilderConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Apply environment overrides on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.store.base_url = url;
        }
        if let Some(nonce) = lookup(REQUEST_NONCE_ENV) {
            self.store.request_nonce = Some(nonce);
        }
        if let Some(nonce) = lookup(CART_NONCE_ENV) {
            self.store.cart_nonce = Some(nonce);
        }
        self
    }

    /// Engine settings derived from the store and session sections.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from_endpoints(&self.store)
            .with_priority_slot_count(self.session.priority_slot_count)
    }

    pub fn slot(&self, key: &str) -> Option<&ComponentSlot> {
        self.slots.iter().find(|slot| slot.slot_key.as_str() == key)
    }

    /// Problems that make the config unusable, and ones that are merely odd.
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (name, url) in [("store.base_url", &self.store.base_url), ("store.cart_url", &self.store.cart_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("{name} must be an http(s) URL"));
            }
        }
        if self.store.per_page == 0 {
            errors.push("store.per_page must be positive".to_string());
        }
        if self.store.cart_nonce.is_none() {
            warnings.push(format!("store.cart_nonce is not set (or {CART_NONCE_ENV})"));
        }

        if self.slots.is_empty() {
            errors.push("at least one slot is required".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.slot_key.is_blank() {
                errors.push(format!("slots[{i}].key is required"));
            } else if !seen.insert(slot.slot_key.clone()) {
                errors.push(format!("slots[{i}].key '{}' is duplicated", slot.slot_key));
            }
            if slot.category_keys.is_empty() {
                errors.push(format!("slots[{i}] has no categories"));
            }
        }
        if self.session.priority_slot_count > self.slots.len() {
            warnings.push(format!(
                "session.priority_slot_count ({}) exceeds the number of slots ({})",
                self.session.priority_slot_count,
                self.slots.len()
            ));
        }

        (errors, warnings)
    }
}

/// Session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Leading slots whose categories are prefetched first.
    #[serde(default = "default_priority_slot_count")]
    pub priority_slot_count: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_priority_slot_count() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            priority_slot_count: default_priority_slot_count(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Render a starter builder.toml with the stock slot list.
pub fn generate_default_config(base_url: &str, cart_url: &str) -> Result<String> {
    let config = BuilderConfig {
        store: EndpointConfig::new(base_url, cart_url),
        ..BuilderConfig::default()
    };
    let body = toml::to_string_pretty(&config).context("Failed to render default config")?;
    Ok(format!(
        "# Bundle builder configuration\n\
         # Nonces may also be supplied via {REQUEST_NONCE_ENV} and {CART_NONCE_ENV}.\n\n{body}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_generated_config_parses() {
        let text =
            generate_default_config("https://shop.test/api", "https://shop.test/cart").unwrap();
        let config: BuilderConfig = toml::from_str(&text).unwrap();

        assert_eq!(config.store.base_url, "https://shop.test/api");
        assert_eq!(config.session, SessionConfig::default());
        let keys: Vec<_> = config.slots.iter().map(|s| s.slot_key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["cpu", "motherboard", "memory", "gpu", "storage", "case", "psu", "cooler", "fans"]
        );
        assert!(config.slot("storage").is_some_and(|s| s.is_multi_select));
        assert_eq!(config.slots, default_slots());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: BuilderConfig = toml::from_str(
            r#"
            [store]
            base_url = "https://shop.test/api"
            cart_url = "https://shop.test/cart"
            "#,
        )
        .unwrap();

        assert_eq!(config.slots, default_slots());
        assert_eq!(config.engine_config().priority_slot_count, 3);
        assert_eq!(config.engine_config().cart_url, "https://shop.test/cart");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(CART_NONCE_ENV, "c-1"), (BASE_URL_ENV, "https://other.test")]
            .into_iter()
            .collect();
        let config = BuilderConfig::default()
            .with_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.store.cart_nonce.as_deref(), Some("c-1"));
        assert_eq!(config.store.base_url, "https://other.test");
        assert_eq!(config.store.request_nonce, None);
    }

    #[test]
    fn test_validate_flags_duplicates_and_bad_urls() {
        let mut config = BuilderConfig::default();
        config.store.cart_url = "/cart".to_string();
        config.slots.push(ComponentSlot::single("cpu", "Again", ["cpu"]));

        let (errors, warnings) = config.validate();
        assert!(errors.iter().any(|e| e.contains("store.cart_url")));
        assert!(errors.iter().any(|e| e.contains("duplicated")));
        assert!(warnings.iter().any(|w| w.contains("cart_nonce")));
    }
}
