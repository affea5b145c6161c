//! Newtype keys for type-safe identifiers.
//!
//! Item ids, category keys and slot keys are all strings on the wire; the
//! newtypes keep a slot key from being passed where a category key is due.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a key from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the key is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// Identifier of a catalog item, as the cart service knows it.
    ItemId
);
define_key!(
    /// Opaque identifier of one fetchable product category.
    CategoryKey
);
define_key!(
    /// Identifier of one configurable position in the bundle.
    SlotKey
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_key_from_str() {
        let key: CategoryKey = "cpu".into();
        assert_eq!(key.as_str(), "cpu");
        assert_eq!(key.to_string(), "cpu");
    }

    #[test]
    fn test_blank_key() {
        assert!(ItemId::new("  ").is_blank());
        assert!(!ItemId::new("42").is_blank());
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = HashMap::new();
        map.insert(SlotKey::new("gpu"), 1);
        assert_eq!(map.get("gpu"), Some(&1));
    }

    #[test]
    fn test_transparent_serde() {
        let json = serde_json::to_string(&ItemId::new("17")).unwrap();
        assert_eq!(json, "\"17\"");
    }
}
