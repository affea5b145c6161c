//! Catalog, slot and money types for the bundle builder.
//!
//! This crate provides the domain vocabulary shared by the fetch layer and
//! the selection engine:
//!
//! - **Catalog**: items fetched per category, their wire payloads, chooser filters
//! - **Slots**: the configurable positions of a bundle and which categories feed them
//! - **Money**: cents-based prices and the formatted bundle total
//! - **Orders**: the flattened `(item id, quantity)` lines sent to the cart
//!
//! # Example
//!
//! ```rust
//! use builder_commerce::prelude::*;
//!
//! let slot = ComponentSlot::single("cpu", "Processor", ["cpu"]);
//! assert!(!slot.is_multi_select);
//!
//! let total = Money::from_decimal(1234.5, Currency::USD);
//! assert_eq!(total.display(), "$1,234.50");
//! ```

pub mod catalog;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};
pub use order::OrderLine;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};
    pub use crate::order::{BatchAddRequest, OrderLine};

    pub use crate::catalog::{
        attribute_terms, default_slots, ComponentSlot, Item, ItemFilter, ItemPayload,
        ProductsEnvelope, StockStatus,
    };
}
