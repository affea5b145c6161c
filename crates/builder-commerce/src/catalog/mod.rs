//! Catalog module.
//!
//! Contains items, component slots, and the chooser filters.

mod filter;
mod item;
mod slot;

pub use filter::{attribute_terms, ItemFilter};
pub use item::{
    AttributePayload, CategoryRef, ImagePayload, Item, ItemPayload, ProductsEnvelope, StockStatus,
    WireScalar,
};
pub use slot::{default_slots, ComponentSlot};
