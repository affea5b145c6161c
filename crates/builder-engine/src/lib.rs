//! Fetch coordination and selection engine for the bundle builder.
//!
//! One [`BuilderEngine`] per builder session owns:
//!
//! - **Catalog**: items per category, written wholesale per key
//! - **In-flight registry**: at most one outstanding fetch per category
//! - **Prefetch**: a priority wave then a regular wave, each committed in one batch
//! - **Selection**: optimistic overlay plus a deferred confirmed layer
//! - **Submission**: batch, legacy batch, per-item, then query-string fallback
//!
//! Everything runs on one thread. Futures returned by the engine are
//! `!Send` and must be driven by a local executor.
//!
//! # Example
//!
//! ```rust,ignore
//! use builder_engine::prelude::*;
//!
//! let engine = BuilderEngine::new(config, default_slots(), store.clone(), store, navigator);
//!
//! let mut run = engine.run_prefetch(&engine.slots());
//! while let Some(progress) = run.next().await {
//!     println!("{}%", progress.percent());
//! }
//!
//! let cpu = engine.slot_items(&SlotKey::new("cpu"))[0].clone();
//! engine.select(&SlotKey::new("cpu"), cpu)?;
//! engine.flush_deferred();
//!
//! let attempt = engine.submit_cart().await?;
//! ```

mod catalog;
mod config;
mod engine;
mod error;
mod prefetch;
mod registry;
mod selection;
mod submission;

pub use catalog::{CatalogStore, CategoryFetch, CategoryStatus};
pub use config::EngineConfig;
pub use engine::BuilderEngine;
pub use error::EngineError;
pub use prefetch::{PrefetchPlan, PrefetchProgress, PrefetchRun};
pub use registry::{InFlightRegistry, SharedFetch};
pub use selection::{SelectOutcome, Selection, SelectionStore, SlotValue};
pub use submission::{
    after_batch, after_individual, after_query_fallback, query_fallback_url, BatchOutcome,
    CartSubmission, CartSubmissionAttempt, NavigationError, Navigator, SubmissionFailure,
    SubmissionStage, SubmissionState, ADD_TO_CART_PARAM,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BuilderEngine, CartSubmissionAttempt, CategoryFetch, EngineConfig, EngineError,
        NavigationError, Navigator, PrefetchProgress, SelectOutcome, SlotValue, SubmissionFailure,
        SubmissionStage, SubmissionState,
    };
    pub use builder_commerce::prelude::*;
    pub use futures::StreamExt;
}
