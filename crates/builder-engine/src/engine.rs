//! The per-session engine the presentation layer talks to.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use builder_commerce::catalog::{ComponentSlot, Item};
use builder_commerce::{CategoryKey, ItemId, Money, OrderLine, SlotKey};
use builder_data::{CartApi, CatalogApi};
use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use futures::FutureExt;

use crate::catalog::{CatalogStore, CategoryFetch, CategoryStatus};
use crate::config::EngineConfig;
use crate::prefetch::{ActiveGuard, PrefetchPlan, PrefetchProgress, PrefetchRun};
use crate::registry::InFlightRegistry;
use crate::selection::{SelectOutcome, Selection, SelectionStore, SlotValue};
use crate::submission::{CartSubmission, CartSubmissionAttempt, Navigator};
use crate::EngineError;

/// Catalog, in-flight fetches, selection and submission state of one
/// builder session.
///
/// Single-threaded: state lives behind `Rc`/`RefCell` and is never
/// borrowed across an await point.
pub struct BuilderEngine {
    config: EngineConfig,
    catalog: Rc<RefCell<CatalogStore>>,
    registry: Rc<InFlightRegistry>,
    selection: RefCell<SelectionStore>,
    cart: Rc<dyn CartApi>,
    navigator: Rc<dyn Navigator>,
    prefetch_active: Rc<Cell<bool>>,
    prefetch_progress: Rc<Cell<Option<PrefetchProgress>>>,
    submitting: Rc<Cell<bool>>,
    last_submission: RefCell<Option<CartSubmissionAttempt>>,
}

impl BuilderEngine {
    pub fn new(
        config: EngineConfig,
        slots: Vec<ComponentSlot>,
        catalog_api: Rc<dyn CatalogApi>,
        cart: Rc<dyn CartApi>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        let catalog = Rc::new(RefCell::new(CatalogStore::new()));
        let registry = InFlightRegistry::new(catalog_api, Rc::clone(&catalog));
        Self {
            config,
            catalog,
            registry,
            selection: RefCell::new(SelectionStore::new(slots)),
            cart,
            navigator,
            prefetch_active: Rc::new(Cell::new(false)),
            prefetch_progress: Rc::new(Cell::new(None)),
            submitting: Rc::new(Cell::new(false)),
            last_submission: RefCell::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn slots(&self) -> Vec<ComponentSlot> {
        self.selection.borrow().slots().to_vec()
    }

    /// Items for `key`, from the catalog when it holds non-empty data,
    /// otherwise from the (possibly shared) network fetch.
    ///
    /// The returned future is detached from the engine borrow.
    pub fn request_category(&self, key: &CategoryKey) -> LocalBoxFuture<'static, CategoryFetch> {
        if let Some(items) = self.catalog.borrow().cached(key) {
            tracing::trace!(category = %key, "category served from catalog");
            let fetch = CategoryFetch {
                key: key.clone(),
                items,
                failure: None,
            };
            return futures::future::ready(fetch).boxed_local();
        }
        self.registry.fetch(key).boxed_local()
    }

    /// [`BuilderEngine::request_category`] with a handle that abandons
    /// this caller's interest without cancelling the shared fetch.
    pub fn request_category_abortable(
        &self,
        key: &CategoryKey,
    ) -> (Abortable<LocalBoxFuture<'static, CategoryFetch>>, AbortHandle) {
        let (handle, registration) = AbortHandle::new_pair();
        (Abortable::new(self.request_category(key), registration), handle)
    }

    /// Start prefetching every category the slots draw from.
    ///
    /// While a run is active a second call yields an empty stream.
    pub fn run_prefetch(&self, slots: &[ComponentSlot]) -> PrefetchRun {
        let Some(guard) = ActiveGuard::acquire(&self.prefetch_active) else {
            tracing::debug!("prefetch already running");
            return PrefetchRun::inert(Rc::clone(&self.prefetch_progress));
        };
        let plan = {
            let catalog = self.catalog.borrow();
            PrefetchPlan::build(slots, self.config.priority_slot_count, |key| {
                catalog.is_settled(key)
            })
        };
        PrefetchRun::start(
            plan,
            Rc::clone(&self.registry),
            Rc::clone(&self.prefetch_progress),
            guard,
        )
    }

    pub fn catalog(&self) -> BTreeMap<CategoryKey, Rc<[Item]>> {
        self.catalog.borrow().snapshot()
    }

    pub fn category_items(&self, key: &CategoryKey) -> Rc<[Item]> {
        self.catalog.borrow().items(key)
    }

    pub fn category_status(&self, key: &CategoryKey) -> Option<CategoryStatus> {
        self.catalog.borrow().status(key).cloned()
    }

    pub fn catalog_revision(&self) -> u64 {
        self.catalog.borrow().revision()
    }

    /// Items of every category the slot draws from. Unknown slot: empty.
    pub fn slot_items(&self, slot_key: &SlotKey) -> Vec<Item> {
        let selection = self.selection.borrow();
        match selection.slot(slot_key) {
            Some(slot) => self.catalog.borrow().slot_items(slot),
            None => Vec::new(),
        }
    }

    /// Category fetches sent over the network so far.
    pub fn network_fetches(&self) -> u64 {
        self.registry.issued()
    }

    pub fn is_prefetching(&self) -> bool {
        self.prefetch_active.get()
    }

    pub fn prefetch_progress(&self) -> Option<PrefetchProgress> {
        self.prefetch_progress.get()
    }

    pub fn prefetch_percent(&self) -> Option<u8> {
        self.prefetch_progress.get().map(|p| p.percent())
    }

    pub fn select(&self, slot_key: &SlotKey, item: Item) -> Result<SelectOutcome, EngineError> {
        self.selection.borrow_mut().select(slot_key, item)
    }

    /// Apply queued confirmed writes. Call once the triggering event has
    /// been handled.
    pub fn flush_deferred(&self) -> usize {
        self.selection.borrow_mut().flush_deferred()
    }

    pub fn has_pending_writes(&self) -> bool {
        self.selection.borrow().has_pending_writes()
    }

    pub fn clear_optimistic_updates(&self) {
        self.selection.borrow_mut().clear_optimistic_updates();
    }

    pub fn merged_selection(&self) -> Selection {
        self.selection.borrow().merged()
    }

    pub fn slot_value(&self, slot_key: &SlotKey) -> Option<SlotValue> {
        self.selection.borrow().merged_value(slot_key).cloned()
    }

    pub fn is_chosen(&self, slot_key: &SlotKey, id: &ItemId) -> bool {
        self.selection.borrow().is_chosen(slot_key, id)
    }

    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.selection.borrow().order_lines()
    }

    pub fn total(&self) -> Money {
        self.selection.borrow().total()
    }

    pub fn formatted_total(&self) -> String {
        self.selection.borrow().formatted_total()
    }

    pub fn slot_total(&self, slot_key: &SlotKey) -> Money {
        self.selection.borrow().slot_total(slot_key)
    }

    /// Add every selected item to the cart.
    ///
    /// The returned attempt carries the terminal state; a submission that
    /// ends `Failed` is still `Ok` here. `Err(Busy)` means another
    /// submission is running.
    pub async fn submit_cart(&self) -> Result<CartSubmissionAttempt, EngineError> {
        let Some(_busy) = ActiveGuard::acquire(&self.submitting) else {
            return Err(EngineError::Busy);
        };
        let lines = self.order_lines();

        let attempt = CartSubmission::new(
            self.cart.as_ref(),
            self.navigator.as_ref(),
            &self.config.cart_url,
        )
        .run(lines)
        .await;

        *self.last_submission.borrow_mut() = Some(attempt.clone());
        Ok(attempt)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    pub fn last_submission(&self) -> Option<CartSubmissionAttempt> {
        self.last_submission.borrow().clone()
    }

    /// Error of the most recent submission, if it failed.
    pub fn submission_error(&self) -> Option<EngineError> {
        self.last_submission
            .borrow()
            .as_ref()
            .and_then(CartSubmissionAttempt::error)
    }
}
