//! Single-flight registry of category fetches.
//!
//! At most one network request per category key is outstanding. Every
//! caller for a key gets a clone of the same [`SharedFetch`]; the registry
//! keeps its own clone, so a caller dropping or aborting its handle never
//! cancels the fetch for the others.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use builder_commerce::CategoryKey;
use builder_data::CatalogApi;
use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;

use crate::catalog::{CatalogStore, CategoryFetch};

/// A fetch that any number of subscribers may await.
pub type SharedFetch = Shared<LocalBoxFuture<'static, CategoryFetch>>;

pub struct InFlightRegistry {
    api: Rc<dyn CatalogApi>,
    catalog: Rc<RefCell<CatalogStore>>,
    pending: RefCell<HashMap<CategoryKey, SharedFetch>>,
    issued: Cell<u64>,
}

impl InFlightRegistry {
    pub fn new(api: Rc<dyn CatalogApi>, catalog: Rc<RefCell<CatalogStore>>) -> Rc<Self> {
        Rc::new(Self {
            api,
            catalog,
            pending: RefCell::new(HashMap::new()),
            issued: Cell::new(0),
        })
    }

    /// Join the in-flight fetch for `key`, or start one.
    ///
    /// The fetch is lazy: the request goes out when a subscriber first
    /// polls it. On settlement the entry is removed and the result is
    /// written to the catalog.
    pub fn fetch(self: &Rc<Self>, key: &CategoryKey) -> SharedFetch {
        if let Some(existing) = self.pending.borrow().get(key) {
            tracing::debug!(category = %key, "joining in-flight fetch");
            return existing.clone();
        }

        let api = Rc::clone(&self.api);
        let registry = Rc::downgrade(self);
        let owned = key.clone();
        let fetch = async move {
            let result = match api.fetch_category(&owned).await {
                Ok(items) => {
                    tracing::debug!(category = %owned, count = items.len(), "category fetched");
                    CategoryFetch::loaded(owned, items)
                }
                Err(e) => {
                    tracing::warn!(category = %owned, error = %e, "category fetch failed");
                    CategoryFetch::failed(owned, e)
                }
            };
            settle(&registry, &result);
            result
        }
        .boxed_local()
        .shared();

        self.issued.set(self.issued.get() + 1);
        self.pending
            .borrow_mut()
            .insert(key.clone(), fetch.clone());
        fetch
    }

    pub fn is_in_flight(&self, key: &CategoryKey) -> bool {
        self.pending.borrow().contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Fetches started over the registry's lifetime.
    pub fn issued(&self) -> u64 {
        self.issued.get()
    }

    pub fn catalog(&self) -> &Rc<RefCell<CatalogStore>> {
        &self.catalog
    }
}

fn settle(registry: &Weak<InFlightRegistry>, result: &CategoryFetch) {
    let Some(registry) = registry.upgrade() else {
        return;
    };
    registry.pending.borrow_mut().remove(&result.key);
    registry.catalog.borrow_mut().record(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use builder_commerce::catalog::Item;
    use builder_commerce::{Currency, Money};
    use builder_data::FetchError;
    use futures::future::{join_all, AbortHandle, Abortable};

    #[derive(Default)]
    struct CountingApi {
        calls: RefCell<Vec<CategoryKey>>,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl CatalogApi for CountingApi {
        async fn fetch_category(&self, key: &CategoryKey) -> Result<Vec<Item>, FetchError> {
            self.calls.borrow_mut().push(key.clone());
            tokio::task::yield_now().await;
            if self.fail {
                return Err(FetchError::HttpError {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(vec![Item::new(
                format!("{key}-1"),
                "Thing",
                Money::new(500, Currency::USD),
            )])
        }
    }

    fn registry(api: Rc<CountingApi>) -> Rc<InFlightRegistry> {
        InFlightRegistry::new(api, Rc::new(RefCell::new(CatalogStore::new())))
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_call() {
        let api = Rc::new(CountingApi::default());
        let registry = registry(api.clone());
        let key = CategoryKey::new("cpu");

        let subscribers: Vec<_> = (0..5).map(|_| registry.fetch(&key)).collect();
        assert!(registry.is_in_flight(&key));

        let results = join_all(subscribers).await;
        assert_eq!(api.calls.borrow().len(), 1);
        assert!(results.iter().all(|r| r.items.len() == 1));
        assert!(!registry.is_in_flight(&key));
        assert_eq!(registry.catalog().borrow().items(&key).len(), 1);
    }

    #[tokio::test]
    async fn test_settled_key_fetches_again() {
        let api = Rc::new(CountingApi::default());
        let registry = registry(api.clone());
        let key = CategoryKey::new("gpu");

        registry.fetch(&key).await;
        registry.fetch(&key).await;
        assert_eq!(api.calls.borrow().len(), 2);
        assert_eq!(registry.issued(), 2);
    }

    #[tokio::test]
    async fn test_failure_settles_as_empty() {
        let api = Rc::new(CountingApi {
            fail: true,
            ..Default::default()
        });
        let registry = registry(api);
        let key = CategoryKey::new("psu");

        let result = registry.fetch(&key).await;
        assert!(result.is_failure());
        assert!(result.items.is_empty());
        assert!(registry.catalog().borrow().is_settled(&key));
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_aborted_subscriber_does_not_cancel_others() {
        let api = Rc::new(CountingApi::default());
        let registry = registry(api.clone());
        let key = CategoryKey::new("case");

        let (handle, reg) = AbortHandle::new_pair();
        let aborted = Abortable::new(registry.fetch(&key), reg);
        let survivor = registry.fetch(&key);
        handle.abort();

        assert!(aborted.await.is_err());
        let result = survivor.await;
        assert_eq!(result.items.len(), 1);
        assert_eq!(api.calls.borrow().len(), 1);
    }
}
