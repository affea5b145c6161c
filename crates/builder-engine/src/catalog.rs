//! Session catalog: category key to the items fetched for it.
//!
//! Writes are wholesale replaces per key. While a prefetch wave is open its
//! keys are held: settlements for them are staged and published together
//! when the wave commits, so observers see one revision per wave instead
//! of one per category.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use builder_commerce::catalog::{ComponentSlot, Item};
use builder_commerce::CategoryKey;
use builder_data::FetchError;

use crate::EngineError;

/// Result of one category fetch, as handed to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFetch {
    pub key: CategoryKey,
    /// Empty when the fetch failed.
    pub items: Rc<[Item]>,
    pub failure: Option<FetchError>,
}

impl CategoryFetch {
    pub fn loaded(key: CategoryKey, items: Vec<Item>) -> Self {
        Self {
            key,
            items: items.into(),
            failure: None,
        }
    }

    pub fn failed(key: CategoryKey, error: FetchError) -> Self {
        Self {
            key,
            items: Rc::from(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    /// The failure as an engine error, if any.
    pub fn error(&self) -> Option<EngineError> {
        self.failure.clone().map(|source| EngineError::NetworkFailure {
            key: self.key.clone(),
            source,
        })
    }
}

/// What the store knows about a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Loaded(usize),
    Empty,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    entries: HashMap<CategoryKey, Rc<[Item]>>,
    status: HashMap<CategoryKey, CategoryStatus>,
    held: HashSet<CategoryKey>,
    staged: Vec<CategoryFetch>,
    revision: u64,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items stored for `key`. Unknown and failed keys read as empty.
    pub fn items(&self, key: &CategoryKey) -> Rc<[Item]> {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }

    /// Non-empty data for `key`; empty lists do not count as cached.
    ///
    /// A successful fetch staged under an open wave is served before the
    /// published entry, so data already received is never fetched twice.
    pub fn cached(&self, key: &CategoryKey) -> Option<Rc<[Item]>> {
        let staged = self
            .staged
            .iter()
            .find(|fetch| fetch.key == *key && !fetch.is_failure());
        let items = match staged {
            Some(fetch) => &fetch.items,
            None => self.entries.get(key)?,
        };
        (!items.is_empty()).then(|| Rc::clone(items))
    }

    pub fn status(&self, key: &CategoryKey) -> Option<&CategoryStatus> {
        self.status.get(key)
    }

    /// A fetch for `key` has settled and been published.
    pub fn is_settled(&self, key: &CategoryKey) -> bool {
        self.status.contains_key(key)
    }

    /// Bumped once per published write or committed batch.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the whole mapping, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<CategoryKey, Rc<[Item]>> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), Rc::clone(v)))
            .collect()
    }

    /// Items of every category a slot draws from, in category order.
    pub fn slot_items(&self, slot: &ComponentSlot) -> Vec<Item> {
        slot.category_keys
            .iter()
            .flat_map(|key| self.items(key).iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Stage writes for `keys` until [`CatalogStore::commit`].
    pub fn hold(&mut self, keys: &[CategoryKey]) {
        self.held.extend(keys.iter().cloned());
    }

    /// Record a settled fetch: publish it now, or stage it if its key is held.
    pub fn record(&mut self, fetch: &CategoryFetch) {
        if self.held.contains(&fetch.key) {
            tracing::trace!(category = %fetch.key, "staging category write");
            self.staged.retain(|staged| staged.key != fetch.key);
            self.staged.push(fetch.clone());
            return;
        }
        self.apply(fetch);
        self.revision += 1;
    }

    /// Release `keys` and publish their staged writes as one batch.
    ///
    /// Returns how many writes were published.
    pub fn commit(&mut self, keys: &[CategoryKey]) -> usize {
        for key in keys {
            self.held.remove(key);
        }
        let (ready, still_held): (Vec<_>, Vec<_>) = std::mem::take(&mut self.staged)
            .into_iter()
            .partition(|fetch| !self.held.contains(&fetch.key));
        self.staged = still_held;

        for fetch in &ready {
            self.apply(fetch);
        }
        if !ready.is_empty() {
            self.revision += 1;
        }
        ready.len()
    }

    fn apply(&mut self, fetch: &CategoryFetch) {
        match &fetch.failure {
            None => {
                let status = if fetch.items.is_empty() {
                    CategoryStatus::Empty
                } else {
                    CategoryStatus::Loaded(fetch.items.len())
                };
                self.entries
                    .insert(fetch.key.clone(), Rc::clone(&fetch.items));
                self.status.insert(fetch.key.clone(), status);
            }
            Some(error) => {
                // Earlier good data for the key is kept.
                self.entries
                    .entry(fetch.key.clone())
                    .or_insert_with(|| Rc::from(Vec::new()));
                self.status
                    .insert(fetch.key.clone(), CategoryStatus::Failed(error.to_string()));
            }
        }
    }
}
