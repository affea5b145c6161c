//! Two-tier background prefetch of every category the slots draw from.
//!
//! The work set is split into a priority wave (the categories of the first
//! few slots) and a regular wave. Each wave is issued concurrently through
//! the [`InFlightRegistry`], its settlements are held back and published to
//! the catalog in one batch, and only then does the next wave start.
//! Progress is reported per settled fetch.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use builder_commerce::catalog::ComponentSlot;
use builder_commerce::CategoryKey;
use futures::stream::{FusedStream, FuturesUnordered};
use futures::{Stream, StreamExt};

use crate::catalog::CatalogStore;
use crate::registry::{InFlightRegistry, SharedFetch};

/// Settled fetches out of the total work set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchProgress {
    pub completed: usize,
    pub total: usize,
}

impl PrefetchProgress {
    /// Completion percentage rounded to the nearest integer.
    /// An empty work set is complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let completed = self.completed.min(self.total);
        ((completed * 100 + self.total / 2) / self.total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// The work set of one prefetch run, split by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchPlan {
    pub priority: Vec<CategoryKey>,
    pub regular: Vec<CategoryKey>,
}

impl PrefetchPlan {
    /// Distinct category keys of `slots` in slot order, minus keys that
    /// `is_settled` reports as already fetched. Keys of the first
    /// `priority_slots` slots form the priority tier.
    pub fn build(
        slots: &[ComponentSlot],
        priority_slots: usize,
        is_settled: impl Fn(&CategoryKey) -> bool,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut plan = PrefetchPlan::default();
        for (index, slot) in slots.iter().enumerate() {
            for key in &slot.category_keys {
                if !seen.insert(key.clone()) || is_settled(key) {
                    continue;
                }
                if index < priority_slots {
                    plan.priority.push(key.clone());
                } else {
                    plan.regular.push(key.clone());
                }
            }
        }
        plan
    }

    pub fn total(&self) -> usize {
        self.priority.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Clears the engine's "prefetch running" flag when the run is dropped.
pub(crate) struct ActiveGuard(Rc<Cell<bool>>);

impl ActiveGuard {
    /// Claim the flag; `None` if a run already holds it.
    pub(crate) fn acquire(flag: &Rc<Cell<bool>>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self(Rc::clone(flag)))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct Wave {
    keys: Vec<CategoryKey>,
    pending: FuturesUnordered<SharedFetch>,
}

/// A running prefetch. Yields one [`PrefetchProgress`] per settled fetch
/// and ends once the last wave is committed to the catalog.
///
/// Dropping the run early publishes whatever its open wave already staged.
pub struct PrefetchRun {
    registry: Option<Rc<InFlightRegistry>>,
    catalog: Option<Rc<RefCell<CatalogStore>>>,
    last_progress: Rc<Cell<Option<PrefetchProgress>>>,
    waves: VecDeque<Vec<CategoryKey>>,
    current: Option<Wave>,
    completed: usize,
    total: usize,
    failures: usize,
    report_empty: bool,
    finished: bool,
    guard: Option<ActiveGuard>,
}

impl PrefetchRun {
    pub(crate) fn start(
        plan: PrefetchPlan,
        registry: Rc<InFlightRegistry>,
        last_progress: Rc<Cell<Option<PrefetchProgress>>>,
        guard: ActiveGuard,
    ) -> Self {
        let total = plan.total();
        tracing::info!(
            priority = plan.priority.len(),
            regular = plan.regular.len(),
            "starting prefetch"
        );
        let waves: VecDeque<_> = [plan.priority, plan.regular]
            .into_iter()
            .filter(|wave| !wave.is_empty())
            .collect();
        last_progress.set(Some(PrefetchProgress { completed: 0, total }));

        Self {
            catalog: Some(Rc::clone(registry.catalog())),
            registry: Some(registry),
            last_progress,
            waves,
            current: None,
            completed: 0,
            total,
            failures: 0,
            report_empty: total == 0,
            finished: false,
            guard: Some(guard),
        }
    }

    /// A run that yields nothing; returned while another run is active.
    pub(crate) fn inert(last_progress: Rc<Cell<Option<PrefetchProgress>>>) -> Self {
        Self {
            registry: None,
            catalog: None,
            last_progress,
            waves: VecDeque::new(),
            current: None,
            completed: 0,
            total: 0,
            failures: 0,
            report_empty: false,
            finished: true,
            guard: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fetches in this run that settled as failures so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    fn open_next_wave(&mut self) -> bool {
        let (Some(registry), Some(keys)) = (&self.registry, self.waves.pop_front()) else {
            return false;
        };
        if let Some(catalog) = &self.catalog {
            catalog.borrow_mut().hold(&keys);
        }
        let pending = keys.iter().map(|key| registry.fetch(key)).collect();
        tracing::debug!(count = keys.len(), "prefetch wave issued");
        self.current = Some(Wave { keys, pending });
        true
    }

    fn commit_current(&mut self) {
        let Some(wave) = self.current.take() else {
            return;
        };
        if let Some(catalog) = &self.catalog {
            let published = catalog.borrow_mut().commit(&wave.keys);
            tracing::debug!(published, "prefetch wave committed");
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.guard = None;
        tracing::info!(
            completed = self.completed,
            failures = self.failures,
            "prefetch finished"
        );
    }

    fn tick(&mut self) -> PrefetchProgress {
        let progress = PrefetchProgress {
            completed: self.completed,
            total: self.total,
        };
        self.last_progress.set(Some(progress));
        progress
    }
}

impl Stream for PrefetchRun {
    type Item = PrefetchProgress;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            if this.current.is_none() {
                if this.open_next_wave() {
                    continue;
                }
                let empty = std::mem::take(&mut this.report_empty);
                this.finish();
                if empty {
                    return Poll::Ready(Some(this.tick()));
                }
                return Poll::Ready(None);
            }

            let polled = match this.current.as_mut() {
                Some(wave) => wave.pending.poll_next_unpin(cx),
                None => continue,
            };
            match polled {
                Poll::Ready(Some(fetch)) => {
                    this.completed += 1;
                    if fetch.is_failure() {
                        this.failures += 1;
                    }
                    return Poll::Ready(Some(this.tick()));
                }
                Poll::Ready(None) => this.commit_current(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl FusedStream for PrefetchRun {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl Drop for PrefetchRun {
    fn drop(&mut self) {
        self.commit_current();
    }
}
