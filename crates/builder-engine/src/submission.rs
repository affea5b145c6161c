//! Cart submission as an explicit state machine.
//!
//! ```text
//! Idle ─► BatchModern ─ok─────────────────────────────► Succeeded
//!             │ 404            │ other failure
//!             ▼                ▼
//!         BatchLegacy ─fail─► Individual ─all ok──────► Succeeded
//!             │ ok                 │ some failed ─────► Failed(Partial)
//!             ▼                    │ all failed
//!         Succeeded                ▼
//!                            QueryFallback ─issued────► Succeeded
//!                                          └─not issued► Failed(Total)
//! ```
//!
//! Transitions are pure functions of the stage outcome; [`CartSubmission`]
//! performs the I/O for each stage and feeds the outcome back in.

use std::collections::BTreeSet;
use std::fmt;

use builder_commerce::{ItemId, OrderLine};
use builder_data::{BatchEndpoint, CartApi, FetchError, Response};
use thiserror::Error;
use url::Url;

use crate::EngineError;

/// Query parameter of the fallback cart URL, repeated per line.
pub const ADD_TO_CART_PARAM: &str = "add-to-cart";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStage {
    BatchModern,
    BatchLegacy,
    Individual,
    QueryFallback,
}

impl SubmissionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStage::BatchModern => "batch",
            SubmissionStage::BatchLegacy => "legacy-batch",
            SubmissionStage::Individual => "individual",
            SubmissionStage::QueryFallback => "query-fallback",
        }
    }
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionFailure {
    NothingSelected,
    Partial { failed: usize, total: usize },
    Total { reason: String },
}

impl SubmissionFailure {
    /// The error surfaced to the presentation layer.
    pub fn to_error(&self) -> EngineError {
        match self {
            SubmissionFailure::NothingSelected => EngineError::NothingSelected,
            SubmissionFailure::Partial { failed, total } => EngineError::PartialSubmissionFailure {
                failed: *failed,
                total: *total,
            },
            SubmissionFailure::Total { reason } => {
                EngineError::TotalSubmissionFailure(reason.clone())
            }
        }
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        self.to_error().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InStage(SubmissionStage),
    Succeeded { via: SubmissionStage },
    Failed(SubmissionFailure),
}

impl SubmissionState {
    /// First state of an attempt over `lines`.
    pub fn start(lines: &[OrderLine]) -> Self {
        if lines.is_empty() {
            SubmissionState::Failed(SubmissionFailure::NothingSelected)
        } else {
            SubmissionState::InStage(SubmissionStage::BatchModern)
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Succeeded { .. } | SubmissionState::Failed(_)
        )
    }
}

/// How a batch stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Accepted,
    /// The endpoint does not exist (404).
    EndpointMissing,
    Rejected(String),
}

impl BatchOutcome {
    pub fn classify(result: &Result<Response, FetchError>) -> Self {
        match result {
            Ok(response) if response.is_success() => BatchOutcome::Accepted,
            Ok(response) if response.is_not_found() => BatchOutcome::EndpointMissing,
            Ok(response) => BatchOutcome::Rejected(format!("status {}", response.status)),
            Err(e) => BatchOutcome::Rejected(e.to_string()),
        }
    }
}

/// Next state after a batch stage.
pub fn after_batch(stage: SubmissionStage, outcome: &BatchOutcome) -> SubmissionState {
    match (stage, outcome) {
        (_, BatchOutcome::Accepted) => SubmissionState::Succeeded { via: stage },
        (SubmissionStage::BatchModern, BatchOutcome::EndpointMissing) => {
            SubmissionState::InStage(SubmissionStage::BatchLegacy)
        }
        _ => SubmissionState::InStage(SubmissionStage::Individual),
    }
}

/// Next state after the individual stage, given how many of `total` lines failed.
pub fn after_individual(failed: usize, total: usize) -> SubmissionState {
    match failed {
        0 => SubmissionState::Succeeded {
            via: SubmissionStage::Individual,
        },
        n if n >= total => SubmissionState::InStage(SubmissionStage::QueryFallback),
        n => SubmissionState::Failed(SubmissionFailure::Partial { failed: n, total }),
    }
}

/// Next state after trying to issue the query fallback.
pub fn after_query_fallback(issued: Result<(), NavigationError>) -> SubmissionState {
    match issued {
        Ok(()) => SubmissionState::Succeeded {
            via: SubmissionStage::QueryFallback,
        },
        Err(e) => SubmissionState::Failed(SubmissionFailure::Total {
            reason: e.to_string(),
        }),
    }
}

/// The cart page URL with one `add-to-cart` parameter per line.
pub fn query_fallback_url(cart_url: &str, lines: &[OrderLine]) -> Result<String, NavigationError> {
    let mut url = Url::parse(cart_url)
        .map_err(|e| NavigationError(format!("invalid cart url {cart_url}: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        for line in lines {
            query.append_pair(ADD_TO_CART_PARAM, line.id.as_str());
        }
    }
    Ok(url.into())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("navigation failed: {0}")]
pub struct NavigationError(pub String);

/// Moves the shopper to another page.
pub trait Navigator {
    fn navigate(&self, url: &str) -> Result<(), NavigationError>;
}

/// One submission attempt and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSubmissionAttempt {
    pub lines: Vec<OrderLine>,
    pub state: SubmissionState,
    /// Stages entered, in order.
    pub stages: Vec<SubmissionStage>,
    /// Items the individual stage could not add.
    pub failed_item_ids: BTreeSet<ItemId>,
    /// Page the shopper was sent to, if any.
    pub redirect: Option<String>,
}

impl CartSubmissionAttempt {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        let state = SubmissionState::start(&lines);
        let stages = match state {
            SubmissionState::InStage(stage) => vec![stage],
            _ => Vec::new(),
        };
        Self {
            lines,
            state,
            stages,
            failed_item_ids: BTreeSet::new(),
            redirect: None,
        }
    }

    fn advance(&mut self, next: SubmissionState) {
        tracing::debug!(from = ?self.state, to = ?next, "submission transition");
        if let SubmissionState::InStage(stage) = next {
            self.stages.push(stage);
        }
        self.state = next;
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self.state, SubmissionState::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&SubmissionFailure> {
        match &self.state {
            SubmissionState::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<EngineError> {
        self.failure().map(SubmissionFailure::to_error)
    }
}

/// Drives one attempt through the stages against a [`CartApi`].
pub struct CartSubmission<'a> {
    cart: &'a dyn CartApi,
    navigator: &'a dyn Navigator,
    cart_url: &'a str,
}

impl<'a> CartSubmission<'a> {
    pub fn new(cart: &'a dyn CartApi, navigator: &'a dyn Navigator, cart_url: &'a str) -> Self {
        Self {
            cart,
            navigator,
            cart_url,
        }
    }

    pub async fn run(&self, lines: Vec<OrderLine>) -> CartSubmissionAttempt {
        let mut attempt = CartSubmissionAttempt::new(lines);
        tracing::info!(lines = attempt.lines.len(), "submitting cart");

        while let SubmissionState::InStage(stage) = attempt.state {
            let next = self.run_stage(stage, &mut attempt).await;
            attempt.advance(next);
        }

        match &attempt.state {
            SubmissionState::Succeeded { via } => {
                tracing::info!(via = %via, "cart submission succeeded");
                if *via != SubmissionStage::QueryFallback {
                    match self.navigator.navigate(self.cart_url) {
                        Ok(()) => attempt.redirect = Some(self.cart_url.to_string()),
                        Err(e) => tracing::warn!(error = %e, "could not open the cart page"),
                    }
                }
            }
            SubmissionState::Failed(failure) => {
                tracing::warn!(?failure, "cart submission failed");
            }
            _ => {}
        }
        attempt
    }

    async fn run_stage(
        &self,
        stage: SubmissionStage,
        attempt: &mut CartSubmissionAttempt,
    ) -> SubmissionState {
        match stage {
            SubmissionStage::BatchModern | SubmissionStage::BatchLegacy => {
                let endpoint = if stage == SubmissionStage::BatchModern {
                    BatchEndpoint::Primary
                } else {
                    BatchEndpoint::Legacy
                };
                let result = self.cart.add_items(endpoint, &attempt.lines).await;
                let outcome = BatchOutcome::classify(&result);
                tracing::debug!(stage = %stage, ?outcome, "batch stage finished");
                after_batch(stage, &outcome)
            }
            SubmissionStage::Individual => {
                let mut failed = 0;
                for line in &attempt.lines {
                    let added = matches!(
                        self.cart.add_item(line).await,
                        Ok(ref response) if response.is_success()
                    );
                    if !added {
                        failed += 1;
                        attempt.failed_item_ids.insert(line.id.clone());
                    }
                }
                after_individual(failed, attempt.lines.len())
            }
            SubmissionStage::QueryFallback => {
                let issued = query_fallback_url(self.cart_url, &attempt.lines).and_then(|url| {
                    self.navigator.navigate(&url)?;
                    attempt.redirect = Some(url);
                    Ok(())
                });
                after_query_fallback(issued)
            }
        }
    }
}
