//! Poll loop: drives one account's action stream.
//!
//! ```text
//! Bootstrapping ─▶ HealthCheck ─▶ Selecting ─▶ Fetching ─▶ Advancing ─▶ Waiting ─┐
//!                      │  ▲                                                      │
//!                      │  └──────────────────────────────────────────────────────┘
//!                      └─(no healthy endpoints)─────────────────────▶ Waiting
//! ```
//!
//! The health check runs on every `health_loops`-th cycle, and on any cycle
//! that starts with an empty healthy set. Nothing that happens inside a
//! cycle stops the loop; only the stop signal (or a dropped consumer) does.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::{normalize_endpoint, HistoryApi};
use crate::config::PollerConfig;
use crate::discovery::EndpointDirectory;
use crate::health::HealthChecker;
use crate::pool::EndpointSelector;

pub mod cursor;
pub mod events;
pub mod fetcher;

pub use cursor::PollCursor;
pub use events::PollEvent;
pub use fetcher::{ActionFetcher, FetchOutcome};

// ── Loop State ──────────────────────────────────────────────────────

/// Everything that changes between cycles. Owned by the loop.
#[derive(Debug, Clone, Serialize)]
pub struct PollState {
    /// Endpoints eligible for health checks.
    pub candidates: Vec<String>,
    /// Healthy subset from the last health check.
    pub healthy: Vec<String>,
    pub cursor: PollCursor,
    /// Number of cycles run so far.
    pub cycle: u64,
}

impl PollState {
    pub fn new(candidates: Vec<String>, start_block: u64) -> Self {
        Self {
            candidates,
            healthy: Vec::new(),
            cursor: PollCursor::new(start_block),
            cycle: 0,
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing healthy to query; no fetch was made.
    NoHealthyEndpoints,
    /// Query completed; `emitted` new actions were delivered.
    Fetched { endpoint: String, emitted: usize },
    /// Query failed; nothing delivered, cursor untouched.
    FetchFailed { endpoint: String },
    /// The event receiver is gone.
    ConsumerClosed,
}

// ── Poll Loop ───────────────────────────────────────────────────────

pub struct PollLoop {
    account: String,
    name: Option<String>,
    start_block: u64,
    endpoints: Vec<String>,
    directory: Option<(EndpointDirectory, String)>,
    checker: HealthChecker,
    selector: EndpointSelector,
    fetcher: ActionFetcher,
    loop_wait: Duration,
    staleness: Duration,
    health_loops: u64,
    events: mpsc::Sender<PollEvent>,
}

impl PollLoop {
    /// Build a loop from config. The directory is not consulted unless
    /// [`with_directory`](Self::with_directory) is called.
    pub fn new(
        config: &PollerConfig,
        api: Arc<dyn HistoryApi>,
        events: mpsc::Sender<PollEvent>,
    ) -> Self {
        Self {
            account: config.account.clone(),
            name: config.name.clone(),
            start_block: config.start_block,
            endpoints: config.endpoints.iter().map(|e| normalize_endpoint(e)).collect(),
            directory: None,
            checker: HealthChecker::new(Arc::clone(&api)),
            selector: EndpointSelector::new(),
            fetcher: ActionFetcher::new(
                api,
                config.account.clone(),
                config.query_limit,
                config.simple_actions,
                config.request_timeout(),
            ),
            loop_wait: config.loop_wait(),
            staleness: config.loop_wait(),
            health_loops: config.health_loops.max(1),
            events,
        }
    }

    /// Resolve candidates from the registry for `chain_id` at bootstrap.
    pub fn with_directory(mut self, directory: EndpointDirectory, chain_id: impl Into<String>) -> Self {
        self.directory = Some((directory, chain_id.into()));
        self
    }

    pub fn with_checker(mut self, checker: HealthChecker) -> Self {
        self.checker = checker;
        self
    }

    pub fn with_selector(mut self, selector: EndpointSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Override the clock-skew tolerance (defaults to the loop wait).
    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    /// Initial state: registry endpoints if available, else configured ones.
    pub async fn bootstrap(&self) -> PollState {
        let candidates = match &self.directory {
            Some((directory, chain_id)) => directory.resolve(chain_id, &self.endpoints).await,
            None => self.endpoints.clone(),
        };
        info!(
            candidates = candidates.len(),
            start_block = self.start_block,
            "Bootstrapped endpoint candidates"
        );
        PollState::new(candidates, self.start_block)
    }

    /// Run one cycle up to (not including) the wait.
    pub async fn run_cycle(&mut self, state: &mut PollState) -> CycleOutcome {
        let cycle = state.cycle;
        state.cycle += 1;

        if cycle % self.health_loops == 0 || state.healthy.is_empty() {
            state.healthy = self.checker.check(&state.candidates, self.staleness).await;
            debug!(cycle, healthy = ?state.healthy, "Health check complete");
        }

        let endpoint = match self.selector.select(&state.healthy) {
            Some(e) => e.clone(),
            None => {
                warn!(cycle, "No healthy endpoints found");
                return CycleOutcome::NoHealthyEndpoints;
            }
        };

        let outcome = self.fetcher.fetch(&endpoint, &state.cursor).await;
        let completed = outcome.is_completed();
        let fresh = state
            .cursor
            .advance_page(outcome.into_actions(), self.fetcher.limit());

        let emitted = fresh.len();
        if !fresh.is_empty() {
            debug!(
                cycle,
                emitted,
                next_block = state.cursor.next_block(),
                "Emitting actions"
            );
            if self.events.send(PollEvent::Actions(fresh)).await.is_err() {
                return CycleOutcome::ConsumerClosed;
            }
        }

        if !completed {
            return CycleOutcome::FetchFailed { endpoint };
        }
        if self.events.send(PollEvent::SuccessfulQuery).await.is_err() {
            return CycleOutcome::ConsumerClosed;
        }
        CycleOutcome::Fetched { endpoint, emitted }
    }

    /// Bootstrap and poll until `stop` flips to `true` or its sender is
    /// dropped. Either one ends the wait early; the cycle in flight always
    /// finishes. Returns the final state.
    pub async fn run(self, stop: watch::Receiver<bool>) -> PollState {
        let span = info_span!(
            "poll",
            account = %self.account,
            name = self.name.as_deref().unwrap_or("-")
        );
        self.run_inner(stop).instrument(span).await
    }

    async fn run_inner(mut self, mut stop: watch::Receiver<bool>) -> PollState {
        let mut state = self.bootstrap().await;
        info!("📡 Poll loop started");

        loop {
            if *stop.borrow() {
                break;
            }

            if self.run_cycle(&mut state).await == CycleOutcome::ConsumerClosed {
                info!("Event consumer closed, stopping");
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.loop_wait) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        info!("Stop handle dropped, stopping");
                        break;
                    }
                }
            }
        }

        info!(
            cycles = state.cycle,
            next_block = state.cursor.next_block(),
            "Poll loop stopped"
        );
        state
    }
}
