//! Endpoint health: per-endpoint probe verdicts and the concurrent checker.
//!
//! A verdict is four independent checks over one `/v2/health` body:
//!
//! ```text
//! service_status_ok  every sub-service reports "OK"
//! features_ok        index_deltas && index_all_deltas && index_transfer_memo
//! index_lag_ok       Elasticsearch last_indexed_block == total_indexed_blocks (non-null)
//! clock_skew_ok      every sub-service clock within `staleness` of now
//! ```
//!
//! `overall_ok` is the AND of all four. Probe failures are never errors,
//! only unhealthy reports.

use serde::Serialize;
use std::time::Duration;

use crate::api::HealthResponse;

pub mod checker;
pub mod probe;

pub use checker::HealthChecker;
pub use probe::probe;

/// Name of the search-index sub-service whose lag is checked.
pub const INDEX_SERVICE: &str = "Elasticsearch";

/// Outcome of one probe against one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// The candidate URL that was probed.
    pub endpoint: String,
    /// Host the endpoint reported about itself; `None` if the probe failed.
    pub host: Option<String>,
    pub service_status_ok: bool,
    pub features_ok: bool,
    pub index_lag_ok: bool,
    pub clock_skew_ok: bool,
    pub overall_ok: bool,
}

impl HealthReport {
    /// Report for a probe that never produced a usable body.
    pub fn failed(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            host: None,
            service_status_ok: false,
            features_ok: false,
            index_lag_ok: false,
            clock_skew_ok: false,
            overall_ok: false,
        }
    }
}

/// Judge a health body. Pure: same inputs, same report.
pub fn evaluate(
    endpoint: &str,
    resp: &HealthResponse,
    now_ms: i64,
    staleness: Duration,
) -> HealthReport {
    let service_status_ok = resp.health.iter().all(|s| s.status == "OK");

    let features_ok = resp.features.index_deltas
        && resp.features.index_all_deltas
        && resp.features.index_transfer_memo;

    let index_lag_ok = resp
        .health
        .iter()
        .find(|s| s.service == INDEX_SERVICE)
        .and_then(|s| s.service_data.as_ref())
        .map_or(false, |data| match (data.last_indexed_block, data.total_indexed_blocks) {
            (Some(last), Some(total)) => last == total,
            _ => false,
        });

    let max_skew = staleness.as_millis() as f64;
    let now = now_ms as f64;
    let clock_skew_ok = resp
        .health
        .iter()
        .all(|s| (s.time - now).abs() <= max_skew);

    HealthReport {
        endpoint: endpoint.to_string(),
        host: Some(resp.host.clone()),
        service_status_ok,
        features_ok,
        index_lag_ok,
        clock_skew_ok,
        overall_ok: service_status_ok && features_ok && index_lag_ok && clock_skew_ok,
    }
}
