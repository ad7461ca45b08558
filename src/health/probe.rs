//! Single-endpoint health probe.

use std::time::Duration;
use tracing::debug;

use super::{evaluate, HealthReport};
use crate::api::HistoryApi;

/// Probe one endpoint. Transport errors, bad statuses and malformed bodies
/// all come back as a failed report.
pub async fn probe(
    api: &dyn HistoryApi,
    endpoint: &str,
    now_ms: i64,
    staleness: Duration,
) -> HealthReport {
    match api.health(endpoint).await {
        Ok(resp) => {
            let report = evaluate(endpoint, &resp, now_ms, staleness);
            debug!(
                endpoint,
                host = %resp.host,
                ok = report.overall_ok,
                services = report.service_status_ok,
                features = report.features_ok,
                indices = report.index_lag_ok,
                time = report.clock_skew_ok,
                "Health probe"
            );
            report
        }
        Err(e) => {
            debug!(endpoint, error = %e, "Health probe failed");
            HealthReport::failed(endpoint)
        }
    }
}
