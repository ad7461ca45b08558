//! Concurrent health check over a candidate set.
//!
//! One task per candidate, all joined before anything is read. A probe
//! task that panics or is cancelled counts as unhealthy.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{probe, HealthReport};
use crate::api::HistoryApi;

/// Hosts that must never be polled, whatever their health says.
pub const DEFAULT_BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
    "[::1]",
    "example.com",
];

pub struct HealthChecker {
    api: Arc<dyn HistoryApi>,
    blocked_hosts: Vec<String>,
}

impl HealthChecker {
    pub fn new(api: Arc<dyn HistoryApi>) -> Self {
        Self {
            api,
            blocked_hosts: DEFAULT_BLOCKED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Replace the blocked host list.
    pub fn with_blocked_hosts(mut self, hosts: Vec<String>) -> Self {
        self.blocked_hosts = hosts;
        self
    }

    /// Probe every candidate concurrently; one report per candidate, in
    /// candidate order.
    pub async fn probe_all(
        &self,
        candidates: &[String],
        now_ms: i64,
        staleness: Duration,
    ) -> Vec<HealthReport> {
        let mut handles = Vec::with_capacity(candidates.len());
        for endpoint in candidates {
            let api = Arc::clone(&self.api);
            let endpoint = endpoint.clone();
            handles.push(tokio::spawn(async move {
                probe(api.as_ref(), &endpoint, now_ms, staleness).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (endpoint, handle) in candidates.iter().zip(handles) {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(endpoint = %endpoint, "Health probe task failed: {}", e);
                    reports.push(HealthReport::failed(endpoint.as_str()));
                }
            }
        }
        reports
    }

    /// Healthy subset of `candidates`, judged against `now_ms`.
    pub async fn check_at(
        &self,
        candidates: &[String],
        now_ms: i64,
        staleness: Duration,
    ) -> Vec<String> {
        self.probe_all(candidates, now_ms, staleness)
            .await
            .into_iter()
            .filter(|r| r.overall_ok)
            .filter(|r| {
                let blocked = self.is_blocked(&r.endpoint);
                if blocked {
                    debug!(endpoint = %r.endpoint, "Skipping blocked host");
                }
                !blocked
            })
            .map(|r| r.endpoint)
            .collect()
    }

    /// Healthy subset of `candidates`, judged against the wall clock.
    pub async fn check(&self, candidates: &[String], staleness: Duration) -> Vec<String> {
        self.check_at(candidates, chrono::Utc::now().timestamp_millis(), staleness)
            .await
    }

    fn is_blocked(&self, endpoint: &str) -> bool {
        let host = match reqwest::Url::parse(endpoint) {
            Ok(url) => match url.host_str() {
                Some(h) => h.to_ascii_lowercase(),
                None => return true,
            },
            Err(_) => return true,
        };
        self.blocked_hosts.iter().any(|b| b.eq_ignore_ascii_case(&host))
    }
}
