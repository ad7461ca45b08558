//! Endpoint registry client (`/apps/nodestatus/<chainId>.json`).

use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::api::normalize_endpoint;
use crate::error::{PollerError, Result};

#[derive(Debug, Deserialize)]
struct NodeStatus {
    healthy_hyperion_endpoints: Vec<String>,
}

pub struct EndpointDirectory {
    client: reqwest::Client,
    registry_url: String,
}

impl EndpointDirectory {
    /// `client` should carry the configured request timeout.
    pub fn new(client: reqwest::Client, registry_url: impl Into<String>) -> Self {
        Self {
            client,
            registry_url: normalize_endpoint(&registry_url.into()),
        }
    }

    pub fn url_for(&self, chain_id: &str) -> String {
        format!("{}/apps/nodestatus/{}.json", self.registry_url, chain_id)
    }

    /// Fetch the registry's endpoint list for `chain_id`: `https` only,
    /// deduplicated, first-seen order.
    pub async fn fetch(&self, chain_id: &str) -> Result<Vec<String>> {
        let url = self.url_for(chain_id);
        debug!(%url, "Fetching endpoints");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollerError::DirectoryUnavailable(e.to_string()))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(PollerError::DirectoryUnavailable(format!(
                "{} returned {}",
                url,
                resp.status()
            )));
        }

        let body: NodeStatus = resp
            .json()
            .await
            .map_err(|e| PollerError::DirectoryUnavailable(e.to_string()))?;

        Ok(secure_unique(body.healthy_hyperion_endpoints))
    }

    /// Resolve the bootstrap candidate set. Falls back to `configured` on
    /// any failure, and also when the registry lists nothing usable.
    pub async fn resolve(&self, chain_id: &str, configured: &[String]) -> Vec<String> {
        match self.fetch(chain_id).await {
            Ok(endpoints) if !endpoints.is_empty() => endpoints,
            Ok(_) => {
                warn!("Registry listed no https endpoints, keeping configured list");
                configured.to_vec()
            }
            Err(e) => {
                warn!("Error fetching endpoints: {}", e);
                configured.to_vec()
            }
        }
    }
}

fn secure_unique(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| u.starts_with("https://"))
        .map(|u| normalize_endpoint(&u))
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
