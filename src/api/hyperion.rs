//! reqwest-backed Hyperion v2 client.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{Action, ActionQuery, GetActionsResponse, HealthResponse, HistoryApi};
use crate::error::{PollerError, Result};

pub struct HyperionClient {
    client: reqwest::Client,
}

impl HyperionClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hyperion-poller/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Underlying client, for sharing its connection pool and timeout.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl HistoryApi for HyperionClient {
    async fn health(&self, endpoint: &str) -> Result<HealthResponse> {
        let url = format!("{}/v2/health", endpoint);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(PollerError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(resp.json().await?)
    }

    async fn get_actions(&self, endpoint: &str, query: &ActionQuery) -> Result<Vec<Action>> {
        let url = format!("{}/v2/history/get_actions", endpoint);
        debug!(%url, from_block = query.from_block, "Getting actions");

        let resp = self.client.get(&url).query(&query.params()).send().await?;
        if !resp.status().is_success() {
            return Err(PollerError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }

        let body: GetActionsResponse = resp.json().await?;
        let actions = if query.simple {
            body.simple_actions
        } else {
            body.actions
        };
        actions.ok_or_else(|| PollerError::FetchFailed {
            endpoint: endpoint.to_string(),
            reason: if query.simple {
                "response has no `simple_actions` array".into()
            } else {
                "response has no `actions` array".into()
            },
        })
    }
}
