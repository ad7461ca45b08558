//! Poller configuration: YAML file with camelCase keys.
//!
//! Every option has a default except `account`, so a minimal file is:
//!
//! ```yaml
//! account: koilamarkett
//! chainId: 1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PollerError, Result};

pub const DEFAULT_REGISTRY_URL: &str = "https://api.ledgerwise.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollerConfig {
    /// Initial candidate endpoints (used as-is when the directory is off or down).
    pub endpoints: Vec<String>,
    /// Replace `endpoints` with the registry's list at startup.
    pub fetch_endpoint_list: bool,
    /// Chain identifier used to template the registry URL.
    pub chain_id: Option<String>,
    /// First block to query.
    pub start_block: u64,
    /// Account whose actions are tracked.
    pub account: String,
    /// Optional label attached to the loop's log span.
    pub name: Option<String>,
    /// Fixed wait between cycles; also the clock-skew tolerance for probes.
    pub loop_wait_seconds: u64,
    /// Re-run the health check every N cycles.
    pub health_loops: u64,
    /// Ask for `simple_actions` instead of full action records.
    pub simple_actions: bool,
    /// Maximum actions per query.
    pub query_limit: u32,
    /// Base URL of the endpoint registry.
    pub registry_url: String,
    /// Timeout applied to every outbound request.
    pub request_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            fetch_endpoint_list: true,
            chain_id: None,
            start_block: 0,
            account: String::new(),
            name: None,
            loop_wait_seconds: 10,
            health_loops: 35,
            simple_actions: false,
            query_limit: 1000,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            request_timeout_ms: 5000,
        }
    }
}

impl PollerConfig {
    /// `~/.hyperion-poller/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".hyperion-poller").join("config.yaml"))
    }

    /// Read and parse a YAML config file. Does not validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PollerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| PollerError::Config(e.to_string()))
    }

    /// Reject configurations the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() {
            return Err(PollerError::Config("`account` is required".into()));
        }
        if self.loop_wait_seconds == 0 {
            return Err(PollerError::Config(
                "`loopWaitSeconds` must be at least 1, it is also the clock-skew tolerance".into(),
            ));
        }
        if self.health_loops == 0 {
            return Err(PollerError::Config("`healthLoops` must be at least 1".into()));
        }
        if self.query_limit == 0 {
            return Err(PollerError::Config("`queryLimit` must be at least 1".into()));
        }
        if self.fetch_endpoint_list {
            if self.chain_id.as_deref().map_or(true, |c| c.trim().is_empty()) {
                return Err(PollerError::Config(
                    "`chainId` is required when `fetchEndpointList` is enabled".into(),
                ));
            }
        } else if self.endpoints.is_empty() {
            return Err(PollerError::Config(
                "`endpoints` must not be empty when `fetchEndpointList` is disabled".into(),
            ));
        }
        Ok(())
    }

    pub fn loop_wait(&self) -> Duration {
        Duration::from_secs(self.loop_wait_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
