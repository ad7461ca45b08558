//! Hyperion history API: wire types and the client seam.
//!
//! The poller only ever talks to an endpoint through [`HistoryApi`]; the
//! production implementation is [`hyperion::HyperionClient`]. Tests drive
//! the loop with scripted implementations instead of a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod hyperion;

/// Upper bound of every `block_num` range; effectively "head of chain".
pub const BLOCK_RANGE_UPPER_BOUND: u64 = 100_000_000_000;

// ── Health Types ────────────────────────────────────────────────────

/// Body of `GET /v2/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub host: String,
    pub health: Vec<ServiceHealth>,
    #[serde(default)]
    pub features: Features,
}

/// One sub-service entry (`NodeosRPC`, `RabbitMq`, `Elasticsearch`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: String,
    pub status: String,
    /// Service clock, epoch milliseconds.
    pub time: f64,
    #[serde(default)]
    pub service_data: Option<ServiceData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceData {
    #[serde(default)]
    pub last_indexed_block: Option<u64>,
    #[serde(default)]
    pub total_indexed_blocks: Option<u64>,
}

/// Indexing features the poller depends on. Missing flags read as off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub index_deltas: bool,
    #[serde(default)]
    pub index_all_deltas: bool,
    #[serde(default)]
    pub index_transfer_memo: bool,
}

// ── Action Types ────────────────────────────────────────────────────

/// One action record. Only the ordering fields are typed; everything else
/// is carried through untouched in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// `block_num` in full mode, `block` in simplified mode.
    #[serde(alias = "block")]
    pub block_num: u64,
    /// Absent from simplified records.
    #[serde(default)]
    pub global_sequence: Option<u64>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Action {
    /// Action name: `act.name` for full records, `action` for simplified ones.
    pub fn name(&self) -> Option<&str> {
        self.payload
            .get("act")
            .and_then(|act| act.get("name"))
            .or_else(|| self.payload.get("action"))
            .and_then(Value::as_str)
    }
}

/// Parameters of one `get_actions` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionQuery {
    pub account: String,
    pub from_block: u64,
    pub limit: u32,
    pub simple: bool,
}

impl ActionQuery {
    /// Query-string pairs in the order Hyperion documents them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("account", self.account.clone()),
            ("block_num", format!("{}-{}", self.from_block, BLOCK_RANGE_UPPER_BOUND)),
            ("limit", self.limit.to_string()),
            ("noBinary", "true".to_string()),
            ("simple", self.simple.to_string()),
            ("sort", "asc".to_string()),
        ]
    }
}

/// Body of `GET /v2/history/get_actions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetActionsResponse {
    #[serde(default)]
    pub actions: Option<Vec<Action>>,
    #[serde(default)]
    pub simple_actions: Option<Vec<Action>>,
}

// ── API Trait ───────────────────────────────────────────────────────

/// What the poller needs from a history endpoint.
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// `GET <endpoint>/v2/health`.
    async fn health(&self, endpoint: &str) -> Result<HealthResponse>;

    /// `GET <endpoint>/v2/history/get_actions`, returned in server order.
    async fn get_actions(&self, endpoint: &str, query: &ActionQuery) -> Result<Vec<Action>>;
}

/// Strip trailing slashes so `<endpoint>/v2/...` never doubles up.
pub fn normalize_endpoint(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
