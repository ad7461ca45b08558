//! Action fetcher: one bounded `get_actions` query per cycle.

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::cursor::PollCursor;
use crate::api::{Action, ActionQuery, HistoryApi};

/// Result of one fetch. A failure is not an error for the caller: it just
/// means there is nothing to deliver this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Completed(Vec<Action>),
    Failed,
}

impl FetchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FetchOutcome::Completed(_))
    }

    pub fn into_actions(self) -> Vec<Action> {
        match self {
            FetchOutcome::Completed(actions) => actions,
            FetchOutcome::Failed => Vec::new(),
        }
    }
}

pub struct ActionFetcher {
    api: Arc<dyn HistoryApi>,
    account: String,
    limit: u32,
    simple: bool,
    timeout: Duration,
}

impl ActionFetcher {
    pub fn new(
        api: Arc<dyn HistoryApi>,
        account: impl Into<String>,
        limit: u32,
        simple: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            api,
            account: account.into(),
            limit,
            simple,
            timeout,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn query_for(&self, cursor: &PollCursor) -> ActionQuery {
        ActionQuery {
            account: self.account.clone(),
            from_block: cursor.next_block(),
            limit: self.limit,
            simple: self.simple,
        }
    }

    /// Fetch actions from `cursor.next_block()` onwards, ascending.
    pub async fn fetch(&self, endpoint: &str, cursor: &PollCursor) -> FetchOutcome {
        let query = self.query_for(cursor);
        let result = tokio::time::timeout(self.timeout, self.api.get_actions(endpoint, &query)).await;

        let reason = match result {
            Ok(Ok(actions)) => return FetchOutcome::Completed(actions),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.timeout),
        };
        warn!(endpoint, %reason, "Fetch failed");
        FetchOutcome::Failed
    }
}
