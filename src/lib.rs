//! hyperion-poller: streams new actions for an account from public
//! Hyperion history endpoints.
//!
//! # Architecture
//!
//! ```text
//! PollLoop
//!   ├── EndpointDirectory   (startup: registry → candidate endpoints)
//!   ├── HealthChecker       (every N cycles: probe all candidates in parallel)
//!   ├── EndpointSelector    (per cycle: random healthy endpoint)
//!   ├── ActionFetcher       (per cycle: get_actions from the cursor)
//!   ├── PollCursor          (dedupe + advance)
//!   └── mpsc::Sender<PollEvent> → consumer
//! ```

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod poller;
pub mod pool;

pub use api::{Action, HistoryApi};
pub use config::PollerConfig;
pub use error::{PollerError, Result};
pub use poller::{PollEvent, PollLoop, PollState};
