//! Endpoint discovery: startup-only lookup of known Hyperion endpoints.
//!
//! The registry is slow-changing, so it is queried once when a loop
//! bootstraps. If it is down, the configured endpoints stand.

pub mod directory;

pub use directory::EndpointDirectory;
