//! Outbound events: what a poll loop tells its consumer.

use tokio::sync::mpsc;

use crate::api::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// New actions, deduplicated, in received order. Never empty.
    Actions(Vec<Action>),
    /// A fetch request completed this cycle (whatever it returned).
    SuccessfulQuery,
}

/// Buffered event channel. The loop waits when the consumer falls behind.
pub fn channel(buffer: usize) -> (mpsc::Sender<PollEvent>, mpsc::Receiver<PollEvent>) {
    mpsc::channel(buffer)
}
