//! Poll cursor: lower bound of the next query and the dedupe watermark.

use serde::Serialize;
use tracing::warn;

use crate::api::Action;

/// Where the next query starts and which sequence numbers were already
/// delivered. Both fields only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollCursor {
    next_block: u64,
    last_sequence: u64,
}

impl PollCursor {
    pub fn new(start_block: u64) -> Self {
        Self {
            next_block: start_block,
            last_sequence: 0,
        }
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Whether `action` has not been delivered yet. Records without a
    /// global sequence fall back to the block bound.
    pub fn is_new(&self, action: &Action) -> bool {
        match action.global_sequence {
            Some(seq) => seq > self.last_sequence,
            None => action.block_num >= self.next_block,
        }
    }

    /// Drop already-delivered actions, advance past the rest, and return
    /// them in received order. An empty result leaves the cursor alone.
    pub fn advance(&mut self, batch: Vec<Action>) -> Vec<Action> {
        let fresh = self.filter(batch);
        if let Some(max_block) = fresh.iter().map(|a| a.block_num).max() {
            self.bump(max_block.saturating_add(1), &fresh);
        }
        fresh
    }

    /// Like [`advance`](Self::advance), for a batch that came back from a
    /// query capped at `limit`. A full page may have cut its last block
    /// short, so that block is queried again next time and the sequence
    /// watermark drops the overlap. That only works when every action in
    /// the page carries a global sequence; otherwise, or when the whole page
    /// sits in one block, the cursor moves past the last block.
    pub fn advance_page(&mut self, batch: Vec<Action>, limit: u32) -> Vec<Action> {
        let page_full = batch.len() >= limit as usize;
        let sequenced = batch.iter().all(|a| a.global_sequence.is_some());
        let last_block = batch.iter().map(|a| a.block_num).max();
        let spans_blocks = match (batch.iter().map(|a| a.block_num).min(), last_block) {
            (Some(first), Some(last)) => first < last,
            _ => false,
        };

        let fresh = self.filter(batch);
        let max_block = match fresh.iter().map(|a| a.block_num).max() {
            Some(max) => max,
            None => return fresh,
        };

        let next_block = match last_block {
            Some(last) if page_full && spans_blocks && sequenced => last,
            _ => {
                if page_full {
                    warn!(
                        block = max_block,
                        limit, "Page filled up to its last block, remaining actions in it are skipped"
                    );
                }
                max_block.saturating_add(1)
            }
        };
        self.bump(next_block, &fresh);
        fresh
    }

    fn filter(&self, batch: Vec<Action>) -> Vec<Action> {
        batch.into_iter().filter(|a| self.is_new(a)).collect()
    }

    fn bump(&mut self, next_block: u64, fresh: &[Action]) {
        self.next_block = self.next_block.max(next_block);
        if let Some(max_seq) = fresh.iter().filter_map(|a| a.global_sequence).max() {
            self.last_sequence = self.last_sequence.max(max_seq);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{action, simple_action};
    use super::*;

    fn cursor(next_block: u64, last_sequence: u64) -> PollCursor {
        PollCursor {
            next_block,
            last_sequence,
        }
    }

    fn seqs(actions: &[Action]) -> Vec<u64> {
        actions.iter().filter_map(|a| a.global_sequence).collect()
    }

    #[test]
    fn test_overlap_is_dropped_and_cursor_advances() {
        let mut c = cursor(100, 50);
        let out = c.advance(vec![action(99, 48), action(101, 51), action(101, 52)]);
        assert_eq!(seqs(&out), vec![51, 52]);
        assert_eq!(c, cursor(102, 52));
    }

    #[test]
    fn test_empty_batch_leaves_cursor() {
        let mut c = cursor(100, 50);
        assert!(c.advance(vec![]).is_empty());
        assert_eq!(c, cursor(100, 50));
    }

    #[test]
    fn test_fully_stale_batch_leaves_cursor() {
        let mut c = cursor(100, 50);
        let out = c.advance(vec![action(95, 40), action(99, 50)]);
        assert!(out.is_empty());
        assert_eq!(c, cursor(100, 50));
    }

    #[test]
    fn test_received_order_is_kept() {
        let mut c = PollCursor::new(0);
        let out = c.advance(vec![action(5, 9), action(3, 7), action(4, 8)]);
        assert_eq!(seqs(&out), vec![9, 7, 8]);
        assert_eq!(c, cursor(6, 9));
    }

    #[test]
    fn test_never_moves_backwards() {
        let mut c = cursor(200, 80);
        // Fresh by sequence, but from an earlier block (lagging node).
        let out = c.advance(vec![action(150, 81)]);
        assert_eq!(seqs(&out), vec![81]);
        assert_eq!(c.next_block(), 200);
        assert_eq!(c.last_sequence(), 81);
    }

    #[test]
    fn test_monotonic_over_many_batches() {
        let mut c = PollCursor::new(10);
        let batches = vec![
            vec![action(10, 1), action(11, 2)],
            vec![],
            vec![action(9, 1), action(11, 2)],
            vec![action(12, 3)],
            vec![action(5, 0)],
        ];
        let mut prev = c;
        for batch in batches {
            c.advance(batch);
            assert!(c.next_block() >= prev.next_block());
            assert!(c.last_sequence() >= prev.last_sequence());
            prev = c;
        }
        assert_eq!(c, cursor(13, 3));
    }

    #[test]
    fn test_actions_without_sequence_use_block_bound() {
        let mut c = cursor(100, 50);
        let mut old = action(99, 0);
        old.global_sequence = None;
        let mut new = action(100, 0);
        new.global_sequence = None;

        let out = c.advance(vec![old, new]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].block_num, 100);
        assert_eq!(c, cursor(101, 50));
    }

    #[test]
    fn test_full_page_requeries_last_block() {
        let mut c = cursor(100, 50);
        let out = c.advance_page(vec![action(100, 51), action(101, 52), action(101, 53)], 3);
        assert_eq!(out.len(), 3);
        assert_eq!(c, cursor(101, 53));

        // The re-query returns the tail of block 101; only the new one survives.
        let out = c.advance_page(vec![action(101, 52), action(101, 53), action(101, 54)], 3);
        assert_eq!(seqs(&out), vec![54]);
        assert_eq!(c, cursor(102, 54));
    }

    #[test]
    fn test_partial_page_behaves_like_advance() {
        let mut c = cursor(100, 50);
        c.advance_page(vec![action(99, 48), action(101, 51), action(101, 52)], 1000);
        assert_eq!(c, cursor(102, 52));
    }

    #[test]
    fn test_full_page_in_single_block_moves_on() {
        let mut c = cursor(100, 50);
        c.advance_page(vec![action(100, 51), action(100, 52)], 2);
        assert_eq!(c, cursor(101, 52));
    }

    #[test]
    fn test_full_page_without_sequences_moves_past_last_block() {
        let mut c = cursor(100, 0);
        let out = c.advance_page(
            vec![simple_action(100), simple_action(101), simple_action(101)],
            3,
        );
        assert_eq!(out.len(), 3);
        assert_eq!(c.next_block(), 102);

        // A node replaying block 101 must not deliver it twice.
        let out = c.advance_page(
            vec![simple_action(101), simple_action(101), simple_action(102)],
            3,
        );
        let blocks: Vec<u64> = out.iter().map(|a| a.block_num).collect();
        assert_eq!(blocks, vec![102]);
        assert_eq!(c, cursor(103, 0));
    }
}
