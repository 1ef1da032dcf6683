//! `IntervalStore` (spec §4.8): a FIFO per `(pileN, firstPileOfWord)`
//! bucket, holding the backward-search ranges waiting to be extended one
//! more character. Grounded on the original's `RangeStoreExternal`
//! (`countWords/RangeStore.hh`), collapsed here from its on-disk,
//! per-pile-file implementation to in-memory queues since this crate's
//! backtracker runs one generation at a time rather than streaming
//! across a whole-genome index built incrementally on disk.

use bitflags::bitflags;
use std::collections::VecDeque;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RangeFlags: u8 {
        /// Carry the accumulated word string along with this range
        /// (expensive; only set when a handler needs it for reporting).
        const TRACK_WORD = 1 << 0;
    }
}

/// One backward-search interval: `num` consecutive rows of some pile in
/// collection A, all currently sharing the same (possibly still-empty)
/// suffix word, plus — while the second collection still has a
/// corresponding interval — the matching `(pos_b, num_b)` in collection
/// B. Once a handler declines to keep extending B's side, `pos_b`/`num_b`
/// become `None` and the range continues in A-only mode (spec §4.8).
#[derive(Debug, Clone)]
pub struct Range {
    pub pos: u64,
    pub num: u64,
    pub pos_b: Option<u64>,
    pub num_b: Option<u64>,
    pub flags: RangeFlags,
    /// Present only when `flags` carries [`RangeFlags::TRACK_WORD`].
    pub word: Option<Vec<u8>>,
}

impl Range {
    pub fn seed(pos: u64, num: u64, track_word: bool) -> Self {
        Range {
            pos,
            num,
            pos_b: None,
            num_b: None,
            flags: if track_word { RangeFlags::TRACK_WORD } else { RangeFlags::empty() },
            word: if track_word { Some(Vec::new()) } else { None },
        }
    }

    /// A's side of the next extension. The caller fills in `pos_b`/`num_b`
    /// afterward if the handler kept B's side alive too.
    pub fn extend(&self, new_pos: u64, new_num: u64, symbol: u8) -> Self {
        let word = self.word.as_ref().map(|w| {
            let mut w = w.clone();
            w.push(symbol);
            w
        });
        Range {
            pos: new_pos,
            num: new_num,
            pos_b: None,
            num_b: None,
            flags: self.flags,
            word,
        }
    }
}

/// `buckets[pile * alphabet_size + first_pile_of_word]`: a FIFO of
/// ranges currently sitting in `pile`, all of whose accumulated word (if
/// tracked) began with the symbol indexed by `first_pile_of_word`.
/// Bucketing by the word's first character, not just its current pile,
/// is what lets the backtracker answer "which original query does this
/// range belong to" without storing a query id on every range (spec
/// §4.8: delivery order is source pile index, then position).
pub struct IntervalStore {
    alphabet_size: usize,
    buckets: Vec<VecDeque<Range>>,
}

impl IntervalStore {
    pub fn new(alphabet_size: usize) -> Self {
        IntervalStore {
            alphabet_size,
            buckets: (0..alphabet_size * alphabet_size).map(|_| VecDeque::new()).collect(),
        }
    }

    fn idx(&self, pile: u8, first_pile_of_word: u8) -> usize {
        pile as usize * self.alphabet_size + first_pile_of_word as usize
    }

    pub fn push(&mut self, pile: u8, first_pile_of_word: u8, range: Range) {
        let i = self.idx(pile, first_pile_of_word);
        self.buckets[i].push_back(range);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(VecDeque::is_empty)
    }

    /// Drain every range currently parked in `pile`, across all
    /// `firstPileOfWord` buckets, in deterministic `(firstPileOfWord,
    /// FIFO)` order.
    pub fn drain_pile(&mut self, pile: u8) -> Vec<(u8, Range)> {
        let mut out = Vec::new();
        for first in 0..self.alphabet_size as u8 {
            let i = self.idx(pile, first);
            while let Some(range) = self.buckets[i].pop_front() {
                out.push((first, range));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_pile_is_fifo_within_each_first_pile_bucket() {
        let mut store = IntervalStore::new(3);
        store.push(1, 0, Range::seed(0, 2, false));
        store.push(1, 0, Range::seed(2, 1, false));
        store.push(1, 2, Range::seed(5, 4, false));

        let drained = store.drain_pile(1);
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].0, 0);
        assert_eq!(drained[0].1.pos, 0);
        assert_eq!(drained[1].0, 0);
        assert_eq!(drained[1].1.pos, 2);
        assert_eq!(drained[2].0, 2);
        assert!(store.is_empty());
    }
}
