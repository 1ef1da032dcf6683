//! Per-pile cumulative symbol counts (spec §3 `LetterCountEachPile`, §4.5).
//!
//! `LetterCountTable` is the single source of truth for global positional
//! arithmetic: it supports `+=` accumulation (per-thread tables merged at
//! cycle end, spec §5), row-wise prefix sums yielding the `C[]` array used
//! by LF / rank queries, and optional serialisation for diagnostics.

use std::ops::AddAssign;

/// `|Σ| x |Σ|` matrix: `counts[pile][symbol]` is the number of occurrences
/// of `symbol` in `pile`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LetterCountTable {
    alphabet_size: usize,
    counts: Vec<u64>,
}

impl LetterCountTable {
    pub fn new(alphabet_size: usize) -> Self {
        LetterCountTable {
            alphabet_size,
            counts: vec![0u64; alphabet_size * alphabet_size],
        }
    }

    #[inline(always)]
    fn idx(&self, pile: usize, symbol: usize) -> usize {
        pile * self.alphabet_size + symbol
    }

    #[inline(always)]
    pub fn get(&self, pile: usize, symbol: usize) -> u64 {
        self.counts[self.idx(pile, symbol)]
    }

    #[inline(always)]
    pub fn add(&mut self, pile: usize, symbol: usize, amount: u64) {
        let i = self.idx(pile, symbol);
        self.counts[i] += amount;
    }

    /// Add one pile's worth of symbol counts (e.g. freshly returned from
    /// `read_and_count`) in one call.
    pub fn add_row(&mut self, pile: usize, row: &[u64]) {
        for (symbol, &amount) in row.iter().enumerate() {
            self.add(pile, symbol, amount);
        }
    }

    /// Total length of `pile` (row sum).
    pub fn pile_len(&self, pile: usize) -> u64 {
        (0..self.alphabet_size).map(|s| self.get(pile, s)).sum()
    }

    /// Global occurrences of `symbol` across all piles (column sum).
    pub fn symbol_total(&self, symbol: usize) -> u64 {
        (0..self.alphabet_size).map(|p| self.get(p, symbol)).sum()
    }

    /// `C[]`: for each symbol `s`, the number of BWT symbols strictly
    /// smaller than `s`, i.e. the column prefix sum over symbol totals in
    /// alphabet order.
    pub fn c_array(&self) -> Vec<u64> {
        let mut c = vec![0u64; self.alphabet_size];
        let mut running = 0u64;
        for s in 0..self.alphabet_size {
            c[s] = running;
            running += self.symbol_total(s);
        }
        c
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// `occ_before_pile[pile][symbol]` = occurrences of `symbol` in piles
    /// strictly before `pile`. The cross-pile half of the generalised
    /// LF-mapping used by both inversion (§4.7) and backward search
    /// (§4.8): piles stand in for contiguous blocks of one conceptual L
    /// column, so a symbol's global rank is this running total plus its
    /// rank within the current pile.
    pub fn occ_before_pile(&self) -> Vec<Vec<u64>> {
        let mut table = vec![vec![0u64; self.alphabet_size]; self.alphabet_size];
        for symbol in 0..self.alphabet_size {
            let mut running = 0u64;
            for pile in 0..self.alphabet_size {
                table[pile][symbol] = running;
                running += self.get(pile, symbol);
            }
        }
        table
    }
}

impl AddAssign<&LetterCountTable> for LetterCountTable {
    fn add_assign(&mut self, rhs: &LetterCountTable) {
        debug_assert_eq!(self.alphabet_size, rhs.alphabet_size);
        for (a, b) in self.counts.iter_mut().zip(rhs.counts.iter()) {
            *a += b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_array_is_prefix_sum_of_symbol_totals() {
        let mut t = LetterCountTable::new(3);
        t.add(0, 0, 5); // 5 occurrences of symbol 0 in pile 0
        t.add(1, 1, 2);
        t.add(2, 2, 7);
        let c = t.c_array();
        assert_eq!(c, vec![0, 5, 7]);
    }

    #[test]
    fn merge_accumulates() {
        let mut a = LetterCountTable::new(2);
        let mut b = LetterCountTable::new(2);
        a.add(0, 0, 1);
        b.add(0, 0, 4);
        b.add(1, 1, 3);
        a += &b;
        assert_eq!(a.get(0, 0), 5);
        assert_eq!(a.get(1, 1), 3);
    }
}
