//! Splice-junction discovery (spec §4.9): collection A is the RNA-seq (or
//! assembled transcript) read set, collection B a reference genome's BWT.
//! A child is kept in A once it clears `min_occ` read support; it is kept
//! in B the moment it exists at all, since the reference only needs to
//! prove the branch is reachable, not well covered. A breakpoint is
//! reported when both sides have a child the other side lacks — a read
//! supports a continuation the reference doesn't, while the reference
//! supports one the reads don't.

use super::{Decision, Discovery, DiscoveryKind, IntervalContext, IntervalHandler};

pub struct SpliceHandler {
    pub min_occ: u64,
}

impl IntervalHandler for SpliceHandler {
    fn classify(&mut self, ctx: &IntervalContext<'_>) -> Decision {
        let size = ctx.child_counts_a.len();
        let mut decision = Decision::none(size);
        let b = ctx.child_counts_b.unwrap_or(&[]);

        for symbol in 0..size {
            let a_count = ctx.child_counts_a[symbol];
            let b_count = b.get(symbol).copied().unwrap_or(0);
            decision.propagate_a[symbol] = a_count >= self.min_occ;
            decision.propagate_b[symbol] = b_count > 0;
        }

        let a_private = (0..size).any(|s| ctx.child_counts_a[s] >= self.min_occ && b.get(s).copied().unwrap_or(0) == 0);
        let b_private = (0..size).any(|s| b.get(s).copied().unwrap_or(0) > 0 && ctx.child_counts_a[s] < self.min_occ);
        if a_private && b_private {
            for symbol in 0..size {
                if ctx.child_counts_a[symbol] >= self.min_occ && b.get(symbol).copied().unwrap_or(0) == 0 {
                    decision.discoveries.push(Discovery {
                        symbol: symbol as u8,
                        kind: DiscoveryKind::Breakpoint,
                    });
                }
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagates_a_above_threshold_and_b_whenever_present() {
        let mut handler = SpliceHandler { min_occ: 3 };
        let a = vec![0, 5, 1, 0];
        let b = vec![0, 0, 1, 2];
        let decision = handler.classify(&IntervalContext {
            pile: 1,
            word_len: 4,
            min_occ: 3,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert_eq!(decision.propagate_a, vec![false, true, false, false]);
        assert_eq!(decision.propagate_b, vec![false, false, true, true]);
    }

    #[test]
    fn flags_breakpoint_only_when_both_sides_have_private_children() {
        let mut handler = SpliceHandler { min_occ: 2 };
        let a = vec![0, 4, 0];
        let b = vec![0, 0, 3];
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 4,
            min_occ: 2,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert_eq!(decision.discoveries.len(), 1);
        assert_eq!(decision.discoveries[0].symbol, 1);
        assert_eq!(decision.discoveries[0].kind, DiscoveryKind::Breakpoint);
    }
}
