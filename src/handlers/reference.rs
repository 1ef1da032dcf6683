//! Reference-backed variant calling (spec §4.9): collection A is the
//! sample reads, collection B a reference genome. A child shared by both
//! sides always propagates in both — it's just confirmed sequence. A
//! child private to A only propagates (and is reported) once it clears
//! `min_occ`, since without reference support it's the read set's only
//! evidence that the branch is real.
//!
//! "B multi-maps" means B's interval itself already covers more than one
//! reference position (a repeat); in that case the handler defers to
//! whatever B supports rather than flagging A-only children as variants,
//! since a multi-mapping region can't distinguish "novel" from "not in
//! this copy of the repeat".

use super::{Decision, Discovery, DiscoveryKind, IntervalContext, IntervalHandler};

pub struct ReferenceHandler {
    pub min_occ: u64,
}

impl IntervalHandler for ReferenceHandler {
    fn classify(&mut self, ctx: &IntervalContext<'_>) -> Decision {
        let size = ctx.child_counts_a.len();
        let mut decision = Decision::none(size);
        let b = ctx.child_counts_b.unwrap_or(&[]);
        let b_multi_maps = b.iter().sum::<u64>() > 1;

        for symbol in 0..size {
            let a_count = ctx.child_counts_a[symbol];
            let b_count = b.get(symbol).copied().unwrap_or(0);
            let shared = a_count > 0 && b_count > 0;

            decision.propagate_b[symbol] = b_count > 0;

            if shared {
                decision.propagate_a[symbol] = true;
            } else if b_multi_maps {
                // Repeat in the reference: stay conservative, follow B's
                // lead rather than calling an A-only branch a variant.
                decision.propagate_a[symbol] = b_count > 0;
            } else if a_count >= self.min_occ {
                decision.propagate_a[symbol] = true;
                decision.discoveries.push(Discovery {
                    symbol: symbol as u8,
                    kind: DiscoveryKind::NovelVariant,
                });
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_children_always_propagate() {
        let mut handler = ReferenceHandler { min_occ: 10 };
        let a = vec![0, 2, 0];
        let b = vec![0, 1, 0];
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 1,
            min_occ: 10,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(decision.propagate_a[1]);
        assert!(decision.discoveries.is_empty());
    }

    #[test]
    fn a_only_child_above_threshold_is_a_novel_variant() {
        let mut handler = ReferenceHandler { min_occ: 3 };
        let a = vec![0, 5, 0];
        let b = vec![0, 0, 0];
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 1,
            min_occ: 3,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(decision.propagate_a[1]);
        assert_eq!(decision.discoveries[0].kind, DiscoveryKind::NovelVariant);
    }

    #[test]
    fn multi_mapping_reference_suppresses_variant_call() {
        let mut handler = ReferenceHandler { min_occ: 1 };
        let a = vec![0, 5, 0];
        let b = vec![0, 0, 2]; // B's total > 1 elsewhere in the interval: a repeat
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 1,
            min_occ: 1,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(!decision.propagate_a[1]);
        assert!(decision.discoveries.is_empty());
    }
}
