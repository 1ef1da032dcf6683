//! Somatic variant discovery (spec §4.9): collection A is tumour reads,
//! collection B matched normal reads. Because the two collections are
//! rarely the same depth, a raw `b_count == 0` test is too strict — a
//! child is treated as "present in normal" once it clears the same
//! fraction of normal depth that the tumour count represents of tumour
//! depth, scaled by `set_size_ratio` (|A reads| / |B reads|, injected by
//! the caller rather than recomputed from the BWTs this handler never
//! sees).

use super::{Decision, Discovery, DiscoveryKind, IntervalContext, IntervalHandler};

pub struct TumourNormalHandler {
    pub min_occ: u64,
    /// |tumour reads| / |normal reads|, used to scale the normal-side
    /// support threshold up or down to match sequencing depth.
    pub set_size_ratio: f64,
}

impl IntervalHandler for TumourNormalHandler {
    fn classify(&mut self, ctx: &IntervalContext<'_>) -> Decision {
        let size = ctx.child_counts_a.len();
        let mut decision = Decision::none(size);
        let b = ctx.child_counts_b.unwrap_or(&[]);

        for symbol in 0..size {
            let a_count = ctx.child_counts_a[symbol];
            let b_count = b.get(symbol).copied().unwrap_or(0);
            let expected_in_normal = (a_count as f64 / self.set_size_ratio.max(f64::EPSILON)).max(1.0);
            let present_in_normal = (b_count as f64) >= expected_in_normal * 0.1;

            decision.propagate_b[symbol] = b_count > 0;

            if a_count == 0 {
                continue;
            }
            if present_in_normal {
                decision.propagate_a[symbol] = true;
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
    fn high_tumour_count_absent_in_normal_is_somatic() {
        let mut handler = TumourNormalHandler {
            min_occ: 5,
            set_size_ratio: 1.0,
        };
        let a = vec![0, 20, 0];
        let b = vec![0, 0, 0];
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 30,
            min_occ: 5,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(decision.propagate_a[1]);
        assert_eq!(decision.discoveries.len(), 1);
    }

    #[test]
    fn proportionally_present_in_normal_is_not_flagged() {
        let mut handler = TumourNormalHandler {
            min_occ: 5,
            set_size_ratio: 2.0, // tumour has 2x normal's depth
        };
        let a = vec![0, 20, 0];
        let b = vec![0, 10, 0]; // matches the scaled-down expectation
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 30,
            min_occ: 5,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(decision.propagate_a[1]);
        assert!(decision.discoveries.is_empty());
    }
}
