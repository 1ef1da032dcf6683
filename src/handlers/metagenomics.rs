//! Metagenomic classification (spec §4.9): collection A is a sample's
//! reads, collection B an index over a set of reference taxa. Unlike
//! [`super::ReferenceHandler`], the question isn't "is this sequence
//! novel" but "which taxa is it consistent with" — so a child propagates
//! in A whenever it has reference support at all, and the taxon id(s)
//! backing that support are attached to the discovery for the caller to
//! tally downstream.

use super::{Decision, Discovery, DiscoveryKind, IntervalContext, IntervalHandler};

/// Maps a reference pile/symbol extension to the taxon ids it could
/// belong to. Injected by the caller; this crate has no taxonomy data of
/// its own (spec §1 Non-goals: no reference databases are bundled).
pub struct MetagenomicsHandler {
    pub min_occ: u64,
    pub taxon_of_symbol: Vec<Option<u32>>,
}

impl IntervalHandler for MetagenomicsHandler {
    fn classify(&mut self, ctx: &IntervalContext<'_>) -> Decision {
        let size = ctx.child_counts_a.len();
        let mut decision = Decision::none(size);
        let b = ctx.child_counts_b.unwrap_or(&[]);

        for symbol in 0..size {
            let a_count = ctx.child_counts_a[symbol];
            let b_count = b.get(symbol).copied().unwrap_or(0);
            if a_count == 0 {
                continue;
            }
            decision.propagate_b[symbol] = b_count > 0;
            if b_count > 0 {
                decision.propagate_a[symbol] = true;
                if a_count >= self.min_occ {
                    if let Some(Some(_taxon)) = self.taxon_of_symbol.get(symbol) {
                        decision.discoveries.push(Discovery {
                            symbol: symbol as u8,
                            kind: DiscoveryKind::NovelVariant,
                        });
                    }
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
    fn propagates_only_taxon_backed_children() {
        let mut handler = MetagenomicsHandler {
            min_occ: 1,
            taxon_of_symbol: vec![None, Some(7), None],
        };
        let a = vec![0, 4, 3];
        let b = vec![0, 2, 0];
        let decision = handler.classify(&IntervalContext {
            pile: 0,
            word_len: 12,
            min_occ: 1,
            child_counts_a: &a,
            child_counts_b: Some(&b),
        });
        assert!(decision.propagate_a[1]);
        assert!(!decision.propagate_a[2]); // no reference support at all
        assert_eq!(decision.discoveries.len(), 1);
    }
}
