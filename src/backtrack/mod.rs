//! `TwoBwtBackTracker` (spec §4.8): backward search over one or two
//! completed BWTs at once, extending every live interval by one more
//! character per step and asking an [`IntervalHandler`] which branches
//! survive.
//!
//! Grounded on the original's `OneBwtBackTracker` (single-collection
//! backward search driven by `IntervalHandlerBase`), generalised to carry
//! an optional second collection's coordinates (`pos_b` / `num_b`)
//! alongside the primary one. Collection A always drives the search tree
//! — a branch survives only if A still has rows there — while B's
//! coordinates are tracked for comparison and dropped the first time a
//! handler declines to propagate them, which is this crate's "A-only"
//! mode (spec §4.8) falling out of the general case rather than being a
//! separate code path.

pub mod interval;

use crate::alphabet::Alphabet;
use crate::engine::BuildOutput;
use crate::error::Result;
use crate::handlers::{Discovery as HandlerDiscovery, IntervalContext, IntervalHandler};
use interval::{IntervalStore, Range};

/// One reported finding, tagged with the pile it was found in and (if
/// word tracking was requested) the accumulated word so far.
pub struct Finding {
    pub pile: u8,
    pub word: Option<Vec<u8>>,
    pub discovery: HandlerDiscovery,
}

pub struct TwoBwtBackTracker<'a> {
    a: &'a BuildOutput,
    b: Option<&'a BuildOutput>,
    alphabet: Alphabet,
    min_occ: u64,
    store: IntervalStore,
}

impl<'a> TwoBwtBackTracker<'a> {
    /// Seed one interval per non-terminator pile, spanning that pile's
    /// whole length in collection A — the starting point for "extend
    /// every suffix backward one character at a time" (spec §4.8).
    /// `b`, when present, must share `alphabet` with `a`; its pile sizes
    /// need not match A's.
    pub fn new(a: &'a BuildOutput, b: Option<&'a BuildOutput>, alphabet: Alphabet, min_occ: u64, track_words: bool) -> Self {
        let size = alphabet.len();
        let mut store = IntervalStore::new(size);
        for pile in alphabet.non_terminator_indices() {
            let len = a.counts.pile_len(pile as usize);
            if len == 0 {
                continue;
            }
            let mut seed = Range::seed(0, len, track_words);
            if let Some(b) = b {
                let blen = b.counts.pile_len(pile as usize);
                if blen > 0 {
                    seed.pos_b = Some(0);
                    seed.num_b = Some(blen);
                }
            }
            store.push(pile, pile, seed);
        }
        TwoBwtBackTracker { a, b, alphabet, min_occ, store }
    }

    /// Extend every live interval up to `max_length` characters (or until
    /// none remain), handing each extension to `handler` and collecting
    /// whatever it reports.
    pub fn run(&mut self, handler: &mut dyn IntervalHandler, max_length: usize) -> Result<Vec<Finding>> {
        let size = self.alphabet.len();
        let occ_before_a = self.a.counts.occ_before_pile();
        let occ_before_b = self.b.map(|b| b.counts.occ_before_pile());
        let mut findings = Vec::new();

        for word_len in 1..=max_length {
            if self.store.is_empty() {
                break;
            }
            for p in 0..size as u8 {
                let ranges = self.store.drain_pile(p);
                if ranges.is_empty() {
                    continue;
                }

                let mut order: Vec<usize> = (0..ranges.len()).collect();
                order.sort_by_key(|&i| ranges[i].1.pos);
                let intervals_a: Vec<(u64, u64)> = order.iter().map(|&i| (ranges[i].1.pos, ranges[i].1.num)).collect();
                let (rank_before_a, child_counts_a) = Self::sweep_pile(self.a, &self.alphabet, p, &intervals_a)?;

                // Only ranges still carrying B coordinates need a B sweep,
                // and they may need their own sort order since B's
                // positions don't generally track A's.
                let mut b_order: Vec<usize> = order.iter().copied().filter(|&i| ranges[i].1.pos_b.is_some()).collect();
                b_order.sort_by_key(|&i| ranges[i].1.pos_b.unwrap());
                let b_sweep = if let Some(b) = self.b {
                    if b_order.is_empty() {
                        None
                    } else {
                        let intervals_b: Vec<(u64, u64)> = b_order
                            .iter()
                            .map(|&i| (ranges[i].1.pos_b.unwrap(), ranges[i].1.num_b.unwrap()))
                            .collect();
                        Some(Self::sweep_pile(b, &self.alphabet, p, &intervals_b)?)
                    }
                } else {
                    None
                };
                let mut rank_before_b_by_order = vec![None; ranges.len()];
                let mut child_counts_b_by_order = vec![None; ranges.len()];
                if let Some((rb, cc)) = &b_sweep {
                    for (slot, &i) in b_order.iter().enumerate() {
                        rank_before_b_by_order[i] = Some(rb[slot].clone());
                        child_counts_b_by_order[i] = Some(cc[slot].clone());
                    }
                }

                for (slot, &orig_i) in order.iter().enumerate() {
                    let (first_pile, range) = &ranges[orig_i];
                    let cc_a = &child_counts_a[slot];
                    let cc_b = child_counts_b_by_order[orig_i].as_deref();

                    let ctx = IntervalContext {
                        pile: p,
                        word_len,
                        min_occ: self.min_occ,
                        child_counts_a: cc_a,
                        child_counts_b: cc_b,
                    };
                    let decision = handler.classify(&ctx);

                    for d in decision.discoveries {
                        findings.push(Finding {
                            pile: p,
                            word: range.word.clone(),
                            discovery: d,
                        });
                    }

                    for symbol in 0..size as u8 {
                        if !decision.propagate_a[symbol as usize] {
                            continue;
                        }
                        let new_num_a = cc_a[symbol as usize];
                        if new_num_a == 0 {
                            continue;
                        }
                        let new_pos_a = occ_before_a[p as usize][symbol as usize] + rank_before_a[slot][symbol as usize];

                        let mut child = range.extend(new_pos_a, new_num_a, symbol);
                        if decision.propagate_b[symbol as usize] {
                            if let (Some(occ_b), Some(rb), Some(cc_b)) =
                                (&occ_before_b, &rank_before_b_by_order[orig_i], &child_counts_b_by_order[orig_i])
                            {
                                let new_num_b = cc_b[symbol as usize];
                                if new_num_b > 0 {
                                    child.pos_b = Some(occ_b[p as usize][symbol as usize] + rb[symbol as usize]);
                                    child.num_b = Some(new_num_b);
                                }
                            }
                        }
                        self.store.push(symbol, *first_pile, child);
                    }
                }
            }
        }
        Ok(findings)
    }

    /// Sweep `pile`'s segment of `out` once, covering every interval in
    /// `intervals_sorted` (must be sorted and non-overlapping), returning
    /// for each one the per-symbol rank accumulated strictly before it
    /// started and the per-symbol counts within it.
    fn sweep_pile(out: &BuildOutput, alphabet: &Alphabet, pile: u8, intervals_sorted: &[(u64, u64)]) -> Result<(Vec<Vec<u64>>, Vec<Vec<u64>>)> {
        let size = alphabet.len();
        let mut reader = out.pileset.open_bwt_reader(pile, *alphabet, out.read_count)?;
        let mut running = vec![0u64; size];
        let mut cursor = 0u64;
        let mut rank_before = Vec::with_capacity(intervals_sorted.len());
        let mut child_counts = Vec::with_capacity(intervals_sorted.len());
        for &(pos, num) in intervals_sorted {
            let gap = pos - cursor;
            if gap > 0 {
                let mut discard = vec![0u64; size];
                reader.read_and_count(&mut discard, gap as usize)?;
                for s in 0..size {
                    running[s] += discard[s];
                }
                cursor += gap;
            }
            rank_before.push(running.clone());
            let mut within = vec![0u64; size];
            if num > 0 {
                reader.read_and_count(&mut within, num as usize)?;
            }
            for s in 0..size {
                running[s] += within[s];
            }
            cursor += num;
            child_counts.push(within);
        }
        Ok((rank_before, child_counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Codec, EngineConfig};
    use crate::context::EngineContext;
    use crate::cycle_source::SliceCycleSource;
    use crate::engine::build;
    use crate::handlers::{Decision, IntervalContext as Ctx};

    struct AlwaysPropagateAboveMinOcc;
    impl IntervalHandler for AlwaysPropagateAboveMinOcc {
        fn classify(&mut self, ctx: &Ctx<'_>) -> Decision {
            let size = ctx.child_counts_a.len();
            let mut d = Decision::none(size);
            for s in 0..size {
                d.propagate_a[s] = ctx.child_counts_a[s] >= ctx.min_occ;
            }
            d
        }
    }

    fn build_for(reads: Vec<&[u8]>) -> (BuildOutput, tempfile::TempDir) {
        let alphabet = Alphabet::DNA5;
        let tmp = tempfile::tempdir().unwrap();
        let mut source = SliceCycleSource::new(reads.into_iter().map(|r| r.to_vec()).collect()).unwrap();
        let cfg = EngineConfig::new(Codec::Ascii, tmp.path());
        let ctx = EngineContext::new(alphabet, cfg).unwrap();
        let out = build(&mut source, &ctx, tmp.path()).unwrap();
        (out, tmp)
    }

    #[test]
    fn single_collection_search_terminates_without_panicking() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"ACGA", b"ACGT"]);
        let alphabet = Alphabet::DNA5;
        let mut tracker = TwoBwtBackTracker::new(&out, None, alphabet, 2, false);
        let mut handler = AlwaysPropagateAboveMinOcc;
        let findings = tracker.run(&mut handler, 4).unwrap();
        assert!(findings.is_empty()); // this handler never reports discoveries
    }

    #[test]
    fn two_collection_search_tracks_b_coordinates() {
        let (out_a, _tmp_a) = build_for(vec![b"ACGT", b"ACGA"]);
        let (out_b, _tmp_b) = build_for(vec![b"ACGT", b"TGCA"]);
        let alphabet = Alphabet::DNA5;
        let mut tracker = TwoBwtBackTracker::new(&out_a, Some(&out_b), alphabet, 1, false);
        let mut handler = AlwaysPropagateAboveMinOcc;
        // Just exercising that the two-sided sweep doesn't error; the
        // handler above ignores B entirely so branches with and without
        // b coordinates are both visited without panicking.
        tracker.run(&mut handler, 4).unwrap();
    }
}
