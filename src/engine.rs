//! The BCR cycle engine (spec §4.6): builds the multi-string BWT of a
//! read collection one character column at a time, back to front.
//!
//! A pile's existing content keeps its relative order forever once
//! written — a pile is only ever appended to, never rewritten in place —
//! but a new cycle's insertions do not simply land after that content:
//! each read's next character is spliced in at the rank its (one
//! character longer) suffix actually occupies among the pile's existing
//! entries. That rank is computed without ever comparing suffixes
//! directly, using the standard backward-construction trick: a suffix
//! newly routed into pile `p_dst` from old pile `p_src` sorts, among
//! `p_dst`'s other entries, exactly where entries historically routed
//! from `p_src` sort. So counting, per destination pile, how many
//! entries have ever arrived from each source pile (`already_in_pile`,
//! persistent across cycles) plus how many of this cycle's own
//! insertions from the same source pile precede it (`counted_this_iter`,
//! reset every cycle) gives the exact position. `dollars` is the
//! one-time count of bootstrap terminators landing in each pile, the
//! base every other count is added to. See DESIGN.md for the derivation
//! and a worked example.
//!
//! Concurrency follows Design Notes §9 / spec §5: a pile's write cursor
//! after this cycle depends on every earlier-in-sort-order triple that
//! targeted it, so the whole cycle runs as one sequential pass — every
//! pile's old reader and new writer are opened once, up front, and
//! source piles are walked in alphabet order, splicing each cycle's
//! insertions into the right destination stream as its rank becomes
//! known and draining whatever's left of every pile once no more
//! insertions target it.

use crate::alphabet::Alphabet;
use crate::codec::{BwtReader, BwtWriter, PartialBwtReader, PartialBwtWriter};
use crate::config::Codec;
use crate::context::EngineContext;
use crate::counts::LetterCountTable;
use crate::cycle_source::CycleSource;
use crate::error::{EngineError, Result};
use crate::pile::{SideStreamReader, SideStreamWriter};
use crate::pileset::PileSet;
use crate::triples::{InsertionTripleStore, Triple};
use dsi_progress_logger::*;
use log::debug;
use std::path::{Path, PathBuf};

/// One generation's complete construction output.
pub struct BuildOutput {
    pub run_dir: PathBuf,
    pub generation: String,
    pub pileset: PileSet,
    pub counts: LetterCountTable,
    /// Final `(pileN, posN, seqN)` per read: where each read's longest
    /// tracked suffix ended up. Used by inversion (spec §4.7) to recover
    /// each read's `$`-position in pile 0.
    pub triples: InsertionTripleStore,
    pub read_count: usize,
    pub read_len: usize,
}

/// Build the BWT of `source`'s collection under `ctx`, using `run_dir` for
/// per-cycle on-disk piles. Intermediate generations are deleted as soon
/// as the next one is known to be complete; only the final generation and
/// the bootstrap's pile 0 survive.
pub fn build(source: &mut dyn CycleSource, ctx: &EngineContext, run_dir: &Path) -> Result<BuildOutput> {
    std::fs::create_dir_all(run_dir).map_err(|e| EngineError::io(0, 0, 0, e))?;

    let alphabet = *ctx.alphabet();
    let codec = ctx.config().codec;
    let n = source.read_count();
    let m = source.read_len();

    let mut pl = ProgressLogger::default();
    pl.item_name("cycle");
    pl.start(format!("building BWT of {n} reads of length {m}"));

    let emit_quality = ctx.config().emit_quality;
    let (mut pileset, mut sizes, mut counts, mut triples) = bootstrap(source, &alphabet, codec, run_dir, emit_quality)?;
    // The number of bootstrap terminators landing in each pile never
    // changes again; every later cycle's insertion positions are counted
    // relative to it (spec §4.6 `dollars`).
    let dollars = sizes.clone();
    let mut already_in_pile: Vec<Vec<u64>> = vec![vec![0u64; alphabet.len()]; alphabet.len()];
    let mut generation = "gen000".to_string();
    pl.update_and_display();

    // Spec §4.6 numbers this loop "Cycle j ∈ 2..m" using closed-interval
    // notation, i.e. inclusive of `m`: cycle `m` inserts the suffix that
    // starts at a read's own first character (its longest suffix), and
    // skipping it would make every read's leading characters
    // unrecoverable during inversion (spec §8 property 5).
    for j in 2..=m {
        let next_gen = format!("gen{j:03}");
        let step = cycle_step(
            j,
            &pileset,
            &sizes,
            &mut triples,
            &dollars,
            &mut already_in_pile,
            &alphabet,
            codec,
            source,
            run_dir,
            &next_gen,
            emit_quality,
        )?;
        cleanup_generation(run_dir, &generation, alphabet.len());
        pileset = step.pileset;
        sizes = step.sizes;
        counts = step.counts;
        generation = next_gen;

        if ctx.config().verify_invariants {
            verify_cycle_invariants(j, n, &sizes, &counts)?;
        }
        debug!("cycle {j}/{m} done, pile sizes = {sizes:?}");
        pl.update_and_display();
    }
    pl.done();

    Ok(BuildOutput {
        run_dir: run_dir.to_path_buf(),
        generation,
        pileset,
        counts,
        triples,
        read_count: n,
        read_len: m,
    })
}

struct CycleStep {
    pileset: PileSet,
    sizes: Vec<u64>,
    counts: LetterCountTable,
}

/// Cycle 0 (spec §4.6 "bootstrap"): for every read, in original order,
/// write its terminator's preceding character into pile 0 at position
/// `r` (ties among pile 0's entries are meaningless — they all share the
/// single-character suffix `$` — so sequence order doubles as the seqN
/// tie-break spec §3 calls for), then park the read's second-to-last
/// character in its terminator's pile and record the triple that will
/// drive its growth from here on.
fn bootstrap(
    source: &mut dyn CycleSource,
    alphabet: &Alphabet,
    codec: Codec,
    run_dir: &Path,
    emit_quality: bool,
) -> Result<(PileSet, Vec<u64>, LetterCountTable, InsertionTripleStore)> {
    let size = alphabet.len();
    let n = source.read_count();

    let last = source
        .next_batch(1)?
        .ok_or_else(|| EngineError::invariant(0, "cycle source yielded no batch for cycle 1"))?;
    let last_symbols: Vec<u8> = last.symbols.to_vec();
    let last_qualities: Option<Vec<u8>> = last.qualities.map(|q| q.to_vec());
    let next = source.next_batch(2)?;
    let penultimate_symbols: Option<Vec<u8>> = next.as_ref().map(|b| b.symbols.to_vec());
    let penultimate_qualities: Option<Vec<u8>> = next.as_ref().and_then(|b| b.qualities).map(|q| q.to_vec());

    let pileset = PileSet::new(run_dir, "gen000", size, codec);
    pileset.create_empty()?;

    let mut counts = LetterCountTable::new(size);
    let mut sizes = vec![0u64; size];
    let mut writers: Vec<BwtWriter> = (0..size as u8)
        .map(|p| pileset.open_bwt_writer(p, *alphabet, 0))
        .collect::<Result<_>>()?;
    let mut seq_id_writers: Vec<_> = (0..size as u8)
        .map(|p| pileset.open_seq_ids_writer(p))
        .collect::<Result<_>>()?;
    let mut quality_writers: Option<Vec<_>> = if emit_quality {
        Some((0..size as u8).map(|p| pileset.open_quality_writer(p)).collect::<Result<_>>()?)
    } else {
        None
    };

    let mut triples = InsertionTripleStore::with_capacity(n);
    for r in 0..n {
        let term_value = last_symbols[r];
        writers[0].write(&[term_value])?;
        counts.add(0, alphabet.index_of(term_value) as usize, 1);
        sizes[0] += 1;
        seq_id_writers[0].write_u64(r as u64)?;
        if let Some(qw) = quality_writers.as_mut() {
            let q = last_qualities.as_ref().map_or(0, |qs| qs[r]);
            qw[0].write(&[q])?;
        }

        let pile_r = alphabet.index_of(term_value);
        let pos_in_pile = sizes[pile_r as usize];
        let second_value = penultimate_symbols.as_ref().map_or(b'$', |s| s[r]);
        writers[pile_r as usize].write(&[second_value])?;
        counts.add(pile_r as usize, alphabet.index_of(second_value) as usize, 1);
        sizes[pile_r as usize] += 1;
        seq_id_writers[pile_r as usize].write_u64(r as u64)?;
        if let Some(qw) = quality_writers.as_mut() {
            let q = penultimate_qualities.as_ref().map_or(0, |qs| qs[r]);
            qw[pile_r as usize].write(&[q])?;
        }

        triples.push(Triple::new(pile_r, pos_in_pile, r as u64));
    }

    for w in writers {
        w.finish()?;
    }
    for w in seq_id_writers {
        w.finish()?;
    }
    if let Some(qws) = quality_writers {
        for w in qws {
            w.finish()?;
        }
    }
    // `sizes[pile_r]` above double-counts pile 0's own contribution only
    // when `pile_r == 0`, i.e. a read whose last two characters are both
    // `$` — excluded by construction (reads never contain `$`), so pile 0
    // accumulates exactly its own `n` writes and nothing from the second
    // write.
    debug_assert_eq!(sizes[0], n as u64);

    Ok((pileset, sizes, counts, triples))
}

/// One cycle `j` (spec §4.6): every pile's old content is carried forward
/// in order, and this cycle's `n` new characters are spliced into the
/// destination streams at the rank their triples route to.
#[allow(clippy::too_many_arguments)]
fn cycle_step(
    j: usize,
    prev: &PileSet,
    prev_sizes: &[u64],
    triples: &mut InsertionTripleStore,
    dollars: &[u64],
    already_in_pile: &mut [Vec<u64>],
    alphabet: &Alphabet,
    codec: Codec,
    source: &mut dyn CycleSource,
    run_dir: &Path,
    next_gen: &str,
    emit_quality: bool,
) -> Result<CycleStep> {
    let size = alphabet.len();

    // The routing character (this cycle's new column) and the value that
    // gets physically written (next cycle's column, or `$` once a read's
    // full length has been consumed) are one cycle apart, per spec §4.6
    // step 4's closing bullet.
    let routing = source
        .next_batch(j)?
        .ok_or_else(|| EngineError::invariant(j, format!("cycle source exhausted before cycle {j}")))?;
    let routing_symbols: Vec<u8> = routing.symbols.to_vec();
    let emit_batch = source.next_batch(j + 1)?;
    let emit_symbols: Option<Vec<u8>> = emit_batch.as_ref().map(|b| b.symbols.to_vec());
    let emit_qualities: Option<Vec<u8>> = emit_batch.as_ref().and_then(|b| b.qualities).map(|q| q.to_vec());

    let next_pileset = PileSet::new(run_dir, next_gen, size, codec);
    next_pileset.create_empty()?;

    triples.sort();
    let groups: Vec<Vec<Triple>> = triples
        .grouped_by_pile(size)
        .into_iter()
        .map(|g| g.to_vec())
        .collect();

    let mut readers: Vec<Option<BwtReader>> = (0..size as u8)
        .map(|p| {
            if prev_sizes[p as usize] > 0 {
                Ok(Some(prev.open_bwt_reader(p, *alphabet, j)?))
            } else {
                Ok(None)
            }
        })
        .collect::<Result<_>>()?;
    let mut writers: Vec<BwtWriter> = (0..size as u8)
        .map(|p| next_pileset.open_bwt_writer(p, *alphabet, j))
        .collect::<Result<_>>()?;
    let mut quality_readers: Option<Vec<Option<SideStreamReader>>> = if emit_quality {
        Some(
            (0..size as u8)
                .map(|p| {
                    if prev_sizes[p as usize] > 0 {
                        Ok(Some(prev.open_quality_reader(p)?))
                    } else {
                        Ok(None)
                    }
                })
                .collect::<Result<_>>()?,
        )
    } else {
        None
    };
    let mut quality_writers: Option<Vec<SideStreamWriter>> = if emit_quality {
        Some(
            (0..size as u8)
                .map(|p| next_pileset.open_quality_writer(p))
                .collect::<Result<_>>()?,
        )
    } else {
        None
    };

    let mut counts = LetterCountTable::new(size);
    let mut written_so_far = vec![0u64; size];
    let mut new_triples: Vec<Triple> = Vec::with_capacity(triples.len());

    // Source piles in alphabet order, skipping `$` (spec §4.6 step 3):
    // pile 0 is never routed into and never routes out, so it is only
    // ever drained unchanged below.
    for p_src in 1..size as u8 {
        let mut counted_this_iter = vec![0u64; size];
        for t in &groups[p_src as usize] {
            let seq = t.seq_n as usize;
            let c_new = routing_symbols[seq];
            let p_dst = alphabet.index_of(c_new);
            if p_dst == crate::alphabet::NOT_IN_ALPHABET || p_dst == 0 {
                return Err(EngineError::format(
                    j,
                    p_src as usize,
                    format!("routing character {c_new:?} is not a valid non-terminator symbol"),
                ));
            }
            let emit = emit_symbols.as_ref().map_or(b'$', |s| s[seq]);

            // Spec §4.6 step 4's position formula: a suffix sourced from
            // `p_src` sorts, within `p_dst`, after everything historically
            // sourced from a smaller pile, and after this cycle's earlier
            // `p_src`-sourced arrivals into the same `p_dst`.
            let sum_already: u64 = already_in_pile[..p_src as usize].iter().map(|row| row[p_dst as usize]).sum();
            let pos_in_pile = dollars[p_dst as usize] + sum_already + counted_this_iter[p_dst as usize];

            let catch_up = pos_in_pile.checked_sub(written_so_far[p_dst as usize]).ok_or_else(|| {
                EngineError::invariant(
                    j,
                    format!(
                        "pile {p_dst} insertion position {pos_in_pile} is behind its write cursor {}",
                        written_so_far[p_dst as usize]
                    ),
                )
            })?;
            if catch_up > 0 {
                copy_old_symbols(
                    &mut readers[p_dst as usize],
                    &mut writers[p_dst as usize],
                    quality_readers.as_mut().and_then(|qrs| qrs[p_dst as usize].as_mut()),
                    quality_writers.as_mut().map(|qws| &mut qws[p_dst as usize]),
                    catch_up,
                    alphabet,
                    &mut counts,
                    p_dst as usize,
                    j,
                )?;
            }

            writers[p_dst as usize].write(&[emit])?;
            counts.add(p_dst as usize, alphabet.index_of(emit) as usize, 1);
            if let Some(qws) = quality_writers.as_mut() {
                let q = emit_qualities.as_ref().map_or(0, |qs| qs[seq]);
                qws[p_dst as usize].write(&[q])?;
            }
            written_so_far[p_dst as usize] = pos_in_pile + 1;
            counted_this_iter[p_dst as usize] += 1;

            new_triples.push(Triple::new(p_dst, pos_in_pile, t.seq_n));
        }
        // Merge this source pile's contributions so later source piles
        // (this cycle) and every cycle after this one see them.
        for (p_dst, &count) in counted_this_iter.iter().enumerate() {
            already_in_pile[p_src as usize][p_dst] += count;
        }
    }

    // Drain: nothing further targets the remainder of any pile this
    // cycle, so whatever the insertion pass didn't already catch up to
    // carries forward unchanged.
    for p in 0..size {
        let remaining = prev_sizes[p] - written_so_far[p];
        if remaining > 0 {
            copy_old_symbols(
                &mut readers[p],
                &mut writers[p],
                quality_readers.as_mut().and_then(|qrs| qrs[p].as_mut()),
                quality_writers.as_mut().map(|qws| &mut qws[p]),
                remaining,
                alphabet,
                &mut counts,
                p,
                j,
            )?;
            written_so_far[p] += remaining;
        }
    }

    for w in writers {
        w.finish()?;
    }
    if let Some(qws) = quality_writers {
        for w in qws {
            w.finish()?;
        }
    }

    triples.replace_all(new_triples);

    Ok(CycleStep {
        pileset: next_pileset,
        sizes: written_so_far,
        counts,
    })
}

const COPY_CHUNK: usize = 1 << 16;

/// Carry `count` symbols of a pile's old BWT (and, if tracked, quality)
/// segment forward into its new generation unchanged, tallying each
/// copied symbol into `counts` along the way.
#[allow(clippy::too_many_arguments)]
fn copy_old_symbols(
    reader: &mut Option<BwtReader>,
    writer: &mut BwtWriter,
    mut qreader: Option<&mut SideStreamReader>,
    mut qwriter: Option<&mut SideStreamWriter>,
    count: u64,
    alphabet: &Alphabet,
    counts: &mut LetterCountTable,
    pile: usize,
    cycle: usize,
) -> Result<()> {
    let reader = reader
        .as_mut()
        .ok_or_else(|| EngineError::invariant(cycle, format!("pile {pile} has no old content left to carry forward")))?;
    let mut remaining = count as usize;
    let mut buf = vec![0u8; COPY_CHUNK.min(remaining).max(1)];
    let mut qbuf = vec![0u8; buf.len()];
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let got = reader.read_bytes(&mut buf, want)?;
        if got == 0 {
            return Err(EngineError::invariant(
                cycle,
                format!("pile {pile} ended {remaining} symbols short of its recorded size"),
            ));
        }
        writer.write(&buf[..got])?;
        for &b in &buf[..got] {
            counts.add(pile, alphabet.index_of(b) as usize, 1);
        }
        if let (Some(qr), Some(qw)) = (qreader.as_mut(), qwriter.as_mut()) {
            let qgot = qr.read_up_to(&mut qbuf[..got])?;
            if qgot != got {
                return Err(EngineError::invariant(
                    cycle,
                    format!("pile {pile}'s quality stream ended short of its BWT segment"),
                ));
            }
            qw.write(&qbuf[..got])?;
        }
        remaining -= got;
    }
    Ok(())
}

fn cleanup_generation(run_dir: &Path, generation: &str, alphabet_size: usize) {
    for p in 0..alphabet_size as u8 {
        let paths = crate::pile::PilePaths::new(run_dir, generation, p);
        let _ = std::fs::remove_file(&paths.bwt);
        let _ = std::fs::remove_file(&paths.tails);
        let _ = std::fs::remove_file(&paths.seq_ids);
        let _ = std::fs::remove_file(&paths.quality);
    }
}

/// Spec §8 properties 2-4, re-checked at every cycle boundary when
/// [`crate::config::EngineConfig::verify_invariants`] is set.
fn verify_cycle_invariants(j: usize, n: usize, sizes: &[u64], counts: &LetterCountTable) -> Result<()> {
    if sizes[0] != n as u64 {
        return Err(EngineError::invariant(
            j,
            format!("pile 0 has length {} but should stay fixed at n={n}", sizes[0]),
        ));
    }
    for (p, &len) in sizes.iter().enumerate() {
        let row_sum = counts.pile_len(p);
        if row_sum != len {
            return Err(EngineError::invariant(
                j,
                format!("pile {p} size {len} disagrees with its letter-count row sum {row_sum}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::cycle_source::SliceCycleSource;

    const DNA: Alphabet = Alphabet::DNA5;

    fn build_for(reads: Vec<&[u8]>) -> (BuildOutput, tempfile::TempDir) {
        let mut source = SliceCycleSource::new(reads.into_iter().map(|r| r.to_vec()).collect()).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let cfg = EngineConfig::new(Codec::Ascii, tmp.path());
        let ctx = EngineContext::new(DNA, cfg).unwrap();
        let out = build(&mut source, &ctx, tmp.path()).unwrap();
        (out, tmp)
    }

    /// Scenario S2 (spec §8): a single read, cycle `m`'s full BWT is
    /// trivially the read itself rotated once, terminated by `$`.
    fn read_bwt_pile(out: &BuildOutput, alphabet: &Alphabet, pile: u8) -> Vec<u8> {
        let len = out.counts.pile_len(pile as usize) as usize;
        let mut reader = out.pileset.open_bwt_reader(pile, *alphabet, 0).unwrap();
        let mut buf = vec![0u8; len];
        let got = reader.read_bytes(&mut buf, len).unwrap();
        assert_eq!(got, len);
        buf
    }

    #[test]
    fn s2_single_read_total_symbol_conservation() {
        let (out, _tmp) = build_for(vec![b"AAAA"]);
        // n=1, m=4: total symbols across all piles must equal n*(m+1).
        let total: u64 = (0..DNA.len()).map(|p| out.counts.pile_len(p)).sum();
        assert_eq!(total, 1 * 5);
    }

    #[test]
    fn pile0_holds_each_reads_last_character_in_sequence_order() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"ACGT", b"ACGA"]);
        let pile0 = read_bwt_pile(&out, &DNA, 0);
        assert_eq!(pile0, b"TTA");
    }

    #[test]
    fn total_symbol_count_matches_n_times_m_plus_one() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"ACGT", b"ACGA"]);
        let total: u64 = (0..DNA.len()).map(|p| out.counts.pile_len(p)).sum();
        assert_eq!(total, 3 * 5);
        assert_eq!(out.triples.len(), 3);
    }

    #[test]
    fn quality_stream_tracks_the_same_rows_as_the_bwt() {
        let mut source = SliceCycleSource::with_qualities(vec![b"AAAA".to_vec()], Some(vec![b"1234".to_vec()])).unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = EngineConfig::new(Codec::Ascii, tmp.path());
        cfg.emit_quality = true;
        let ctx = EngineContext::new(DNA, cfg).unwrap();
        let out = build(&mut source, &ctx, tmp.path()).unwrap();

        let pile0_bwt = read_bwt_pile(&out, &DNA, 0);
        assert_eq!(pile0_bwt, b"A");
        let mut q0 = out.pileset.open_quality_reader(0).unwrap();
        let mut q0_buf = [0u8; 1];
        assert_eq!(q0.read_up_to(&mut q0_buf).unwrap(), 1);
        assert_eq!(&q0_buf, b"4");

        let pile_a = DNA.index_of(b'A');
        let bwt = read_bwt_pile(&out, &DNA, pile_a);
        assert_eq!(bwt, b"AAA$");
        let mut qa = out.pileset.open_quality_reader(pile_a).unwrap();
        let mut qa_buf = [0u8; 4];
        assert_eq!(qa.read_up_to(&mut qa_buf).unwrap(), 4);
        assert_eq!(qa_buf, *b"321\0");
    }

    #[test]
    fn letter_count_rows_match_actual_pile_lengths() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"TGCA"]);
        for p in 0..DNA.len() {
            let on_disk = read_bwt_pile(&out, &DNA, p as u8).len() as u64;
            assert_eq!(on_disk, out.counts.pile_len(p));
        }
    }

    /// Two reads with no shared prefix: under the buggy tail-append
    /// insertion this engine used to produce, both piles landed in the
    /// wrong order. `"CAT$"` sorts before `"CG$A"` (A < G) and `"ACG$"`
    /// sorts before `"AT$C"` (C < T), so `$` must lead both piles A and C.
    #[test]
    fn diverse_reads_place_insertions_at_the_correct_rank_not_the_tail() {
        let (out, _tmp) = build_for(vec![b"ACG", b"CAT"]);

        let pile_a = DNA.index_of(b'A');
        let pile_c = DNA.index_of(b'C');
        assert_eq!(read_bwt_pile(&out, &DNA, pile_a), b"$C");
        assert_eq!(read_bwt_pile(&out, &DNA, pile_c), b"$A");

        let pile_g = DNA.index_of(b'G');
        let pile_t = DNA.index_of(b'T');
        assert_eq!(read_bwt_pile(&out, &DNA, pile_g), b"C");
        assert_eq!(read_bwt_pile(&out, &DNA, pile_t), b"A");
    }
}
