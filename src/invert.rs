//! Inversion (spec §4.7): recovering the original reads from a completed
//! multi-string BWT.
//!
//! Two strategies, grounded on the same generalised LF-mapping:
//!
//! - [`backward_reconstruct`]: one batched sweep per pile per step,
//!   covering every read at once. Each step groups the `n` active
//!   `(pile, pos)` cursors by pile, walks each pile's segment once in
//!   increasing `pos` order, and reads off both the symbol at each cursor
//!   and its rank in a single linear scan — no random access needed,
//!   mirroring the cycle engine's own copy-forward pass.
//! - [`forward_reconstruct_one`]: one read at a time, `m` point queries
//!   against a [`RankIndex`]. Costs more per read (`O(m * B)` instead of
//!   amortised `O(pile size)` across all reads) but needs no whole-pile
//!   pass, which is the right trade when only a handful of reads are
//!   wanted out of a large collection.
//!
//! Both emit characters from a read's last position back to its first and
//! reverse the result; both land on pile 0 via the `end-pos` mapping
//! (spec §6), which in this crate's construction happens to be the
//! identity (pile 0's rows are written in original read order — see
//! DESIGN.md) but is still read back through [`EndPosMap`] rather than
//! assumed, so the format stays honest about what it promises externally.

use crate::alphabet::Alphabet;
use crate::engine::BuildOutput;
use crate::error::{EngineError, Result};
use crate::rank_index::RankIndex;
use std::io::{Read, Write};
use std::path::Path;

/// `{prefix}-end-pos`: pile-0 row -> original sequence id (spec §6).
pub struct EndPosMap {
    /// `seq_of_row[i]` is the original sequence id of pile 0's row `i`.
    seq_of_row: Vec<u32>,
    has_rev_comp: bool,
    sub_sequence_count: u8,
}

impl EndPosMap {
    /// Build the identity mapping this crate's construction produces:
    /// pile 0's row `r` is read `r` (spec §4.6 bootstrap writes pile 0 in
    /// original sequence order).
    pub fn identity(n: usize) -> Self {
        EndPosMap {
            seq_of_row: (0..n as u32).collect(),
            has_rev_comp: false,
            sub_sequence_count: 1,
        }
    }

    pub fn seq_for_row(&self, row: u64) -> u32 {
        self.seq_of_row[row as usize]
    }

    pub fn len(&self) -> usize {
        self.seq_of_row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq_of_row.is_empty()
    }

    /// Write the frozen `end-pos` layout: 4-byte `n`, 1-byte
    /// `subSequenceCount`, 1-byte `hasRevComp`, then `n` records of
    /// 4-byte `seqN` + 1-byte `subSequenceNum` (spec §6).
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut f = std::fs::File::create(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        f.write_all(&(self.seq_of_row.len() as u32).to_le_bytes())
            .map_err(|e| EngineError::io(0, 0, 0, e))?;
        f.write_all(&[self.sub_sequence_count, self.has_rev_comp as u8])
            .map_err(|e| EngineError::io(0, 0, 0, e))?;
        for &seq_n in &self.seq_of_row {
            f.write_all(&seq_n.to_le_bytes()).map_err(|e| EngineError::io(0, 0, 0, e))?;
            f.write_all(&[0u8]).map_err(|e| EngineError::io(0, 0, 0, e))?; // subSequenceNum
        }
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let mut f = std::fs::File::open(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        let mut header = [0u8; 6];
        f.read_exact(&mut header).map_err(|e| EngineError::io(0, 0, 0, e))?;
        let n = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let sub_sequence_count = header[4];
        let has_rev_comp = header[5] != 0;
        let mut seq_of_row = Vec::with_capacity(n);
        let mut record = [0u8; 5];
        for _ in 0..n {
            f.read_exact(&mut record).map_err(|e| EngineError::io(0, 0, 0, e))?;
            seq_of_row.push(u32::from_le_bytes([record[0], record[1], record[2], record[3]]));
        }
        Ok(EndPosMap {
            seq_of_row,
            has_rev_comp,
            sub_sequence_count,
        })
    }
}

/// Reconstruct every read, in original sequence order, via one batched
/// LF sweep per cycle. `end_pos` translates pile-0 rows back to sequence
/// ids at the very end, so this function never assumes pile 0's internal
/// order is any particular thing.
pub fn backward_reconstruct(out: &BuildOutput, alphabet: &Alphabet, end_pos: &EndPosMap) -> Result<Vec<Vec<u8>>> {
    let size = alphabet.len();
    let n = out.read_count;
    let m = out.read_len;
    let occ_before = out.counts.occ_before_pile();

    // `positions[row]` tracks pile-0 row `row`'s current cursor as it
    // walks backward through the BWT.
    let mut positions: Vec<(u8, u64)> = (0..n as u64).map(|row| (0u8, row)).collect();
    let mut collected: Vec<Vec<u8>> = vec![Vec::with_capacity(m); n];

    for _ in 0..m {
        let mut by_pile: Vec<Vec<(u64, usize)>> = vec![Vec::new(); size];
        for (row, &(pile, pos)) in positions.iter().enumerate() {
            by_pile[pile as usize].push((pos, row));
        }
        for group in &mut by_pile {
            group.sort_unstable_by_key(|&(pos, _)| pos);
        }

        let mut next_positions = positions.clone();
        for p in 0..size as u8 {
            let group = &by_pile[p as usize];
            if group.is_empty() {
                continue;
            }
            let mut reader = out.pileset.open_bwt_reader(p, *alphabet, out.read_count)?;
            let mut running = vec![0u64; size];
            let mut cursor = 0u64;
            for &(pos, row) in group {
                let gap = pos - cursor;
                if gap > 0 {
                    let mut discard = vec![0u64; size];
                    reader.read_and_count(&mut discard, gap as usize)?;
                    for s in 0..size {
                        running[s] += discard[s];
                    }
                    cursor += gap;
                }
                let mut one = vec![0u64; size];
                reader.read_and_count(&mut one, 1)?;
                cursor += 1;
                let symbol_idx = one
                    .iter()
                    .position(|&c| c == 1)
                    .ok_or_else(|| EngineError::invariant(0, format!("pile {p} position {pos} decoded to no symbol")))?
                    as u8;

                collected[row].push(alphabet.symbol_at(symbol_idx));
                let rank_before = running[symbol_idx as usize];
                let new_pos = occ_before[p as usize][symbol_idx as usize] + rank_before;
                next_positions[row] = (symbol_idx, new_pos);
                running[symbol_idx as usize] += 1;
            }
        }
        positions = next_positions;
    }

    for read in &mut collected {
        read.reverse();
    }

    // `collected[row]` is keyed by pile-0 row; translate through end_pos
    // to land on original sequence ids.
    let mut by_seq = vec![Vec::new(); n];
    for (row, read) in collected.into_iter().enumerate() {
        let seq_n = end_pos.seq_for_row(row as u64) as usize;
        by_seq[seq_n] = read;
    }
    Ok(by_seq)
}

/// Reconstruct a single read by sequence id, one LF point-query at a
/// time, using `rank_index` for the within-pile rank half of each step.
pub fn forward_reconstruct_one(out: &BuildOutput, alphabet: &Alphabet, rank_index: &RankIndex, end_pos: &EndPosMap, seq_n: u32) -> Result<Vec<u8>> {
    let size = alphabet.len();
    let occ_before = out.counts.occ_before_pile();

    let row = end_pos
        .seq_of_row
        .iter()
        .position(|&s| s == seq_n)
        .ok_or_else(|| EngineError::invariant(0, format!("sequence {seq_n} has no end-pos row")))? as u64;

    let mut pile = 0u8;
    let mut pos = row;
    let mut chars = Vec::with_capacity(out.read_len);
    for _ in 0..out.read_len {
        let c = rank_index.symbol_at(&out.pileset, alphabet, out.read_count, pile, pos)?;
        chars.push(c);
        let symbol_idx = alphabet.index_of(c);
        let rank_before = rank_index.rank(&out.pileset, alphabet, out.read_count, pile, symbol_idx, pos)?;
        pos = occ_before[pile as usize][symbol_idx as usize] + rank_before;
        pile = symbol_idx;
    }
    chars.reverse();
    Ok(chars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Codec, EngineConfig};
    use crate::context::EngineContext;
    use crate::cycle_source::SliceCycleSource;
    use crate::engine::build;

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
    fn backward_reconstruct_round_trips_s1() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"ACGT", b"ACGA"]);
        let end_pos = EndPosMap::identity(out.read_count);
        let reads = backward_reconstruct(&out, &Alphabet::DNA5, &end_pos).unwrap();
        assert_eq!(reads, vec![b"ACGT".to_vec(), b"ACGT".to_vec(), b"ACGA".to_vec()]);
    }

    /// Reads with no shared prefix, diverse enough that an insertion
    /// landing at the wrong rank within a pile (rather than the
    /// lexicographic rank its suffix actually occupies) changes which
    /// read comes back out.
    #[test]
    fn backward_reconstruct_round_trips_reads_with_no_shared_prefix() {
        let (out, _tmp) = build_for(vec![b"ACG", b"CAT"]);
        let end_pos = EndPosMap::identity(out.read_count);
        let reads = backward_reconstruct(&out, &Alphabet::DNA5, &end_pos).unwrap();
        assert_eq!(reads, vec![b"ACG".to_vec(), b"CAT".to_vec()]);
    }

    #[test]
    fn backward_reconstruct_round_trips_single_read() {
        let (out, _tmp) = build_for(vec![b"AAAA"]);
        let end_pos = EndPosMap::identity(out.read_count);
        let reads = backward_reconstruct(&out, &Alphabet::DNA5, &end_pos).unwrap();
        assert_eq!(reads, vec![b"AAAA".to_vec()]);
    }

    #[test]
    fn forward_reconstruct_one_matches_backward_reconstruct() {
        let (out, _tmp) = build_for(vec![b"ACGT", b"TGCA", b"AAAA"]);
        let alphabet = Alphabet::DNA5;
        let end_pos = EndPosMap::identity(out.read_count);
        let sizes: Vec<u64> = (0..alphabet.len()).map(|p| out.counts.pile_len(p)).collect();
        let rank_index = RankIndex::build(&out.pileset, &alphabet, &sizes, Codec::Ascii, 2, out.read_count).unwrap();

        let all = backward_reconstruct(&out, &alphabet, &end_pos).unwrap();
        for seq_n in 0..out.read_count as u32 {
            let one = forward_reconstruct_one(&out, &alphabet, &rank_index, &end_pos, seq_n).unwrap();
            assert_eq!(one, all[seq_n as usize]);
        }
    }

    #[test]
    fn end_pos_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let map = EndPosMap::identity(5);
        let path = tmp.path().join("end-pos");
        map.write(&path).unwrap();
        let back = EndPosMap::read(&path).unwrap();
        assert_eq!(back.len(), 5);
        for i in 0..5 {
            assert_eq!(back.seq_for_row(i), i as u32);
        }
    }
}
