//! `CycleSource` (spec §4.4): supplies, for each cycle, the new symbol
//! (and optional quality) for every read, in original read order.
//!
//! Input-format adapters (FASTA/FASTQ/BCL/cyc) are out of scope (spec
//! §1) and live outside this crate; [`SliceCycleSource`] is the one
//! concrete adapter this crate ships, wrapping an in-memory collection so
//! the engine is independently testable.

use crate::error::{EngineError, Result};

/// One cycle's worth of new symbols, in original read order.
pub struct CycleBatch<'a> {
    pub symbols: &'a [u8],
    pub qualities: Option<&'a [u8]>,
}

pub trait CycleSource {
    /// Number of reads in the collection.
    fn read_count(&self) -> usize;

    /// Fixed read length `m`.
    fn read_len(&self) -> usize;

    /// Yield cycle `j`'s batch (1-indexed, matching spec §4.6: cycle `j`
    /// supplies the character at position `m - j` of each read).
    /// Returns `Ok(None)` once `j > m` (the explicit "done" signal).
    fn next_batch(&mut self, j: usize) -> Result<Option<CycleBatch<'_>>>;
}

/// An in-memory `CycleSource` over a collection of equal-length reads,
/// with an optional parallel collection of equal-length quality strings.
pub struct SliceCycleSource {
    reads: Vec<Vec<u8>>,
    qualities: Option<Vec<Vec<u8>>>,
    read_len: usize,
    scratch: Vec<u8>,
    quality_scratch: Vec<u8>,
}

impl SliceCycleSource {
    pub fn new(reads: Vec<Vec<u8>>) -> Result<Self> {
        Self::with_qualities(reads, None)
    }

    /// Like [`Self::new`], but also supplies a quality byte per read per
    /// cycle (spec §4.4's optional `newQuality_r_j`). Each quality string
    /// must be the same length as its read.
    pub fn with_qualities(reads: Vec<Vec<u8>>, qualities: Option<Vec<Vec<u8>>>) -> Result<Self> {
        let read_len = reads.first().map_or(0, |r| r.len());
        for (i, r) in reads.iter().enumerate() {
            if r.len() != read_len {
                return Err(EngineError::format(
                    0,
                    0,
                    format!("read {i} has length {}, expected {read_len} (reads must be pre-padded)", r.len()),
                ));
            }
        }
        if let Some(qs) = &qualities {
            if qs.len() != reads.len() {
                return Err(EngineError::format(0, 0, format!("{} quality strings but {} reads", qs.len(), reads.len())));
            }
            for (i, q) in qs.iter().enumerate() {
                if q.len() != read_len {
                    return Err(EngineError::format(
                        0,
                        0,
                        format!("quality string {i} has length {}, expected {read_len}", q.len()),
                    ));
                }
            }
        }
        Ok(SliceCycleSource {
            reads,
            qualities,
            read_len,
            scratch: vec![0u8; 0],
            quality_scratch: vec![0u8; 0],
        })
    }

    pub fn read(&self, seq_n: u64) -> &[u8] {
        &self.reads[seq_n as usize]
    }
}

impl CycleSource for SliceCycleSource {
    fn read_count(&self) -> usize {
        self.reads.len()
    }

    fn read_len(&self) -> usize {
        self.read_len
    }

    fn next_batch(&mut self, j: usize) -> Result<Option<CycleBatch<'_>>> {
        if j == 0 || j > self.read_len {
            return Ok(None);
        }
        let pos = self.read_len - j;
        self.scratch.clear();
        self.scratch.reserve(self.reads.len());
        for r in &self.reads {
            self.scratch.push(r[pos]);
        }
        let qualities = if let Some(qs) = &self.qualities {
            self.quality_scratch.clear();
            self.quality_scratch.reserve(qs.len());
            for q in qs {
                self.quality_scratch.push(q[pos]);
            }
            Some(self.quality_scratch.as_slice())
        } else {
            None
        };
        Ok(Some(CycleBatch {
            symbols: &self.scratch,
            qualities,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_characters_back_to_front() {
        let mut src = SliceCycleSource::new(vec![b"ACGT".to_vec(), b"TTTT".to_vec()]).unwrap();
        let b1 = src.next_batch(1).unwrap().unwrap();
        assert_eq!(b1.symbols, b"TT"); // position m-1 = 3
        let b4 = src.next_batch(4).unwrap().unwrap();
        assert_eq!(b4.symbols, b"AT"); // position m-4 = 0
        assert!(src.next_batch(5).unwrap().is_none());
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = SliceCycleSource::new(vec![b"ACGT".to_vec(), b"AC".to_vec()]);
        assert!(err.is_err());
    }

    #[test]
    fn qualities_track_the_same_cyclic_position_as_symbols() {
        let mut src = SliceCycleSource::with_qualities(
            vec![b"ACGT".to_vec(), b"TTTT".to_vec()],
            Some(vec![b"!!!#".to_vec(), b"####".to_vec()]),
        )
        .unwrap();
        let b1 = src.next_batch(1).unwrap().unwrap();
        assert_eq!(b1.symbols, b"TT");
        assert_eq!(b1.qualities, Some(&b"##"[..]));
        let b4 = src.next_batch(4).unwrap().unwrap();
        assert_eq!(b4.symbols, b"AT");
        assert_eq!(b4.qualities, Some(&b"!#"[..]));
    }

    #[test]
    fn rejects_mismatched_quality_length() {
        let err = SliceCycleSource::with_qualities(vec![b"ACGT".to_vec()], Some(vec![b"!!".to_vec()]));
        assert!(err.is_err());
    }
}
