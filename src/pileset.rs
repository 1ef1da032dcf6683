//! Array of `|Σ|` piles for one generation (cycle) of the collection
//! (spec §3, §4.3).
//!
//! A `PileSet` never holds file handles across cycle boundaries: every
//! reader/writer is opened fresh for the duration of one cycle and closed
//! at the end of it (`finish_cycle`), so side streams and BWT segments
//! can be reopened next cycle with no lost data, matching the §4.3
//! guarantee.

use crate::alphabet::Alphabet;
use crate::codec::{BwtReader, BwtWriter};
use crate::config::Codec;
use crate::error::Result;
use crate::pile::{open_side_reader, open_side_writer, touch, PilePaths, SideStreamReader, SideStreamWriter};
use std::path::PathBuf;

pub struct PileSet {
    paths: Vec<PilePaths>,
    codec: Codec,
}

impl PileSet {
    /// `generation` names this cycle's on-disk files, e.g. `"cycle007"`.
    pub fn new(run_dir: &std::path::Path, generation: &str, alphabet_size: usize, codec: Codec) -> Self {
        let paths = (0..alphabet_size as u8)
            .map(|p| PilePaths::new(run_dir, generation, p))
            .collect();
        PileSet { paths, codec }
    }

    pub fn alphabet_size(&self) -> usize {
        self.paths.len()
    }

    pub fn pile_paths(&self, pile: u8) -> &PilePaths {
        &self.paths[pile as usize]
    }

    /// Create empty, truncated files for every pile (used once for the
    /// `$` pile before cycle 0, and as scaffolding before the first
    /// writer opens each file).
    pub fn create_empty(&self) -> Result<()> {
        for p in &self.paths {
            touch(&p.bwt)?;
            touch(&p.tails)?;
            touch(&p.seq_ids)?;
        }
        Ok(())
    }

    pub fn open_bwt_reader(&self, pile: u8, alphabet: Alphabet, cycle: usize) -> Result<BwtReader> {
        BwtReader::open(&self.paths[pile as usize].bwt, self.codec, alphabet, cycle, pile)
    }

    pub fn open_bwt_writer(&self, pile: u8, alphabet: Alphabet, cycle: usize) -> Result<BwtWriter> {
        BwtWriter::create(&self.paths[pile as usize].bwt, self.codec, alphabet, cycle, pile)
    }

    pub fn open_tails_writer(&self, pile: u8) -> Result<SideStreamWriter> {
        open_side_writer(&self.paths[pile as usize].tails)
    }

    pub fn open_tails_reader(&self, pile: u8) -> Result<SideStreamReader> {
        open_side_reader(&self.paths[pile as usize].tails)
    }

    pub fn open_seq_ids_writer(&self, pile: u8) -> Result<SideStreamWriter> {
        open_side_writer(&self.paths[pile as usize].seq_ids)
    }

    pub fn open_seq_ids_reader(&self, pile: u8) -> Result<SideStreamReader> {
        open_side_reader(&self.paths[pile as usize].seq_ids)
    }

    pub fn bwt_path(&self, pile: u8) -> PathBuf {
        self.paths[pile as usize].bwt.clone()
    }

    /// Opens `{prefix}-Q0{p}` for appending (spec §6), used only when
    /// [`crate::config::EngineConfig::emit_quality`] is set. Unlike the BWT
    /// segment this is plain, uncoded bytes, so the same
    /// `SideStreamWriter`/`Reader` pair used for `tails`/`seq_ids` applies
    /// here too.
    pub fn open_quality_writer(&self, pile: u8) -> Result<SideStreamWriter> {
        open_side_writer(&self.paths[pile as usize].quality)
    }

    pub fn open_quality_reader(&self, pile: u8) -> Result<SideStreamReader> {
        open_side_reader(&self.paths[pile as usize].quality)
    }

    pub fn quality_path(&self, pile: u8) -> PathBuf {
        self.paths[pile as usize].quality.clone()
    }

    /// Drop per-cycle side streams once they're no longer needed (after
    /// the final cycle, per §3 "Lifecycle").
    pub fn discard_side_streams(&self) -> Result<()> {
        for p in &self.paths {
            let _ = std::fs::remove_file(&p.tails);
            let _ = std::fs::remove_file(&p.seq_ids);
        }
        Ok(())
    }
}
