//! A single pile (spec §3, §4.3): one alphabet bucket's BWT segment plus,
//! during construction, the side streams for reads currently parked
//! there.

use crate::config::{Codec, Filename};
use crate::error::{EngineError, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only raw byte side stream (tails or quality bytes parked for a
/// pile during one cycle). Never mutated in place, matching the codec
/// writer contract (spec §4.2).
pub struct SideStreamWriter {
    inner: BufWriter<File>,
}

impl SideStreamWriter {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        Ok(SideStreamWriter {
            inner: BufWriter::new(file),
        })
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(|e| EngineError::io(0, 0, 0, e))
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush().map_err(|e| EngineError::io(0, 0, 0, e))
    }
}

pub struct SideStreamReader {
    inner: BufReader<File>,
}

impl SideStreamReader {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        Ok(SideStreamReader {
            inner: BufReader::new(file),
        })
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| EngineError::io(0, 0, 0, e))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read up to `buf.len()` bytes, returning fewer only at EOF. Used for
    /// the raw, unencoded quality/LCP side streams, which have nothing to
    /// decode and so never need `BwtReader`'s codec dispatch.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf).map_err(|e| EngineError::io(0, 0, 0, e))
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| EngineError::io(0, 0, 0, e))?;
        Ok(())
    }
}

/// On-disk names for one pile's per-cycle files, rooted at `prefix`
/// (spec §6: `{prefix}-B0{p}`, plus volatile per-cycle side files).
#[derive(Clone)]
pub struct PilePaths {
    pub index: u8,
    pub bwt: PathBuf,
    pub tails: PathBuf,
    pub seq_ids: PathBuf,
    /// `{prefix}-Q0{p}`, spec §6 — one raw byte per BWT symbol. Only
    /// populated when [`crate::config::EngineConfig::emit_quality`] is set;
    /// the path is always computed (cheap) but the file itself is created
    /// lazily by the writer.
    pub quality: PathBuf,
    /// `{prefix}-L0{p}`, spec §6 — reserved for a 4-byte-per-symbol LCP
    /// stream. Not yet populated by the engine (see DESIGN.md).
    pub lcp: PathBuf,
}

impl PilePaths {
    pub fn new(run_dir: &Path, generation: &str, index: u8) -> Self {
        let prefix = run_dir.join(generation);
        PilePaths {
            index,
            bwt: Filename::pile(&prefix, "B", index),
            tails: Filename::plain(&prefix, &format!("tails{index:02}")),
            seq_ids: Filename::plain(&prefix, &format!("seqids{index:02}")),
            quality: Filename::pile(&prefix, "Q", index),
            lcp: Filename::pile(&prefix, "L", index),
        }
    }
}

pub(crate) fn open_side_writer(path: &Path) -> Result<SideStreamWriter> {
    SideStreamWriter::create(path)
}

pub(crate) fn open_side_reader(path: &Path) -> Result<SideStreamReader> {
    SideStreamReader::open(path)
}

/// Ensure a fresh, empty file exists at `path` (used for the `$` pile
/// before cycle 0, since it is only ever appended to then).
pub(crate) fn touch(path: &Path) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| EngineError::io(0, 0, 0, e))
}

/// Which codec a generation's BWT segments are stored in. Exposed so
/// `PileSet` can pass it through to `BwtReader`/`BwtWriter::open`.
pub type PileCodec = Codec;
