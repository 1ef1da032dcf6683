//! Partial BWT codecs (spec §4.2): readers and writers for per-pile BWT
//! segments, in ASCII, run-length (RLE-4/4), and an optional richer RLE
//! variant, behind one contract.
//!
//! The original's virtual polymorphic codec hierarchy becomes a sum type
//! (Design Notes §9): [`BwtReader`] / [`BwtWriter`] dispatch to one of a
//! fixed set of concrete codecs chosen once at pile-open time from
//! [`crate::config::Codec`].

mod ascii;
mod rle4;
#[cfg(feature = "rle_rich")]
mod rle_rich;

pub use ascii::{AsciiReader, AsciiWriter};
pub use rle4::{Rle4Reader, Rle4Writer};
#[cfg(feature = "rle_rich")]
pub use rle_rich::{Rle53Reader, Rle53Writer};

use crate::alphabet::Alphabet;
use crate::config::Codec;
use crate::error::{EngineError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read-side contract shared by every partial-BWT codec.
pub trait PartialBwtReader {
    /// Consume up to `n` symbols, adding each symbol's count into
    /// `counts[alphabet_index]`. Returns the number actually consumed;
    /// this is `< n` only at EOF.
    fn read_and_count(&mut self, counts: &mut [u64], n: usize) -> Result<usize>;

    /// Consume up to `n` symbols and append them to `writer`. Returns the
    /// number actually consumed.
    fn read_and_send(&mut self, writer: &mut BwtWriter, n: usize) -> Result<usize>;

    /// Materialise up to `n` raw symbols into `buf` (`buf.len() >= n`).
    /// Returns the number actually read.
    fn read_bytes(&mut self, buf: &mut [u8], n: usize) -> Result<usize>;

    /// Reposition at the start of the stream.
    fn rewind(&mut self) -> Result<()>;

    /// Current logical position (symbols consumed so far), not byte
    /// offset — callers needing a byte offset for diagnostics track it
    /// separately.
    fn tell(&self) -> u64;
}

/// Write-side contract shared by every partial-BWT codec. Writers are
/// additive: only `write`/`write_run` append, there is no in-place
/// mutation, so distinct writers may target distinct piles concurrently.
pub trait PartialBwtWriter {
    fn write(&mut self, symbols: &[u8]) -> Result<()>;
    fn write_run(&mut self, symbol: u8, run_len: usize) -> Result<()>;
}

/// Sum type over the readable partial-BWT codecs.
pub enum BwtReader {
    Ascii(AsciiReader<BufReader<File>>),
    Rle4(Rle4Reader<BufReader<File>>),
    #[cfg(feature = "rle_rich")]
    Rle53(Rle53Reader<BufReader<File>>),
}

/// Sum type over the writable partial-BWT codecs.
pub enum BwtWriter {
    Ascii(AsciiWriter<BufWriter<File>>),
    Rle4(Rle4Writer<BufWriter<File>>),
    #[cfg(feature = "rle_rich")]
    Rle53(Rle53Writer<BufWriter<File>>),
}

impl BwtReader {
    pub fn open(path: &Path, codec: Codec, alphabet: Alphabet, cycle: usize, pile: u8) -> Result<Self> {
        let file = File::open(path).map_err(|e| EngineError::io(cycle, pile as usize, 0, e))?;
        let buf = BufReader::new(file);
        Ok(match codec {
            Codec::Ascii => BwtReader::Ascii(AsciiReader::new(buf, alphabet)),
            Codec::Rle4_4 => BwtReader::Rle4(Rle4Reader::new(buf, alphabet)),
            #[cfg(feature = "rle_rich")]
            Codec::Rle5_3 => BwtReader::Rle53(Rle53Reader::new(buf, alphabet)),
        })
    }
}

impl PartialBwtReader for BwtReader {
    fn read_and_count(&mut self, counts: &mut [u64], n: usize) -> Result<usize> {
        match self {
            BwtReader::Ascii(r) => r.read_and_count(counts, n),
            BwtReader::Rle4(r) => r.read_and_count(counts, n),
            #[cfg(feature = "rle_rich")]
            BwtReader::Rle53(r) => r.read_and_count(counts, n),
        }
    }

    fn read_and_send(&mut self, writer: &mut BwtWriter, n: usize) -> Result<usize> {
        match self {
            BwtReader::Ascii(r) => r.read_and_send(writer, n),
            BwtReader::Rle4(r) => r.read_and_send(writer, n),
            #[cfg(feature = "rle_rich")]
            BwtReader::Rle53(r) => r.read_and_send(writer, n),
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8], n: usize) -> Result<usize> {
        match self {
            BwtReader::Ascii(r) => r.read_bytes(buf, n),
            BwtReader::Rle4(r) => r.read_bytes(buf, n),
            #[cfg(feature = "rle_rich")]
            BwtReader::Rle53(r) => r.read_bytes(buf, n),
        }
    }

    fn rewind(&mut self) -> Result<()> {
        match self {
            BwtReader::Ascii(r) => r.rewind(),
            BwtReader::Rle4(r) => r.rewind(),
            #[cfg(feature = "rle_rich")]
            BwtReader::Rle53(r) => r.rewind(),
        }
    }

    fn tell(&self) -> u64 {
        match self {
            BwtReader::Ascii(r) => r.tell(),
            BwtReader::Rle4(r) => r.tell(),
            #[cfg(feature = "rle_rich")]
            BwtReader::Rle53(r) => r.tell(),
        }
    }
}

impl BwtWriter {
    pub fn create(path: &Path, codec: Codec, alphabet: Alphabet, cycle: usize, pile: u8) -> Result<Self> {
        let file = File::create(path).map_err(|e| EngineError::io(cycle, pile as usize, 0, e))?;
        let buf = BufWriter::new(file);
        Ok(match codec {
            Codec::Ascii => BwtWriter::Ascii(AsciiWriter::new(buf, alphabet)),
            Codec::Rle4_4 => BwtWriter::Rle4(Rle4Writer::new(buf, alphabet)),
            #[cfg(feature = "rle_rich")]
            Codec::Rle5_3 => BwtWriter::Rle53(Rle53Writer::new(buf, alphabet)),
        })
    }

    /// Flush and drop the inner file handle, returning any I/O error.
    pub fn finish(self) -> Result<()> {
        match self {
            BwtWriter::Ascii(w) => w.finish(),
            BwtWriter::Rle4(w) => w.finish(),
            #[cfg(feature = "rle_rich")]
            BwtWriter::Rle53(w) => w.finish(),
        }
    }
}

impl PartialBwtWriter for BwtWriter {
    fn write(&mut self, symbols: &[u8]) -> Result<()> {
        match self {
            BwtWriter::Ascii(w) => w.write(symbols),
            BwtWriter::Rle4(w) => w.write(symbols),
            #[cfg(feature = "rle_rich")]
            BwtWriter::Rle53(w) => w.write(symbols),
        }
    }

    fn write_run(&mut self, symbol: u8, run_len: usize) -> Result<()> {
        match self {
            BwtWriter::Ascii(w) => w.write_run(symbol, run_len),
            BwtWriter::Rle4(w) => w.write_run(symbol, run_len),
            #[cfg(feature = "rle_rich")]
            BwtWriter::Rle53(w) => w.write_run(symbol, run_len),
        }
    }
}
