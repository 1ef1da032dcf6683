//! Richer RLE codec (5-bit count / 3-bit symbol), optional per Design
//! Notes §9 — the legacy metagenomics-database variant. Drop-in
//! compatible with the [`super::PartialBwtReader`] / [`super::PartialBwtWriter`]
//! contract; trades alphabet width (max 8 symbols, same as the frozen
//! layout) for longer single-byte runs (up to 32 instead of 16).

use super::{BwtWriter, PartialBwtReader, PartialBwtWriter};
use crate::alphabet::Alphabet;
use crate::error::{EngineError, Result};
use std::io::{Read, Seek, SeekFrom, Write};

const MAX_RUN: u32 = 32;

#[inline(always)]
fn pack(symbol_index: u8, run_len_minus1: u8) -> u8 {
    (run_len_minus1 << 3) | (symbol_index & 0x07)
}

#[inline(always)]
fn unpack(byte: u8) -> (u8, u8) {
    (byte & 0x07, byte >> 3)
}

pub struct Rle53Reader<R> {
    inner: R,
    alphabet: Alphabet,
    cur_symbol_index: u8,
    remaining: u32,
    pos: u64,
    byte_pos: u64,
}

impl<R: Read + Seek> Rle53Reader<R> {
    pub fn new(inner: R, alphabet: Alphabet) -> Self {
        Rle53Reader {
            inner,
            alphabet,
            cur_symbol_index: 0,
            remaining: 0,
            pos: 0,
            byte_pos: 0,
        }
    }

    fn refill(&mut self) -> Result<bool> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte) {
            Ok(0) => Ok(false),
            Ok(_) => {
                self.byte_pos += 1;
                let (idx, run_minus1) = unpack(byte[0]);
                if idx as usize >= self.alphabet.len() {
                    return Err(EngineError::format(
                        0,
                        0,
                        format!("RLE-5/3 byte {:#x} decodes to out-of-alphabet index {idx}", byte[0]),
                    ));
                }
                self.cur_symbol_index = idx;
                self.remaining = run_minus1 as u32 + 1;
                Ok(true)
            }
            Err(e) => Err(EngineError::io(0, 0, self.byte_pos, e)),
        }
    }
}

impl<R: Read + Seek> PartialBwtReader for Rle53Reader<R> {
    fn read_and_count(&mut self, counts: &mut [u64], n: usize) -> Result<usize> {
        let mut needed = n;
        let mut taken = 0usize;
        while needed > 0 {
            if self.remaining == 0 && !self.refill()? {
                break;
            }
            let take = (self.remaining as usize).min(needed);
            counts[self.cur_symbol_index as usize] += take as u64;
            self.remaining -= take as u32;
            needed -= take;
            taken += take;
        }
        self.pos += taken as u64;
        Ok(taken)
    }

    fn read_and_send(&mut self, writer: &mut BwtWriter, n: usize) -> Result<usize> {
        let mut needed = n;
        let mut taken = 0usize;
        while needed > 0 {
            if self.remaining == 0 && !self.refill()? {
                break;
            }
            let take = (self.remaining as usize).min(needed);
            let symbol = self.alphabet.symbol_at(self.cur_symbol_index);
            writer.write_run(symbol, take)?;
            self.remaining -= take as u32;
            needed -= take;
            taken += take;
        }
        self.pos += taken as u64;
        Ok(taken)
    }

    fn read_bytes(&mut self, buf: &mut [u8], n: usize) -> Result<usize> {
        let n = n.min(buf.len());
        let mut needed = n;
        let mut taken = 0usize;
        while needed > 0 {
            if self.remaining == 0 && !self.refill()? {
                break;
            }
            let take = (self.remaining as usize).min(needed);
            let symbol = self.alphabet.symbol_at(self.cur_symbol_index);
            buf[taken..taken + take].fill(symbol);
            self.remaining -= take as u32;
            needed -= take;
            taken += take;
        }
        self.pos += taken as u64;
        Ok(taken)
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| EngineError::io(0, 0, self.byte_pos, e))?;
        self.remaining = 0;
        self.pos = 0;
        self.byte_pos = 0;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }
}

pub struct Rle53Writer<W> {
    inner: W,
    alphabet: Alphabet,
    pending_symbol: Option<u8>,
    pending_count: u64,
}

impl<W: Write> Rle53Writer<W> {
    pub fn new(inner: W, alphabet: Alphabet) -> Self {
        assert!(alphabet.len() <= 8, "RLE-5/3 symbol field is 3 bits wide");
        Rle53Writer {
            inner,
            alphabet,
            pending_symbol: None,
            pending_count: 0,
        }
    }

    fn push(&mut self, symbol_index: u8, count: u64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        match self.pending_symbol {
            Some(s) if s == symbol_index => self.pending_count += count,
            _ => {
                self.flush_pending()?;
                self.pending_symbol = Some(symbol_index);
                self.pending_count = count;
            }
        }
        Ok(())
    }

    fn flush_pending(&mut self) -> Result<()> {
        let Some(symbol_index) = self.pending_symbol.take() else {
            return Ok(());
        };
        let mut remaining = self.pending_count;
        self.pending_count = 0;
        while remaining > 0 {
            let chunk = remaining.min(MAX_RUN as u64);
            let byte = pack(symbol_index, (chunk - 1) as u8);
            self.inner
                .write_all(&[byte])
                .map_err(|e| EngineError::io(0, 0, 0, e))?;
            remaining -= chunk;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.flush_pending()?;
        self.inner.flush().map_err(|e| EngineError::io(0, 0, 0, e))
    }
}

impl<W: Write> PartialBwtWriter for Rle53Writer<W> {
    fn write(&mut self, symbols: &[u8]) -> Result<()> {
        let mut i = 0;
        while i < symbols.len() {
            let idx = self.alphabet.index_of(symbols[i]);
            if idx as usize >= self.alphabet.len() {
                return Err(EngineError::format(0, 0, format!("byte {:#x} not in alphabet", symbols[i])));
            }
            let mut run = 1usize;
            while i + run < symbols.len() && symbols[i + run] == symbols[i] {
                run += 1;
            }
            self.push(idx, run as u64)?;
            i += run;
        }
        Ok(())
    }

    fn write_run(&mut self, symbol: u8, run_len: usize) -> Result<()> {
        if run_len == 0 {
            return Ok(());
        }
        let idx = self.alphabet.index_of(symbol);
        if idx as usize >= self.alphabet.len() {
            return Err(EngineError::format(0, 0, format!("byte {symbol:#x} not in alphabet")));
        }
        self.push(idx, run_len as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn longer_runs_fit_in_one_byte() {
        let alpha = Alphabet::DNA5;
        let mut buf = Vec::new();
        {
            let mut w = Rle53Writer::new(&mut buf, alpha);
            w.write_run(b'G', 30).unwrap();
            w.finish().unwrap();
        }
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn round_trip() {
        let alpha = Alphabet::DNA5;
        let original = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAACCCGT$".to_vec();
        let mut buf = Vec::new();
        {
            let mut w = Rle53Writer::new(&mut buf, alpha);
            w.write(&original).unwrap();
            w.finish().unwrap();
        }
        let mut r = Rle53Reader::new(Cursor::new(buf), alpha);
        let mut out = vec![0u8; original.len()];
        let got = r.read_bytes(&mut out, original.len()).unwrap();
        assert_eq!(got, original.len());
        assert_eq!(out, original);
    }
}
