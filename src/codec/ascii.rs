//! ASCII codec: one raw alphabet byte per symbol.

use super::{BwtWriter, PartialBwtReader, PartialBwtWriter};
use crate::alphabet::{Alphabet, NOT_IN_ALPHABET};
use crate::error::{EngineError, Result};
use std::io::{Read, Seek, SeekFrom, Write};

pub struct AsciiReader<R> {
    inner: R,
    alphabet: Alphabet,
    pos: u64,
}

impl<R: Read + Seek> AsciiReader<R> {
    pub fn new(inner: R, alphabet: Alphabet) -> Self {
        AsciiReader {
            inner,
            alphabet,
            pos: 0,
        }
    }
}

impl<R: Read + Seek> PartialBwtReader for AsciiReader<R> {
    fn read_and_count(&mut self, counts: &mut [u64], n: usize) -> Result<usize> {
        let mut buf = vec![0u8; n];
        let got = self.read_bytes(&mut buf, n)?;
        for &b in &buf[..got] {
            let idx = self.alphabet.index_of(b);
            if idx == NOT_IN_ALPHABET {
                return Err(EngineError::format(0, 0, format!("byte {b:#x} not in alphabet")));
            }
            counts[idx as usize] += 1;
        }
        Ok(got)
    }

    fn read_and_send(&mut self, writer: &mut BwtWriter, n: usize) -> Result<usize> {
        let mut buf = vec![0u8; n];
        let got = self.read_bytes(&mut buf, n)?;
        if got > 0 {
            writer.write(&buf[..got])?;
        }
        Ok(got)
    }

    fn read_bytes(&mut self, buf: &mut [u8], n: usize) -> Result<usize> {
        let n = n.min(buf.len());
        let mut got = 0;
        while got < n {
            match self.inner.read(&mut buf[got..n]) {
                Ok(0) => break,
                Ok(k) => got += k,
                Err(e) => return Err(EngineError::io(0, 0, self.pos, e)),
            }
        }
        self.pos += got as u64;
        Ok(got)
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| EngineError::io(0, 0, self.pos, e))?;
        self.pos = 0;
        Ok(())
    }

    fn tell(&self) -> u64 {
        self.pos
    }
}

pub struct AsciiWriter<W> {
    inner: W,
}

impl<W: Write> AsciiWriter<W> {
    pub fn new(inner: W, _alphabet: Alphabet) -> Self {
        AsciiWriter { inner }
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush().map_err(|e| EngineError::io(0, 0, 0, e))
    }
}

impl<W: Write> PartialBwtWriter for AsciiWriter<W> {
    fn write(&mut self, symbols: &[u8]) -> Result<()> {
        self.inner
            .write_all(symbols)
            .map_err(|e| EngineError::io(0, 0, 0, e))
    }

    fn write_run(&mut self, symbol: u8, run_len: usize) -> Result<()> {
        let chunk = [symbol; 256];
        let mut remaining = run_len;
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.write(&chunk[..n])?;
            remaining -= n;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_raw_bytes() {
        let alpha = Alphabet::DNA5;
        let mut buf = Vec::new();
        {
            let mut w = AsciiWriter::new(&mut buf, alpha);
            w.write(b"ACGT").unwrap();
            w.write_run(b'A', 3).unwrap();
        }
        let mut r = AsciiReader::new(Cursor::new(buf), alpha);
        let mut out = [0u8; 7];
        let got = r.read_bytes(&mut out, 7).unwrap();
        assert_eq!(got, 7);
        assert_eq!(&out, b"ACGTAAA");
    }

    #[test]
    fn read_and_count_tallies_by_alphabet_index() {
        let alpha = Alphabet::DNA5;
        let mut counts = vec![0u64; alpha.len()];
        let mut r = AsciiReader::new(Cursor::new(b"AACGT$".to_vec()), alpha);
        let got = r.read_and_count(&mut counts, 6).unwrap();
        assert_eq!(got, 6);
        assert_eq!(counts[alpha.index_of(b'A') as usize], 2);
        assert_eq!(counts[alpha.index_of(b'$') as usize], 1);
    }
}
