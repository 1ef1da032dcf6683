//! Small sidecar recording what a `bwt` CLI run needs `unbwt` to know
//! later, in a separate process: which generation's pile files survived,
//! how many reads there were, how long they are, and which codec they're
//! encoded in. [`crate::engine::BuildOutput`] already carries all of this
//! in-process; this is just enough of it, persisted, for a second
//! invocation to rebuild a [`crate::pileset::PileSet`] pointed at the
//! right files.

use crate::config::Codec;
use crate::error::{EngineError, Result};
use std::io::{BufRead, Write};
use std::path::Path;

pub struct RunMetadata {
    pub generation: String,
    pub read_count: usize,
    pub read_len: usize,
    pub codec: Codec,
}

impl RunMetadata {
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut f = std::fs::File::create(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        writeln!(f, "generation={}", self.generation).map_err(|e| EngineError::io(0, 0, 0, e))?;
        writeln!(f, "read_count={}", self.read_count).map_err(|e| EngineError::io(0, 0, 0, e))?;
        writeln!(f, "read_len={}", self.read_len).map_err(|e| EngineError::io(0, 0, 0, e))?;
        writeln!(f, "codec={}", codec_name(self.codec)).map_err(|e| EngineError::io(0, 0, 0, e))?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let f = std::fs::File::open(path).map_err(|e| EngineError::io(0, 0, 0, e))?;
        let mut generation = None;
        let mut read_count = None;
        let mut read_len = None;
        let mut codec = None;
        for line in std::io::BufReader::new(f).lines() {
            let line = line.map_err(|e| EngineError::io(0, 0, 0, e))?;
            let Some((key, value)) = line.split_once('=') else { continue };
            match key {
                "generation" => generation = Some(value.to_string()),
                "read_count" => read_count = value.parse().ok(),
                "read_len" => read_len = value.parse().ok(),
                "codec" => codec = codec_from_name(value),
                _ => {}
            }
        }
        Ok(RunMetadata {
            generation: generation.ok_or_else(|| EngineError::format(0, 0, "run metadata missing generation"))?,
            read_count: read_count.ok_or_else(|| EngineError::format(0, 0, "run metadata missing read_count"))?,
            read_len: read_len.ok_or_else(|| EngineError::format(0, 0, "run metadata missing read_len"))?,
            codec: codec.ok_or_else(|| EngineError::format(0, 0, "run metadata missing or unrecognised codec"))?,
        })
    }
}

fn codec_name(codec: Codec) -> &'static str {
    match codec {
        Codec::Ascii => "ascii",
        Codec::Rle4_4 => "rle4_4",
        #[cfg(feature = "rle_rich")]
        Codec::Rle5_3 => "rle5_3",
    }
}

fn codec_from_name(name: &str) -> Option<Codec> {
    match name {
        "ascii" => Some(Codec::Ascii),
        "rle4_4" => Some(Codec::Rle4_4),
        #[cfg(feature = "rle_rich")]
        "rle5_3" => Some(Codec::Rle5_3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("meta.txt");
        let meta = RunMetadata {
            generation: "gen004".to_string(),
            read_count: 3,
            read_len: 4,
            codec: Codec::Ascii,
        };
        meta.write(&path).unwrap();
        let back = RunMetadata::read(&path).unwrap();
        assert_eq!(back.generation, "gen004");
        assert_eq!(back.read_count, 3);
        assert_eq!(back.read_len, 4);
        assert_eq!(back.codec, Codec::Ascii);
    }
}
