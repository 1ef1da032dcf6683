//! Concatenator (spec §4.7): streams every pile's final BWT segment, in
//! alphabet order, into one linear output — optionally re-encoding to a
//! different codec along the way, since `read_and_send` already crosses
//! codec boundaries symbol-by-symbol (spec §4.2).

use crate::alphabet::Alphabet;
use crate::codec::{BwtWriter, PartialBwtReader};
use crate::config::Codec;
use crate::counts::LetterCountTable;
use crate::engine::BuildOutput;
use crate::error::Result;
use std::path::Path;

const SEND_CHUNK: usize = 1 << 16;

/// Concatenate `out`'s piles into a single BWT file at `output_path`,
/// encoded with `output_codec`. Returns the total number of symbols
/// written (== the sum of every pile's length).
pub fn concatenate(out: &BuildOutput, alphabet: &Alphabet, output_codec: Codec, output_path: &Path) -> Result<u64> {
    let mut writer = BwtWriter::create(output_path, output_codec, *alphabet, out.read_count, 0)?;
    let mut total = 0u64;
    for p in 0..alphabet.len() as u8 {
        let len = out.counts.pile_len(p as usize);
        let mut reader = out.pileset.open_bwt_reader(p, *alphabet, out.read_count)?;
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(SEND_CHUNK as u64) as usize;
            let got = reader.read_and_send(&mut writer, want)? as u64;
            if got == 0 {
                break;
            }
            remaining -= got;
        }
        total += len;
    }
    writer.finish()?;
    Ok(total)
}

/// Recompute the `C[]` array a concatenated BWT would use, without
/// re-reading it: every pile's [`LetterCountTable`] row already carries
/// this information (spec §4.5).
pub fn c_array(counts: &LetterCountTable) -> Vec<u64> {
    counts.c_array()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::EngineContext;
    use crate::cycle_source::SliceCycleSource;
    use crate::engine::build;

    #[test]
    fn concatenated_length_matches_total_symbol_count() {
        let alphabet = Alphabet::DNA5;
        let tmp = tempfile::tempdir().unwrap();
        let mut source = SliceCycleSource::new(vec![b"ACGT".to_vec(), b"ACGT".to_vec(), b"ACGA".to_vec()]).unwrap();
        let cfg = EngineConfig::new(Codec::Ascii, tmp.path());
        let ctx = EngineContext::new(alphabet, cfg).unwrap();
        let out = build(&mut source, &ctx, tmp.path()).unwrap();

        let out_path = tmp.path().join("concat.bwt");
        let total = concatenate(&out, &alphabet, Codec::Ascii, &out_path).unwrap();
        assert_eq!(total, 3 * 5);

        let on_disk = std::fs::metadata(&out_path).unwrap().len();
        assert_eq!(on_disk, total);
    }

    #[test]
    fn concatenation_preserves_pile_order() {
        let alphabet = Alphabet::DNA5;
        let tmp = tempfile::tempdir().unwrap();
        let mut source = SliceCycleSource::new(vec![b"AAAA".to_vec()]).unwrap();
        let cfg = EngineConfig::new(Codec::Ascii, tmp.path());
        let ctx = EngineContext::new(alphabet, cfg).unwrap();
        let out = build(&mut source, &ctx, tmp.path()).unwrap();

        let out_path = tmp.path().join("concat.bwt");
        concatenate(&out, &alphabet, Codec::Ascii, &out_path).unwrap();
        let bytes = std::fs::read(&out_path).unwrap();
        // Scenario S2: pile order concatenation is "A" (pile0) + "AAA$" (pile1).
        assert_eq!(&bytes, b"AAAA$");
    }
}
