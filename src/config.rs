//! Construction-time configuration (SPEC_FULL §2, §5).

use crate::error::{EngineError, Result};
use std::path::{Path, PathBuf};

/// Which partial-BWT codec new pile segments are written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Codec {
    Ascii,
    Rle4_4,
    #[cfg(feature = "rle_rich")]
    Rle5_3,
}

/// Construction-time engine configuration.
///
/// Validated once by [`EngineConfig::validate`]; invalid combinations are
/// refused at startup with [`EngineError::Config`] rather than discovered
/// mid-cycle.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub codec: Codec,
    /// Worker threads for per-pile parallelism. Defaults to the number of
    /// logical CPUs.
    pub threads: usize,
    /// Directory for per-cycle side files; created at start, best-effort
    /// cleaned up at exit.
    pub tmp_dir: PathBuf,
    /// Cap, in bytes, on RAM-backed temporary files before overflowing to
    /// disk.
    pub ram_temp_cap_bytes: u64,
    /// Block size `B` for the rank index accelerating inversion (§4.7).
    pub rank_block_size: usize,
    /// Emit an LCP side stream parallel to each pile's BWT segment.
    pub emit_lcp: bool,
    /// Emit a quality side stream parallel to each pile's BWT segment.
    pub emit_quality: bool,
    /// Re-check the invariants of spec §8 (properties 2-4) at every cycle
    /// boundary. Expensive; defaults to `cfg!(debug_assertions)`.
    pub verify_invariants: bool,
}

impl EngineConfig {
    pub fn new(codec: Codec, tmp_dir: impl Into<PathBuf>) -> Self {
        EngineConfig {
            codec,
            threads: num_cpus::get(),
            tmp_dir: tmp_dir.into(),
            ram_temp_cap_bytes: 1 << 30,
            rank_block_size: 2048,
            emit_lcp: false,
            emit_quality: false,
            verify_invariants: cfg!(debug_assertions),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(EngineError::config("threads must be >= 1"));
        }
        if self.rank_block_size == 0 {
            return Err(EngineError::config("rank_block_size must be >= 1"));
        }
        #[cfg(not(feature = "lcp"))]
        if self.emit_lcp {
            return Err(EngineError::config(
                "emit_lcp requires the `lcp` feature to be enabled",
            ));
        }
        if self.emit_lcp && matches!(self.codec, Codec::Ascii) == false && self.threads > 1 {
            // LCP + parallel + RLE intermediate is an explicitly refused
            // combination (spec §7, ConfigError example).
            return Err(EngineError::config(
                "LCP streams are not supported together with a run-length codec under parallel construction",
            ));
        }
        Ok(())
    }

    /// Resolve the effective temp directory, honouring `BEETL_TMPDIR` over
    /// the configured path when both are set (spec §6).
    pub fn effective_tmp_dir(&self) -> PathBuf {
        std::env::var_os("BEETL_TMPDIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.tmp_dir.clone())
    }
}

/// Join `{prefix}-{kind}{pile}`-style on-disk names deterministically
/// (spec §6). Grounded on the original's `shared/Filename.hh` helper.
pub struct Filename;

impl Filename {
    pub fn pile(prefix: &Path, kind: &str, pile: u8) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(format!("-{kind}0{pile}"));
        PathBuf::from(name)
    }

    pub fn plain(prefix: &Path, suffix: &str) -> PathBuf {
        let mut name = prefix.as_os_str().to_owned();
        name.push(format!("-{suffix}"));
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pile_filenames_match_frozen_layout() {
        let prefix = PathBuf::from("/tmp/run");
        assert_eq!(
            Filename::pile(&prefix, "B", 3),
            PathBuf::from("/tmp/run-B03")
        );
        assert_eq!(
            Filename::plain(&prefix, "end-pos"),
            PathBuf::from("/tmp/run-end-pos")
        );
    }

    #[test]
    fn rejects_zero_threads() {
        let cfg = EngineConfig {
            threads: 0,
            ..EngineConfig::new(Codec::Ascii, "/tmp")
        };
        assert!(cfg.validate().is_err());
    }
}
