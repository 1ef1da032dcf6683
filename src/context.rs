//! Explicit, passed-down engine context (Design Notes §9: replaces the
//! original's global mutable alphabet table and temp-file-manager
//! singleton).

use crate::alphabet::Alphabet;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use tempfile::TempDir;

/// Everything a cycle needs that isn't per-cycle state: the alphabet, the
/// validated configuration, and (if the caller didn't supply a persistent
/// `tmp_dir`) an owned scratch directory cleaned up on drop.
pub struct EngineContext {
    alphabet: Alphabet,
    config: EngineConfig,
    _scratch: Option<TempDir>,
}

impl EngineContext {
    pub fn new(alphabet: Alphabet, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let dir = config.effective_tmp_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            EngineError::config(format!("could not create tmp dir {}: {e}", dir.display()))
        })?;
        Ok(EngineContext {
            alphabet,
            config,
            _scratch: None,
        })
    }

    /// Build a context with a process-owned scratch directory under the
    /// system temp root, removed when the context is dropped.
    pub fn with_scratch_dir(alphabet: Alphabet, mut config: EngineConfig) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("beetl-")
            .tempdir()
            .map_err(|e| EngineError::config(format!("could not create scratch dir: {e}")))?;
        config.tmp_dir = scratch.path().to_path_buf();
        config.validate()?;
        Ok(EngineContext {
            alphabet,
            config,
            _scratch: Some(scratch),
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
