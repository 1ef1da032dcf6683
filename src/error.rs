//! Structured error taxonomy for the BCR engine (spec §7).
//!
//! The engine never swallows an error or uses exceptions-as-control-flow:
//! every fallible operation below the CLI boundary returns
//! `Result<T, EngineError>`, carrying enough context (cycle, pile, byte
//! offset) for a post-mortem without re-running the cycle.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Input not in the declared format, or codec bytes inconsistent with
    /// the declared alphabet. Non-recoverable.
    #[error("format error at cycle {cycle}, pile {pile}: {detail}")]
    Format {
        cycle: usize,
        pile: usize,
        detail: String,
    },

    /// Read/write short counts or open failures. Non-recoverable within a
    /// cycle.
    #[error("I/O error at cycle {cycle}, pile {pile}, offset {offset}: {source}")]
    Io {
        cycle: usize,
        pile: usize,
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Triple store, counts, or pile lengths disagree at a checked
    /// boundary. Indicates a bug, not bad input.
    #[error("invariant violation at cycle {cycle}: {detail}")]
    Invariant { cycle: usize, detail: String },

    /// Unsupported configuration combination, refused at startup.
    #[error("configuration error: {detail}")]
    Config { detail: String },

    /// Temporary disk or RAM cap exceeded; the cycle aborts.
    #[error("resource exhausted on pile {pile}: {detail}")]
    ResourceExhaustion { pile: usize, detail: String },
}

impl EngineError {
    pub fn io(cycle: usize, pile: usize, offset: u64, source: io::Error) -> Self {
        EngineError::Io {
            cycle,
            pile,
            offset,
            source,
        }
    }

    pub fn format(cycle: usize, pile: usize, detail: impl Into<String>) -> Self {
        EngineError::Format {
            cycle,
            pile,
            detail: detail.into(),
        }
    }

    pub fn invariant(cycle: usize, detail: impl Into<String>) -> Self {
        EngineError::Invariant {
            cycle,
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        EngineError::Config {
            detail: detail.into(),
        }
    }

    pub fn resource(pile: usize, detail: impl Into<String>) -> Self {
        EngineError::ResourceExhaustion {
            pile,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
