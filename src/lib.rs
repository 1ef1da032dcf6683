//! `beetl`: external-memory, incremental construction of the
//! Burrows-Wheeler Transform of a collection of equal-length DNA reads,
//! via the BCR algorithm (Bauer, Cox, Rosone 2011).
//!
//! The crate is organised the way the algorithm itself is staged:
//! [`alphabet`] and [`config`] are shared vocabulary; [`cycle_source`]
//! feeds read data in; [`engine`] runs the cycle-by-cycle construction;
//! [`concat`], [`rank_index`] and [`invert`] turn the finished per-pile
//! BWT into a linear transform or back into reads; [`backtrack`] and
//! [`handlers`] implement backward search over one or two completed
//! transforms for comparative analyses (splice discovery, reference
//! variant calling, metagenomic classification, tumour/normal diffing).
#![deny(unconditional_recursion)]
#![deny(unreachable_patterns)]
#![deny(trivial_casts)]

pub mod alphabet;
pub mod backtrack;
pub mod codec;
pub mod concat;
pub mod config;
pub mod context;
pub mod counts;
pub mod cycle_source;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod invert;
pub mod pile;
pub mod pileset;
pub mod rank_index;
pub mod run_meta;
pub mod triples;

/// Import everything needed to build a BWT and run it back and forth.
pub mod prelude {
    pub use crate::alphabet::Alphabet;
    pub use crate::config::{Codec, EngineConfig};
    pub use crate::context::EngineContext;
    pub use crate::cycle_source::{CycleBatch, CycleSource, SliceCycleSource};
    pub use crate::engine::{build, BuildOutput};
    pub use crate::error::{EngineError, Result};
}
