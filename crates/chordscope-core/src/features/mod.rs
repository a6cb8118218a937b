//! Spectral feature extraction
//!
//! Chroma and tempo/beats are computed from independent STFTs that share the
//! same hop, so beat frames index directly into the chroma matrix.

pub mod beat;
pub mod chroma;

pub use beat::{BeatAnalysis, BeatTracker};
pub use chroma::{extract_chroma, ChromaMatrix};
