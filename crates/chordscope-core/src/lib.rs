//! Chordscope Core - Chord, Key and Beat Analysis
//!
//! This crate annotates a mono audio signal with its tempo, beat positions,
//! musical key and a time-aligned chord sequence, using chroma features,
//! fixed chord templates and Krumhansl-Kessler key profiles.

pub mod analysis;
pub mod audio;
pub mod chords;
pub mod config;
pub mod error;
pub mod features;
pub mod key;
pub mod pitch;
pub mod templates;
pub mod transform;

pub use analysis::{AnalysisJob, AnalysisResult, Analyzer};
pub use chords::{ChordRecognizer, ChordSegment};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Stage};
pub use key::{Key, KeyEstimator, KeyProfiles, Mode};
pub use pitch::PitchClass;
pub use templates::{ChordQuality, ChordTemplate, ChordTemplateBank};

/// Analyze an audio file
pub fn analyze_file(audio_path: &str, config: &AnalysisConfig) -> anyhow::Result<AnalysisResult> {
    // Decode and downmix at the analysis rate
    let audio_data = audio::load_mono(audio_path, config.sample_rate)?;

    let analyzer = Analyzer::new(config.clone())?;
    let result = analyzer.analyze(&audio_data.samples, audio_data.sample_rate)?;

    Ok(result)
}
