//! Analysis orchestration
//!
//! Runs the full pipeline on a mono signal:
//! 1. Validate the signal
//! 2. Beat tracking and chroma extraction, side by side
//! 3. Key estimation and chord recognition, side by side
//!
//! The template bank and key profiles are built once per `Analyzer` and
//! shared read-only across every analysis it runs.

mod job;
mod result;

pub use job::AnalysisJob;
pub use result::AnalysisResult;

use crate::chords::ChordRecognizer;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result, Stage, StageContext};
use crate::features::{extract_chroma, BeatTracker};
use crate::key::{KeyEstimator, KeyProfiles};
use crate::templates::ChordTemplateBank;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    bank: Arc<ChordTemplateBank>,
    key_profiles: Arc<KeyProfiles>,
}

impl Analyzer {
    /// Build an analyzer with a fresh template bank
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::with_templates(config, Arc::new(ChordTemplateBank::new()))
    }

    /// Build an analyzer around an existing template bank
    pub fn with_templates(config: AnalysisConfig, bank: Arc<ChordTemplateBank>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bank,
            key_profiles: Arc::new(KeyProfiles::new()),
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<ChordTemplateBank> {
        &self.bank
    }

    /// Analyze a mono signal.
    ///
    /// Any stage failure comes back as `AnalysisFailed`, tagged with the
    /// stage; no partial result is produced.
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<AnalysisResult> {
        self.validate_signal(samples, sample_rate)
            .in_stage(Stage::Validation)?;

        log::info!(
            "Analyzing {} samples at {} Hz",
            samples.len(),
            sample_rate
        );

        let tracker = BeatTracker::new(&self.config);
        let (beats, chroma) = rayon::join(
            || tracker.analyze(samples, sample_rate),
            || extract_chroma(samples, sample_rate, &self.config),
        );
        let beats = beats.in_stage(Stage::BeatTracking)?;
        let chroma = chroma.in_stage(Stage::Chroma)?;

        log::debug!(
            "Extracted {} chroma frames, tempo {:.1} BPM, {} beats",
            chroma.num_frames(),
            beats.tempo,
            beats.beats.len()
        );

        let recognizer = ChordRecognizer::new(Arc::clone(&self.bank));
        let (key, chords) = rayon::join(
            || KeyEstimator::new(&self.key_profiles).estimate(&chroma),
            || recognizer.recognize(&chroma, &beats.beats),
        );
        let key = key.in_stage(Stage::KeyEstimation)?;
        let chords = chords.in_stage(Stage::ChordRecognition)?;

        let result = AnalysisResult {
            tempo: beats.tempo,
            beats: beats.beats,
            key: key.key.to_string(),
            chords,
            duration: samples.len() as f64 / sample_rate as f64,
        };

        log::info!(
            "Analysis complete: key {}, {} chords, {:.2}s",
            result.key,
            result.chords.len(),
            result.duration
        );

        Ok(result)
    }

    /// Start an analysis on the rayon pool and return a handle to its result
    pub fn spawn(self: &Arc<Self>, samples: Vec<f32>, sample_rate: u32) -> AnalysisJob {
        AnalysisJob::start(Arc::clone(self), samples, sample_rate)
    }

    fn validate_signal(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        if samples.is_empty() {
            return Err(AnalysisError::invalid_input("signal is empty"));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::invalid_input("sample rate must be > 0"));
        }
        if samples.len() < self.config.hop_length {
            return Err(AnalysisError::invalid_input(format!(
                "signal has {} samples, shorter than one hop ({})",
                samples.len(),
                self.config.hop_length
            )));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::invalid_input(format!(
                "non-finite sample at index {}",
                pos
            )));
        }
        Ok(())
    }
}
