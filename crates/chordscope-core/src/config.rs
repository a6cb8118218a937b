//! Configuration parameters for the analysis pipeline
//!
//! Defaults: 22.05 kHz mono input, 512-sample hop, 120 BPM tempo prior.

use crate::error::AnalysisError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Audio loading
    pub sample_rate: u32,

    // Framing (shared by chroma and onset frames so their indices line up)
    pub hop_length: usize,
    pub chroma_frame_size: usize,
    pub onset_frame_size: usize,

    // Chroma
    pub min_freq: f32,
    pub max_freq: f32,
    pub ref_freq: f32,

    // Tempo estimation
    pub min_tempo: f64,
    pub max_tempo: f64,
    pub start_bpm: f64,
    pub tempo_std_octaves: f64,
    pub ac_window_s: f64,

    // Beat tracking
    pub tightness: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,

            hop_length: 512,
            chroma_frame_size: 4096,
            onset_frame_size: 2048,

            min_freq: 110.0,
            max_freq: 3520.0,
            ref_freq: 440.0,

            min_tempo: 30.0,
            max_tempo: 300.0,
            start_bpm: 120.0,
            tempo_std_octaves: 1.0,
            ac_window_s: 8.0,

            tightness: 100.0,
        }
    }
}

impl AnalysisConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.hop_length == 0 {
            return Err(AnalysisError::InvalidConfig("hop_length must be > 0".into()));
        }
        if self.chroma_frame_size < 2 || self.onset_frame_size < 2 {
            return Err(AnalysisError::InvalidConfig("frame sizes must be >= 2".into()));
        }
        if !(self.min_freq > 0.0 && self.min_freq < self.max_freq) {
            return Err(AnalysisError::InvalidConfig("min_freq must be > 0 and < max_freq".into()));
        }
        if self.ref_freq <= 0.0 {
            return Err(AnalysisError::InvalidConfig("ref_freq must be > 0".into()));
        }
        if !(self.min_tempo > 0.0 && self.min_tempo < self.max_tempo) {
            return Err(AnalysisError::InvalidConfig("min_tempo must be > 0 and < max_tempo".into()));
        }
        if self.start_bpm <= 0.0 || self.tempo_std_octaves <= 0.0 || self.ac_window_s <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "start_bpm, tempo_std_octaves and ac_window_s must be > 0".into(),
            ));
        }
        if self.tightness < 0.0 {
            return Err(AnalysisError::InvalidConfig("tightness must be >= 0".into()));
        }
        Ok(())
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AnalysisConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Duration of one frame hop in seconds at the given sample rate
    pub fn hop_seconds(&self, sample_rate: u32) -> f64 {
        self.hop_length as f64 / sample_rate as f64
    }
}
