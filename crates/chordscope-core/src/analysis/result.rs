//! Serialized analysis output

use crate::chords::ChordSegment;
use serde::{Deserialize, Serialize};

/// Full annotation of one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Estimated tempo in BPM, 0 when no periodicity was found
    pub tempo: f64,
    /// Beat times in seconds, strictly increasing
    pub beats: Vec<f64>,
    /// Key name, e.g. "A Minor"
    pub key: String,
    pub chords: Vec<ChordSegment>,
    /// Signal length in seconds
    pub duration: f64,
}

impl AnalysisResult {
    /// Chord sounding at `time`, if any
    pub fn chord_at(&self, time: f64) -> Option<&ChordSegment> {
        self.chords
            .iter()
            .find(|c| c.start_time <= time && time < c.end_time)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
