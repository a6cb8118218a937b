//! Beat-synchronous chord recognition
//!
//! The chroma matrix is cut at beat boundaries, each segment's mean chroma
//! is scored against every chord template, and a greedy forward pass with a
//! fixed switch penalty picks one label per segment. Adjacent segments with
//! the same label are merged.
//!
//! Labeling is greedy: each decision only looks at the previous segment's
//! label. It is not Viterbi, and the two give different answers.

use crate::error::{AnalysisError, Result};
use crate::features::chroma::ChromaMatrix;
use crate::pitch::{cosine_distance, mean_vector, ChromaVector, PitchClass};
use crate::templates::{ChordQuality, ChordTemplate, ChordTemplateBank};
use serde::{Deserialize, Serialize};
use std::sync::Arc;


/// Score added when the label changes between consecutive segments
pub const SWITCH_PENALTY: f32 = -1.0;

/// A labeled, time-bounded chord
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    /// Start of the chord (seconds)
    pub start_time: f64,
    /// End of the chord (seconds), always after `start_time`
    pub end_time: f64,
    /// "Root quality", e.g. "A min"
    pub label: String,
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Always 0; inversions are not detected
    pub inversion: u8,
    /// `1 + score`, clamped to [0, 1]
    pub confidence: f32,
    /// MIDI notes voiced from middle C
    pub notes: Vec<u8>,
}

impl ChordSegment {
    fn from_template(template: &ChordTemplate, start_time: f64, end_time: f64, score: f32) -> Self {
        Self {
            start_time,
            end_time,
            label: template.label(),
            root: template.root,
            quality: template.quality,
            inversion: 0,
            confidence: (1.0 + score).clamp(0.0, 1.0),
            notes: template.midi_notes(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A candidate segment between two consecutive boundaries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSegment {
    /// First chroma frame (inclusive)
    pub start_frame: usize,
    /// Last chroma frame (exclusive)
    pub end_frame: usize,
    pub start_time: f64,
    pub end_time: f64,
}

/// Cut the chroma timeline at beats.
///
/// Boundaries are frame 0, each beat's frame (clamped to the last frame),
/// and the last frame. Boundary times are 0, the beat times clamped to the
/// signal, and the end of the last frame. Candidates spanning zero or
/// negative frames are dropped, so every returned segment has a frame.
///
/// Returned segments tile `[0, end of last frame]` without gaps: a dropped
/// candidate's start time passes to the next kept segment, and the last kept
/// segment always ends at the end of the last frame.
pub fn segment_boundaries(chroma: &ChromaMatrix, beats: &[f64]) -> Vec<BeatSegment> {
    if chroma.is_empty() {
        return Vec::new();
    }
    let last_frame = chroma.num_frames() - 1;
    let end_time = chroma.frame_to_time(chroma.num_frames());

    let mut frames = Vec::with_capacity(beats.len() + 2);
    let mut times = Vec::with_capacity(beats.len() + 2);

    frames.push(0);
    times.push(0.0);
    for &beat in beats {
        frames.push(chroma.time_to_frame(beat).min(last_frame));
        times.push(beat.clamp(0.0, end_time));
    }
    frames.push(last_frame);
    times.push(end_time);

    let mut segments: Vec<BeatSegment> = Vec::with_capacity(frames.len() - 1);
    let mut start_time = times[0];

    for k in 0..frames.len() - 1 {
        if frames[k + 1] <= frames[k] {
            continue;
        }
        segments.push(BeatSegment {
            start_frame: frames[k],
            end_frame: frames[k + 1],
            start_time,
            end_time: times[k + 1],
        });
        start_time = times[k + 1];
    }

    // A trailing candidate that collapsed onto the last frame still owns the tail
    if let Some(last) = segments.last_mut() {
        last.end_time = end_time;
    }

    segments
}

/// Negative cosine distance from `mean` to every template, in bank order
pub fn score_templates(mean: &ChromaVector, bank: &ChordTemplateBank) -> Vec<f32> {
    bank.templates()
        .iter()
        .map(|template| -cosine_distance(mean, &template.vector))
        .collect()
}

/// Greedy forward labeling over a `[segment][template]` score matrix.
///
/// Segment 0 takes its best-scoring template. Every later segment takes the
/// template maximizing `score + penalty(previous, template)`, where the
/// penalty is 0 for keeping the previous label and `switch_penalty`
/// otherwise. Ties go to the lowest template index.
pub fn greedy_path(scores: &[Vec<f32>], switch_penalty: f32) -> Vec<usize> {
    let mut path: Vec<usize> = Vec::with_capacity(scores.len());

    for row in scores {
        let previous = path.last().copied();
        let mut best: Option<(usize, f32)> = None;

        for (j, &score) in row.iter().enumerate() {
            let value = match previous {
                Some(prev) if prev != j => score + switch_penalty,
                _ => score,
            };
            if best.map_or(true, |(_, b)| value > b) {
                best = Some((j, value));
            }
        }

        if let Some((j, _)) = best {
            path.push(j);
        }
    }

    path
}

/// Merge consecutive segments that share a label, extending the first one
pub fn merge_runs(segments: Vec<ChordSegment>) -> Vec<ChordSegment> {
    let mut merged: Vec<ChordSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.label == segment.label => last.end_time = segment.end_time,
            _ => merged.push(segment),
        }
    }

    merged
}

/// Labels beat segments with chords from a shared template bank
#[derive(Debug, Clone)]
pub struct ChordRecognizer {
    bank: Arc<ChordTemplateBank>,
    switch_penalty: f32,
}

impl ChordRecognizer {
    pub fn new(bank: Arc<ChordTemplateBank>) -> Self {
        Self {
            bank,
            switch_penalty: SWITCH_PENALTY,
        }
    }

    pub fn bank(&self) -> &ChordTemplateBank {
        &self.bank
    }

    /// Recognize chords over the whole chroma matrix.
    ///
    /// Fails with `InvalidInput` on an empty matrix or non-finite beat
    /// times. Returns an empty vector when no segment spans a frame.
    pub fn recognize(&self, chroma: &ChromaMatrix, beats: &[f64]) -> Result<Vec<ChordSegment>> {
        if chroma.is_empty() {
            return Err(AnalysisError::invalid_input(
                "cannot recognize chords from an empty chroma matrix",
            ));
        }
        if beats.iter().any(|b| !b.is_finite()) {
            return Err(AnalysisError::invalid_input("beat times must be finite"));
        }

        let segments = segment_boundaries(chroma, beats);
        if segments.is_empty() {
            log::debug!("No beat segment spans a chroma frame; no chords");
            return Ok(Vec::new());
        }

        let scores: Vec<Vec<f32>> = segments
            .iter()
            .map(|seg| {
                let mean = mean_vector(&chroma.frames()[seg.start_frame..seg.end_frame]);
                score_templates(&mean, &self.bank)
            })
            .collect();

        let path = greedy_path(&scores, self.switch_penalty);

        let mut chords = Vec::with_capacity(segments.len());
        for ((segment, row), &label) in segments.iter().zip(scores.iter()).zip(path.iter()) {
            if segment.end_time <= segment.start_time {
                continue;
            }
            let template = self.bank.get(label).ok_or_else(|| {
                AnalysisError::invalid_input(format!("template index {} out of range", label))
            })?;
            chords.push(ChordSegment::from_template(
                template,
                segment.start_time,
                segment.end_time,
                row[label],
            ));
        }

        let candidates = chords.len();
        let merged = merge_runs(chords);
        log::debug!(
            "Recognized {} chord segments from {} beat segments ({} before merge)",
            merged.len(),
            segments.len(),
            candidates
        );

        Ok(merged)
    }
}
