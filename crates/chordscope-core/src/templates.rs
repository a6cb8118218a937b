//! Chord template bank
//!
//! 12 roots x 11 qualities = 132 binary pitch-class templates, each
//! L2-normalized. Built once and shared read-only between analyses.

use crate::pitch::{l2_norm, ChromaVector, PitchClass, NUM_PITCH_CLASSES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI note number of middle C; chord notes are voiced upward from here
pub const MIDDLE_C: u8 = 60;

/// Chord qualities in the fixed vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    Maj,
    Min,
    Dim,
    Aug,
    Sus2,
    Sus4,
    Maj7,
    Min7,
    Dom7,
    Dim7,
    Add9,
}

impl ChordQuality {
    /// All qualities in template-bank order
    pub const ALL: [ChordQuality; 11] = [
        ChordQuality::Maj,
        ChordQuality::Min,
        ChordQuality::Dim,
        ChordQuality::Aug,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Maj7,
        ChordQuality::Min7,
        ChordQuality::Dom7,
        ChordQuality::Dim7,
        ChordQuality::Add9,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Semitone intervals above the root
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ChordQuality::Maj => &[0, 4, 7],
            ChordQuality::Min => &[0, 3, 7],
            ChordQuality::Dim => &[0, 3, 6],
            ChordQuality::Aug => &[0, 4, 8],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Maj7 => &[0, 4, 7, 11],
            ChordQuality::Min7 => &[0, 3, 7, 10],
            ChordQuality::Dom7 => &[0, 4, 7, 10],
            ChordQuality::Dim7 => &[0, 3, 6, 9],
            ChordQuality::Add9 => &[0, 2, 4, 7],
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordQuality::Maj => "maj",
            ChordQuality::Min => "min",
            ChordQuality::Dim => "dim",
            ChordQuality::Aug => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Maj7 => "maj7",
            ChordQuality::Min7 => "min7",
            ChordQuality::Dom7 => "dom7",
            ChordQuality::Dim7 => "dim7",
            ChordQuality::Add9 => "add9",
        }
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single normalized chord template
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTemplate {
    pub root: PitchClass,
    pub quality: ChordQuality,
    /// Unit-norm pitch-class pattern
    pub vector: ChromaVector,
}

impl ChordTemplate {
    fn build(root: PitchClass, quality: ChordQuality) -> Self {
        let mut vector = [0.0f32; NUM_PITCH_CLASSES];
        for &interval in quality.intervals() {
            vector[root.transpose(interval).index()] = 1.0;
        }
        let norm = l2_norm(&vector);
        vector.iter_mut().for_each(|v| *v /= norm);

        Self { root, quality, vector }
    }

    pub fn intervals(&self) -> &'static [u8] {
        self.quality.intervals()
    }

    /// Output label, e.g. "A min"
    pub fn label(&self) -> String {
        format!("{} {}", self.root, self.quality)
    }

    /// Bank key, e.g. "A:min"
    pub fn key(&self) -> String {
        format!("{}:{}", self.root, self.quality)
    }

    /// MIDI notes anchored at middle C: `60 + root + interval`
    pub fn midi_notes(&self) -> Vec<u8> {
        let base = MIDDLE_C + self.root.index() as u8;
        self.intervals().iter().map(|&i| base + i).collect()
    }
}

/// Immutable catalog of all chord templates
#[derive(Debug, Clone)]
pub struct ChordTemplateBank {
    templates: Vec<ChordTemplate>,
}

impl ChordTemplateBank {
    /// Build every (root, quality) template, root-major order
    pub fn new() -> Self {
        let templates: Vec<ChordTemplate> = PitchClass::ALL
            .iter()
            .flat_map(|&root| {
                ChordQuality::ALL
                    .iter()
                    .map(move |&quality| ChordTemplate::build(root, quality))
            })
            .collect();

        log::trace!("Built chord template bank with {} templates", templates.len());
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates in bank order; positions are the indices used for scoring
    pub fn templates(&self) -> &[ChordTemplate] {
        &self.templates
    }

    pub fn get(&self, index: usize) -> Option<&ChordTemplate> {
        self.templates.get(index)
    }

    /// Dense index of a (root, quality) pair
    pub fn index_of(root: PitchClass, quality: ChordQuality) -> usize {
        root.index() * ChordQuality::COUNT + quality.index()
    }

    pub fn lookup(&self, root: PitchClass, quality: ChordQuality) -> &ChordTemplate {
        &self.templates[Self::index_of(root, quality)]
    }
}

impl Default for ChordTemplateBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bank_has_132_unit_templates() {
        let bank = ChordTemplateBank::new();
        assert_eq!(bank.len(), 132);
        for template in bank.templates() {
            assert_abs_diff_eq!(l2_norm(&template.vector), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_index_matches_lookup() {
        let bank = ChordTemplateBank::new();
        for (i, template) in bank.templates().iter().enumerate() {
            assert_eq!(ChordTemplateBank::index_of(template.root, template.quality), i);
        }
        let a_min = bank.lookup(PitchClass::A, ChordQuality::Min);
        assert_eq!(a_min.key(), "A:min");
        assert_eq!(a_min.label(), "A min");
    }

    #[test]
    fn test_template_pitch_classes() {
        let bank = ChordTemplateBank::new();
        let b_dim = bank.lookup(PitchClass::B, ChordQuality::Dim);
        // B D F
        let active: Vec<usize> = (0..12).filter(|&i| b_dim.vector[i] > 0.0).collect();
        assert_eq!(active, vec![2, 5, 11]);
        assert_abs_diff_eq!(b_dim.vector[2], 1.0 / 3.0f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_midi_notes() {
        let bank = ChordTemplateBank::new();
        assert_eq!(bank.lookup(PitchClass::C, ChordQuality::Maj).midi_notes(), vec![60, 64, 67]);
        assert_eq!(bank.lookup(PitchClass::A, ChordQuality::Min).midi_notes(), vec![69, 72, 76]);
        assert_eq!(
            bank.lookup(PitchClass::G, ChordQuality::Dom7).midi_notes(),
            vec![67, 71, 74, 77]
        );
    }

    #[test]
    fn test_quality_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChordQuality::Dom7).unwrap(), "\"dom7\"");
        assert_eq!(ChordQuality::Sus2.to_string(), "sus2");
    }
}
