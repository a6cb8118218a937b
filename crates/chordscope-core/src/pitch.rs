//! Pitch classes and 12-bin vector helpers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of pitch classes in an octave
pub const NUM_PITCH_CLASSES: usize = 12;

/// One 12-bin pitch-class energy vector, indexed C..B
pub type ChromaVector = [f32; NUM_PITCH_CLASSES];

/// The 12 pitch classes, sharps only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C
    pub const ALL: [PitchClass; NUM_PITCH_CLASSES] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0..11)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pitch class for a semitone offset from C, wrapping at the octave
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % NUM_PITCH_CLASSES]
    }

    /// Transpose up by `semitones`, wrapping at the octave
    pub fn transpose(self, semitones: u8) -> Self {
        Self::from_index(self.index() + semitones as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Euclidean norm of a 12-bin vector
pub fn l2_norm(v: &ChromaVector) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity clamped to [-1, 1], or `None` when either vector has no
/// energy
pub fn cosine_similarity(a: &ChromaVector, b: &ChromaVector) -> Option<f32> {
    let norm = l2_norm(a) * l2_norm(b);
    if norm <= f32::EPSILON {
        return None;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    Some((dot / norm).clamp(-1.0, 1.0))
}

/// Cosine distance (`1 - similarity`). A zero vector is treated as orthogonal
/// to everything, giving a distance of 1.
pub fn cosine_distance(a: &ChromaVector, b: &ChromaVector) -> f32 {
    1.0 - cosine_similarity(a, b).unwrap_or(0.0)
}

/// Element-wise mean of a run of vectors; zeros when `frames` is empty
pub fn mean_vector(frames: &[ChromaVector]) -> ChromaVector {
    let mut mean = [0.0f32; NUM_PITCH_CLASSES];
    if frames.is_empty() {
        return mean;
    }
    for frame in frames {
        for (m, v) in mean.iter_mut().zip(frame.iter()) {
            *m += v;
        }
    }
    let n = frames.len() as f32;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}
