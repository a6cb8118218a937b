//! Key estimation against Krumhansl-Kessler profiles
//!
//! The mean chroma of the whole signal is compared to 24 rotated key
//! profiles by cosine similarity; the closest profile names the key.

use crate::error::{AnalysisError, Result};
use crate::features::chroma::ChromaMatrix;
use crate::pitch::{cosine_similarity, mean_vector, ChromaVector, PitchClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Krumhansl-Kessler C major profile
const MAJOR_PROFILE: ChromaVector = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler C minor profile
const MINOR_PROFILE: ChromaVector = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("Major"),
            Mode::Minor => f.write_str("Minor"),
        }
    }
}

/// A musical key, displayed as e.g. "A Minor"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub tonic: PitchClass,
    pub mode: Mode,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tonic, self.mode)
    }
}

/// Reference profile for one key
#[derive(Debug, Clone)]
pub struct KeyProfile {
    pub key: Key,
    pub profile: ChromaVector,
}

/// The 24 key profiles: 12 majors in chromatic order, then 12 minors
#[derive(Debug, Clone)]
pub struct KeyProfiles {
    profiles: Vec<KeyProfile>,
}

impl KeyProfiles {
    pub fn new() -> Self {
        let mut profiles = Vec::with_capacity(24);
        for (mode, base) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
            for tonic in PitchClass::ALL {
                profiles.push(KeyProfile {
                    key: Key { tonic, mode },
                    profile: rotate(base, tonic.index()),
                });
            }
        }
        Self { profiles }
    }

    pub fn profiles(&self) -> &[KeyProfile] {
        &self.profiles
    }

    /// Names of all 24 keys in tie-break order
    pub fn key_names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.key.to_string()).collect()
    }
}

impl Default for KeyProfiles {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate a C-rooted profile so its tonic lands on `shift`
fn rotate(base: &ChromaVector, shift: usize) -> ChromaVector {
    let mut out = [0.0f32; 12];
    for (i, &v) in base.iter().enumerate() {
        out[(i + shift) % 12] = v;
    }
    out
}

/// Chosen key with its cosine similarity to the mean chroma
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEstimate {
    pub key: Key,
    pub similarity: f32,
}

/// Correlates a chroma profile against the key profiles
#[derive(Debug, Clone)]
pub struct KeyEstimator<'a> {
    profiles: &'a KeyProfiles,
}

impl<'a> KeyEstimator<'a> {
    pub fn new(profiles: &'a KeyProfiles) -> Self {
        Self { profiles }
    }

    /// Pick the key whose profile is most similar to the mean chroma.
    ///
    /// Ties go to the earlier key in profile order. Fails with
    /// `InvalidInput` on an empty matrix or one with no energy at all.
    pub fn estimate(&self, chroma: &ChromaMatrix) -> Result<KeyEstimate> {
        if chroma.is_empty() {
            return Err(AnalysisError::invalid_input(
                "cannot estimate key from an empty chroma matrix",
            ));
        }

        let mean = mean_vector(chroma.frames());
        let mut best: Option<KeyEstimate> = None;

        for profile in self.profiles.profiles() {
            let similarity = cosine_similarity(&mean, &profile.profile).ok_or_else(|| {
                AnalysisError::invalid_input("mean chroma has no energy; key is undefined")
            })?;

            if best.map_or(true, |b| similarity > b.similarity) {
                best = Some(KeyEstimate { key: profile.key, similarity });
            }
        }

        let best = best.ok_or_else(|| AnalysisError::invalid_input("no key profiles loaded"))?;
        log::debug!(
            "Estimated key {} (similarity {:.3}) from {} frames",
            best.key,
            best.similarity,
            chroma.num_frames()
        );
        Ok(best)
    }
}
