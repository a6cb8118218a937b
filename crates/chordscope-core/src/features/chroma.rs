//! Chroma extraction
//!
//! Folds STFT energy between `min_freq` and `max_freq` into 12 pitch classes
//! and normalizes each frame by its peak bin.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::pitch::{ChromaVector, NUM_PITCH_CLASSES};
use crate::transform::{self, Spectrogram};

/// Pitch class of the tuning reference (A)
const REF_PITCH_CLASS: i64 = 9;

/// Frames whose peak falls below this are treated as silent
const SILENCE_FLOOR: f32 = 1e-10;

/// One chroma vector per hop, plus the framing that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaMatrix {
    frames: Vec<ChromaVector>,
    sample_rate: u32,
    hop_length: usize,
}

impl ChromaMatrix {
    pub fn new(frames: Vec<ChromaVector>, sample_rate: u32, hop_length: usize) -> Self {
        Self {
            frames,
            sample_rate,
            hop_length,
        }
    }

    pub fn frames(&self) -> &[ChromaVector] {
        &self.frames
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Start time of a frame in seconds
    pub fn frame_to_time(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_length as f64 / self.sample_rate as f64
    }

    /// Frame containing time `t` (floor), not clamped
    pub fn time_to_frame(&self, t: f64) -> usize {
        (t.max(0.0) * self.sample_rate as f64 / self.hop_length as f64).floor() as usize
    }

    /// Sum of chroma energy in each pitch class over all frames
    pub fn total_energy(&self) -> ChromaVector {
        let mut total = [0.0f32; NUM_PITCH_CLASSES];
        for frame in &self.frames {
            for (t, v) in total.iter_mut().zip(frame.iter()) {
                *t += v;
            }
        }
        total
    }
}

/// Extract a chroma matrix from mono samples
pub fn extract_chroma(samples: &[f32], sample_rate: u32, config: &AnalysisConfig) -> Result<ChromaMatrix> {
    log::debug!(
        "Extracting chroma: {} samples at {} Hz (frame={}, hop={})",
        samples.len(),
        sample_rate,
        config.chroma_frame_size,
        config.hop_length
    );

    let spectrogram = transform::stft_magnitudes(samples, config.chroma_frame_size, config.hop_length)?;
    let bin_classes = pitch_class_map(&spectrogram, sample_rate, config);

    let mut silent_frames = 0usize;
    let frames: Vec<ChromaVector> = spectrogram
        .magnitudes
        .iter()
        .map(|frame| {
            let chroma = fold_frame(frame, &bin_classes);
            if chroma.iter().all(|&v| v == 0.0) {
                silent_frames += 1;
            }
            chroma
        })
        .collect();

    if silent_frames == frames.len() {
        return Err(AnalysisError::invalid_input(
            "signal is silent; chroma has no energy in any frame",
        ));
    }

    log::debug!(
        "Chroma: {} frames ({} silent)",
        frames.len(),
        silent_frames
    );

    Ok(ChromaMatrix::new(frames, sample_rate, config.hop_length))
}

/// Pitch class for every FFT bin, `None` outside the analysis band
fn pitch_class_map(spectrogram: &Spectrogram, sample_rate: u32, config: &AnalysisConfig) -> Vec<Option<usize>> {
    let nyquist = sample_rate as f32 / 2.0;
    let max_freq = config.max_freq.min(nyquist);

    (0..spectrogram.num_bins)
        .map(|bin| {
            let freq = spectrogram.bin_frequency(bin, sample_rate);
            if freq < config.min_freq || freq > max_freq {
                return None;
            }
            let semitones = (12.0 * (freq / config.ref_freq).log2()).round() as i64;
            Some((semitones + REF_PITCH_CLASS).rem_euclid(NUM_PITCH_CLASSES as i64) as usize)
        })
        .collect()
}

/// Accumulate bin power into pitch classes, then peak-normalize
fn fold_frame(magnitudes: &[f32], bin_classes: &[Option<usize>]) -> ChromaVector {
    let mut chroma = [0.0f32; NUM_PITCH_CLASSES];
    for (mag, class) in magnitudes.iter().zip(bin_classes.iter()) {
        if let Some(pc) = class {
            chroma[*pc] += mag * mag;
        }
    }

    let peak = chroma.iter().cloned().fold(0.0f32, f32::max);
    if peak < SILENCE_FLOOR {
        return [0.0; NUM_PITCH_CLASSES];
    }
    chroma.iter_mut().for_each(|v| *v /= peak);
    chroma
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::PitchClass;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn dominant(chroma: &ChromaMatrix) -> PitchClass {
        let total = chroma.total_energy();
        let idx = total
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        PitchClass::from_index(idx)
    }

    #[test]
    fn test_a440_concentrates_on_a() {
        let config = AnalysisConfig::default();
        let samples = sine(440.0, 22050, 2.0);
        let chroma = extract_chroma(&samples, 22050, &config).unwrap();

        assert_eq!(chroma.num_frames(), 1 + samples.len() / 512);
        assert_eq!(dominant(&chroma), PitchClass::A);
    }

    #[test]
    fn test_middle_c_concentrates_on_c() {
        let config = AnalysisConfig::default();
        let chroma = extract_chroma(&sine(261.63, 22050, 1.0), 22050, &config).unwrap();
        assert_eq!(dominant(&chroma), PitchClass::C);
    }

    #[test]
    fn test_frames_are_peak_normalized() {
        let config = AnalysisConfig::default();
        let chroma = extract_chroma(&sine(329.63, 22050, 1.0), 22050, &config).unwrap();
        for frame in chroma.frames() {
            let peak = frame.iter().cloned().fold(0.0f32, f32::max);
            assert!(peak == 0.0 || (peak - 1.0).abs() < 1e-6);
            assert!(frame.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_silent_signal_is_invalid_input() {
        let config = AnalysisConfig::default();
        let err = extract_chroma(&vec![0.0; 22050], 22050, &config).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_time_frame_conversion() {
        let chroma = ChromaMatrix::new(vec![[0.0; 12]; 10], 22050, 512);
        assert_eq!(chroma.time_to_frame(1.0), 43);
        assert!((chroma.frame_to_time(43) - 43.0 * 512.0 / 22050.0).abs() < 1e-12);
        assert_eq!(chroma.time_to_frame(-0.5), 0);
    }
}
