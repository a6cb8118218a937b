//! Short-time Fourier transform
//!
//! Centered, Hann-windowed frames: frame `t` is centered on sample
//! `t * hop_size`, so frame indices convert to seconds as `t * hop / sr`.

use crate::error::{AnalysisError, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Magnitude spectrogram
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Magnitude values [time_frame][frequency_bin]
    pub magnitudes: Vec<Vec<f32>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins (`frame_size / 2 + 1`)
    pub num_bins: usize,
    /// FFT size used to build the frames
    pub frame_size: usize,
}

impl Spectrogram {
    /// Center frequency of an FFT bin in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.frame_size as f32
    }
}

/// Number of centered frames covering `num_samples`
pub fn num_frames(num_samples: usize, hop_size: usize) -> usize {
    1 + num_samples / hop_size
}

/// Compute the STFT magnitude of `samples`
pub fn stft_magnitudes(samples: &[f32], frame_size: usize, hop_size: usize) -> Result<Spectrogram> {
    if samples.is_empty() {
        return Err(AnalysisError::invalid_input("cannot transform an empty signal"));
    }
    if frame_size < 2 || hop_size == 0 {
        return Err(AnalysisError::invalid_input(format!(
            "invalid framing: frame_size={}, hop_size={}",
            frame_size, hop_size
        )));
    }

    let num_frames = num_frames(samples.len(), hop_size);
    let num_bins = frame_size / 2 + 1;
    let pad = frame_size / 2;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(frame_size);
    let window = create_hann_window(frame_size);

    let mut magnitudes = Vec::with_capacity(num_frames);
    let mut frame = vec![Complex::new(0.0f32, 0.0); frame_size];

    for frame_idx in 0..num_frames {
        // Window position in the zero-padded signal
        let origin = (frame_idx * hop_size) as isize - pad as isize;

        for (i, slot) in frame.iter_mut().enumerate() {
            let pos = origin + i as isize;
            let sample = if pos >= 0 && (pos as usize) < samples.len() {
                samples[pos as usize]
            } else {
                0.0
            };
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut frame);
        magnitudes.push(frame[..num_bins].iter().map(|c| c.norm()).collect());
    }

    log::trace!(
        "STFT: {} frames x {} bins (frame_size={}, hop={})",
        num_frames,
        num_bins,
        frame_size,
        hop_size
    );

    Ok(Spectrogram {
        magnitudes,
        num_frames,
        num_bins,
        frame_size,
    })
}

/// Periodic Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = create_hann_window(512);
        assert_eq!(window.len(), 512);
        assert!((window[0] - 0.0).abs() < 0.001);
        assert!((window[256] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_frame_count_is_centered() {
        let samples = vec![0.0; 22050];
        let spec = stft_magnitudes(&samples, 2048, 512).unwrap();
        assert_eq!(spec.num_frames, 1 + 22050 / 512);
        assert_eq!(spec.num_bins, 1025);
        assert_eq!(spec.magnitudes[0].len(), 1025);
    }

    #[test]
    fn test_sine_peaks_at_expected_bin() {
        let sr = 22050u32;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let spec = stft_magnitudes(&samples, 2048, 512).unwrap();

        let frame = &spec.magnitudes[spec.num_frames / 2];
        let peak = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((spec.bin_frequency(peak, sr) - freq).abs() < 11.0);
    }

    #[test]
    fn test_empty_signal_rejected() {
        assert!(stft_magnitudes(&[], 2048, 512).is_err());
    }
}
