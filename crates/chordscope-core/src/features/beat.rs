//! Tempo estimation and beat tracking
//!
//! Onset strength is the mean positive change in log-power between
//! consecutive STFT frames. Tempo comes from the envelope's autocorrelation
//! weighted by a log-normal prior around `start_bpm`; beats come from the
//! Ellis (2007) dynamic-programming tracker.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::transform;

/// Dynamic range kept in the log-power spectrogram
const TOP_DB: f32 = 80.0;

/// Tempo and beat positions for one signal
#[derive(Debug, Clone, PartialEq)]
pub struct BeatAnalysis {
    /// Beats per minute; 0.0 when no periodicity was found
    pub tempo: f64,
    /// Strictly increasing beat times in seconds
    pub beats: Vec<f64>,
}

/// Tempo estimator and beat tracker
#[derive(Debug, Clone)]
pub struct BeatTracker {
    frame_size: usize,
    hop_length: usize,
    min_tempo: f64,
    max_tempo: f64,
    start_bpm: f64,
    tempo_std_octaves: f64,
    ac_window_s: f64,
    tightness: f64,
}

impl BeatTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            frame_size: config.onset_frame_size,
            hop_length: config.hop_length,
            min_tempo: config.min_tempo,
            max_tempo: config.max_tempo,
            start_bpm: config.start_bpm,
            tempo_std_octaves: config.tempo_std_octaves,
            ac_window_s: config.ac_window_s,
            tightness: config.tightness,
        }
    }

    /// Estimate tempo and track beats over the whole signal
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Result<BeatAnalysis> {
        let envelope = self.onset_envelope(samples)?;

        let tempo = match self.estimate_tempo(&envelope, sample_rate) {
            Some(bpm) => bpm,
            None => {
                log::debug!("No periodicity in onset envelope; reporting tempo 0 with no beats");
                return Ok(BeatAnalysis { tempo: 0.0, beats: Vec::new() });
            }
        };

        let frame_duration = self.hop_length as f64 / sample_rate as f64;
        let beats: Vec<f64> = self
            .track_beats(&envelope, tempo, sample_rate)
            .into_iter()
            .map(|frame| frame as f64 * frame_duration)
            .collect();

        log::debug!("Tempo {:.1} BPM, {} beats", tempo, beats.len());
        Ok(BeatAnalysis { tempo, beats })
    }

    /// Onset strength per centered frame. Frame 0 is always 0.
    pub fn onset_envelope(&self, samples: &[f32]) -> Result<Vec<f32>> {
        let spectrogram = transform::stft_magnitudes(samples, self.frame_size, self.hop_length)?;

        let mut log_power: Vec<Vec<f32>> = spectrogram
            .magnitudes
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|&m| 10.0 * (m * m).max(1e-10).log10())
                    .collect()
            })
            .collect();

        let max_db = log_power
            .iter()
            .flat_map(|f| f.iter())
            .cloned()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = max_db - TOP_DB;
        for frame in log_power.iter_mut() {
            frame.iter_mut().for_each(|v| *v = v.max(floor));
        }

        let mut envelope = vec![0.0f32; spectrogram.num_frames];
        for t in 1..spectrogram.num_frames {
            let rise: f32 = log_power[t]
                .iter()
                .zip(log_power[t - 1].iter())
                .map(|(&cur, &prev)| (cur - prev).max(0.0))
                .sum();
            envelope[t] = rise / spectrogram.num_bins as f32;
        }

        Ok(envelope)
    }

    /// Tempo from the autocorrelation of the onset envelope
    pub fn estimate_tempo(&self, envelope: &[f32], sample_rate: u32) -> Option<f64> {
        if envelope.len() < 3 {
            return None;
        }

        let frames_per_minute = 60.0 * sample_rate as f64 / self.hop_length as f64;
        let max_lag = ((self.ac_window_s * sample_rate as f64 / self.hop_length as f64).round() as usize)
            .min(envelope.len() - 1);

        let mean = envelope.iter().map(|&x| x as f64).sum::<f64>() / envelope.len() as f64;
        let centered: Vec<f64> = envelope.iter().map(|&x| x as f64 - mean).collect();
        let energy: f64 = centered.iter().map(|x| x * x).sum();
        if energy < 1e-10 {
            return None;
        }

        let n = centered.len();
        let mut best: Option<(usize, f64)> = None;

        for lag in 1..=max_lag {
            let bpm = frames_per_minute / lag as f64;
            if bpm < self.min_tempo || bpm > self.max_tempo {
                continue;
            }

            let corr: f64 = centered[..n - lag]
                .iter()
                .zip(centered[lag..].iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / energy;
            if corr <= 0.0 {
                continue;
            }

            let octaves = (bpm / self.start_bpm).log2() / self.tempo_std_octaves;
            let weighted = corr * (-0.5 * octaves * octaves).exp();

            if best.map_or(true, |(_, score)| weighted > score) {
                best = Some((lag, weighted));
            }
        }

        best.map(|(lag, score)| {
            log::trace!("Best tempo lag {} frames (weighted corr {:.4})", lag, score);
            frames_per_minute / lag as f64
        })
    }

    /// Beat frame indices for a known tempo
    pub fn track_beats(&self, envelope: &[f32], bpm: f64, sample_rate: u32) -> Vec<usize> {
        let n = envelope.len();
        if n == 0 || bpm <= 0.0 {
            return Vec::new();
        }

        let period = 60.0 * sample_rate as f64 / (self.hop_length as f64 * bpm);
        if period < 1.0 {
            return Vec::new();
        }

        let local = local_score(envelope, period);
        let max_local = local.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max_local <= 0.0 {
            return Vec::new();
        }

        // Predecessor search window, as negative offsets
        let far = (2.0 * period).round() as usize;
        let near = ((period / 2.0).round() as usize).max(1);
        let offsets: Vec<(usize, f64)> = (near..=far)
            .rev()
            .map(|back| {
                let ratio = back as f64 / period;
                (back, -self.tightness * ratio.ln().powi(2))
            })
            .collect();

        let mut cumscore = vec![0.0f64; n];
        let mut backlink: Vec<Option<usize>> = vec![None; n];
        let mut first_beat = true;

        for i in 0..n {
            // Offsets reaching before the signal start count as a beat at
            // cumulative score 0 with no backlink
            let mut best_score = f64::NEG_INFINITY;
            let mut best_prev = None;
            for &(back, cost) in &offsets {
                let (candidate, prev) = if back > i {
                    (cost, None)
                } else {
                    (cumscore[i - back] + cost, Some(i - back))
                };
                if candidate > best_score {
                    best_score = candidate;
                    best_prev = prev;
                }
            }

            cumscore[i] = local[i] + best_score;
            if first_beat && local[i] < 0.01 * max_local {
                backlink[i] = None;
            } else {
                backlink[i] = best_prev;
                first_beat = false;
            }
        }

        let Some(last) = last_beat(&cumscore) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        let mut cursor = last;
        while let Some(prev) = backlink[cursor] {
            beats.push(prev);
            cursor = prev;
        }
        beats.reverse();

        trim_weak_beats(beats, &local)
    }
}

/// Onset envelope normalized by its standard deviation and smoothed with a
/// Gaussian of width `period / 32`
fn local_score(envelope: &[f32], period: f64) -> Vec<f64> {
    let n = envelope.len() as f64;
    let mean = envelope.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = envelope.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    let scale = if std > 1e-12 { std } else { 1.0 };

    let half = period.round() as isize;
    let window: Vec<f64> = (-half..=half)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period).powi(2)).exp())
        .collect();

    let len = envelope.len() as isize;
    (0..len)
        .map(|i| {
            window
                .iter()
                .enumerate()
                .filter_map(|(w, &weight)| {
                    let j = i + w as isize - half;
                    (0..len).contains(&j).then(|| weight * envelope[j as usize] as f64 / scale)
                })
                .sum::<f64>()
        })
        .collect()
}

/// Last cumulative-score peak above half the median peak value
fn last_beat(cumscore: &[f64]) -> Option<usize> {
    let n = cumscore.len();
    if n == 0 {
        return None;
    }

    let peaks: Vec<usize> = (1..n.saturating_sub(1))
        .filter(|&i| cumscore[i] > cumscore[i - 1] && cumscore[i] >= cumscore[i + 1])
        .collect();

    if peaks.is_empty() {
        return cumscore
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i);
    }

    let mut values: Vec<f64> = peaks.iter().map(|&i| cumscore[i]).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if values.len() % 2 == 0 {
        (values[values.len() / 2 - 1] + values[values.len() / 2]) / 2.0
    } else {
        values[values.len() / 2]
    };
    let threshold = 0.5 * median;

    peaks.into_iter().rev().find(|&i| cumscore[i] >= threshold)
}

/// Drop leading and trailing beats with weak onset support
fn trim_weak_beats(beats: Vec<usize>, local: &[f64]) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }

    let rms = (beats.iter().map(|&b| local[b].powi(2)).sum::<f64>() / beats.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let start = beats.iter().position(|&b| local[b] > threshold);
    let end = beats.iter().rposition(|&b| local[b] > threshold);
    match (start, end) {
        (Some(s), Some(e)) => beats[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tracker() -> BeatTracker {
        BeatTracker::new(&AnalysisConfig::default())
    }

    /// Short decaying two-tone bursts every `step` samples
    fn click_track(sample_rate: u32, seconds: f32, step: usize) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        let mut samples = vec![0.0f32; n];
        let burst = (0.03 * sample_rate as f32) as usize;
        let mut start = step / 2;
        while start < n {
            for i in 0..burst.min(n - start) {
                let decay = (-(i as f32) / (burst as f32 / 5.0)).exp();
                let tone = (2.0 * PI * 1000.0 * i as f32 / sample_rate as f32).sin()
                    + (2.0 * PI * 3100.0 * i as f32 / sample_rate as f32).sin();
                samples[start + i] += 0.5 * decay * tone;
            }
            start += step;
        }
        samples
    }

    #[test]
    fn test_silence_has_no_tempo() {
        let analysis = tracker().analyze(&vec![0.0; 22050 * 2], 22050).unwrap();
        assert_eq!(analysis.tempo, 0.0);
        assert!(analysis.beats.is_empty());
    }

    #[test]
    fn test_click_track_tempo_and_beats() {
        let sr = 22050;
        // One click every 20 hops -> 129.2 BPM
        let samples = click_track(sr, 10.0, 20 * 512);
        let interval = 20.0 * 512.0 / sr as f64;
        let analysis = tracker().analyze(&samples, sr).unwrap();

        assert!((analysis.tempo - 129.2).abs() < 1.0, "tempo {}", analysis.tempo);
        assert!(analysis.beats.len() >= 12, "beats {:?}", analysis.beats);
        for pair in analysis.beats.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!((pair[1] - pair[0] - interval).abs() < 0.1);
        }
        assert!(analysis.beats[0] >= 0.0);
    }

    #[test]
    fn test_onset_envelope_peaks_at_clicks() {
        let sr = 22050;
        let samples = click_track(sr, 3.0, sr as usize);
        let envelope = tracker().onset_envelope(&samples).unwrap();
        assert_eq!(envelope[0], 0.0);

        // First click at 0.5s -> frame ~21
        let peak = envelope
            .iter()
            .enumerate()
            .take(40)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i64 - 21).abs() <= 3, "peak at {}", peak);
    }

    #[test]
    fn test_estimate_tempo_on_synthetic_envelope() {
        // Impulse every 20 frames at 22050/512 -> 129.2 BPM
        let mut envelope = vec![0.0f32; 800];
        for i in (0..800).step_by(20) {
            envelope[i] = 1.0;
        }
        let bpm = tracker().estimate_tempo(&envelope, 22050).unwrap();
        assert!((bpm - 129.2).abs() < 1.0, "bpm {}", bpm);
    }

    #[test]
    fn test_track_beats_follows_impulses() {
        let mut envelope = vec![0.0f32; 600];
        for i in (10..600).step_by(20) {
            envelope[i] = 1.0;
        }
        let beats = tracker().track_beats(&envelope, 60.0 * 22050.0 / 512.0 / 20.0, 22050);
        assert!(beats.len() >= 25);
        for b in &beats {
            assert_eq!((b + 10) % 20, 0, "beat off-grid at {}", b);
        }
    }
}
