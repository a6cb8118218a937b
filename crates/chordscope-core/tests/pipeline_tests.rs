//! End-to-end tests on synthetic signals

use approx::assert_relative_eq;
use chordscope_core::{
    analyze_file, AnalysisConfig, AnalysisError, AnalysisResult, Analyzer, Stage,
};
use std::f32::consts::PI;
use std::sync::Arc;

const SR: u32 = 22050;

fn tones(freqs: &[f32], sample_rate: u32, seconds: f32) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            freqs.iter().map(|f| 0.3 * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

/// Decaying 1 kHz + 3.1 kHz bursts every `step` samples
fn click_track(sample_rate: u32, seconds: f32, step: usize) -> Vec<f32> {
    let n = (sample_rate as f32 * seconds) as usize;
    let mut samples = vec![0.0f32; n];
    let burst = (0.03 * sample_rate as f32) as usize;
    let mut start = step / 2;
    while start < n {
        for i in 0..burst.min(n - start) {
            let decay = (-(i as f32) / (burst as f32 / 5.0)).exp();
            let t = i as f32 / sample_rate as f32;
            let tone = (2.0 * PI * 1000.0 * t).sin() + (2.0 * PI * 3100.0 * t).sin();
            samples[start + i] += 0.5 * decay * tone;
        }
        start += step;
    }
    samples
}

fn analyzer() -> Analyzer {
    Analyzer::new(AnalysisConfig::default()).unwrap()
}

fn assert_well_formed(result: &AnalysisResult) {
    for pair in result.beats.windows(2) {
        assert!(pair[1] > pair[0], "beats not increasing: {:?}", result.beats);
    }
    for chord in &result.chords {
        assert!(chord.end_time > chord.start_time);
        assert!((0.0..=1.0).contains(&chord.confidence));
        assert_eq!(chord.inversion, 0);
        assert!(!chord.notes.is_empty());
    }
    for pair in result.chords.windows(2) {
        assert_ne!(pair[0].label, pair[1].label);
        assert!(pair[1].start_time >= pair[0].end_time - 1e-9);
    }
}

#[test]
fn test_a440_sine() {
    let result = analyzer().analyze(&tones(&[440.0], SR, 4.0), SR).unwrap();

    assert_relative_eq!(result.duration, 4.0, epsilon = 1e-6);
    assert!(
        result.key == "A Major" || result.key == "A Minor",
        "key was {}",
        result.key
    );
    assert!(!result.chords.is_empty());
    assert_eq!(result.chords[0].start_time, 0.0);
    assert_well_formed(&result);
}

#[test]
fn test_c_major_triad() {
    let result = analyzer()
        .analyze(&tones(&[261.63, 329.63, 392.0], SR, 3.0), SR)
        .unwrap();

    assert_eq!(result.key, "C Major");
    assert_eq!(result.chords[0].label, "C maj");
    assert_eq!(result.chords[0].notes, vec![60, 64, 67]);
    assert!(result.chords[0].confidence > 0.9);
    assert_well_formed(&result);
}

#[test]
fn test_click_track_tempo() {
    // One click every 20 hops of 512 samples -> 129.2 BPM
    let result = analyzer()
        .analyze(&click_track(SR, 10.0, 20 * 512), SR)
        .unwrap();

    assert!((result.tempo - 129.2).abs() < 2.0, "tempo {}", result.tempo);
    assert!(result.beats.len() >= 10, "beats {:?}", result.beats);
    assert!(result.beats.iter().all(|&b| b >= 0.0 && b <= result.duration));
    assert_well_formed(&result);
}

#[test]
fn test_silence_fails_at_chroma() {
    let err = analyzer().analyze(&vec![0.0; SR as usize * 2], SR).unwrap_err();

    match err {
        AnalysisError::AnalysisFailed { stage, ref source } => {
            assert_eq!(stage, Stage::Chroma);
            assert!(source.is_invalid_input());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_empty_signal_fails_validation() {
    let err = analyzer().analyze(&[], SR).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));
}

#[test]
fn test_result_json_fields() {
    let result = analyzer()
        .analyze(&tones(&[261.63, 329.63, 392.0], SR, 2.0), SR)
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();

    let object = json.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["beats", "chords", "duration", "key", "tempo"]);

    let chord = json["chords"][0].as_object().unwrap();
    for field in [
        "start_time",
        "end_time",
        "label",
        "root",
        "quality",
        "inversion",
        "confidence",
        "notes",
    ] {
        assert!(chord.contains_key(field), "missing {}", field);
    }

    let back: AnalysisResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_repeated_analysis_is_identical() {
    let samples = click_track(SR, 4.0, 20 * 512);
    let analyzer = analyzer();
    assert_eq!(
        analyzer.analyze(&samples, SR).unwrap(),
        analyzer.analyze(&samples, SR).unwrap()
    );
}

#[test]
fn test_concurrent_jobs() {
    let analyzer = Arc::new(analyzer());
    let inputs = [
        tones(&[440.0], SR, 2.0),
        tones(&[261.63, 329.63, 392.0], SR, 2.0),
        click_track(SR, 3.0, 20 * 512),
    ];

    let expected: Vec<AnalysisResult> = inputs
        .iter()
        .map(|s| analyzer.analyze(s, SR).unwrap())
        .collect();
    let jobs: Vec<_> = inputs
        .iter()
        .map(|s| analyzer.spawn(s.clone(), SR))
        .collect();

    for (job, expected) in jobs.into_iter().zip(expected) {
        assert_eq!(job.wait().unwrap(), expected);
    }
}

#[test]
fn test_analyze_wav_file_with_resampling() {
    let path = std::env::temp_dir().join("chordscope_pipeline_triad.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for s in tones(&[261.63, 329.63, 392.0], 44100, 3.0) {
        let v = (s * i16::MAX as f32) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();

    let result = analyze_file(path.to_str().unwrap(), &AnalysisConfig::default()).unwrap();
    assert_eq!(result.key, "C Major");
    assert!((result.duration - 3.0).abs() < 0.05, "duration {}", result.duration);
    assert_well_formed(&result);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_analyze_missing_file() {
    assert!(analyze_file("/nonexistent/missing.wav", &AnalysisConfig::default()).is_err());
}
