//! chordscope - Chord, key and beat analysis for audio files
//!
//! Usage: chordscope <FILES>... [--config analysis.toml] [--output out.json]

use anyhow::Result;
use chordscope_cli::output::{emit, render_reports, FileReport};
use chordscope_core::{audio, AnalysisConfig, Analyzer};
use clap::Parser;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "chordscope")]
#[command(about = "Estimate tempo, beats, key and chords of audio files", long_about = None)]
struct Args {
    /// Input audio files
    #[arg(required = true)]
    files: Vec<String>,

    /// Analysis configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write JSON to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit compact single-line JSON
    #[arg(long)]
    compact: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON on stdout)
    // Verbose: Info level on stderr
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let analyzer = Analyzer::new(config)?;

    let start = Instant::now();
    let reports: Vec<FileReport> = args
        .files
        .par_iter()
        .map(|file| FileReport::new(file, analyze_one(&analyzer, file)))
        .collect();

    let succeeded = reports.iter().filter(|r| r.is_ok()).count();
    log::info!(
        "Analyzed {}/{} files in {:.2}s",
        succeeded,
        reports.len(),
        start.elapsed().as_secs_f64()
    );

    let json = render_reports(&reports, args.compact)?;
    emit(&json, args.output.as_deref())?;

    if succeeded == 0 {
        anyhow::bail!("No file could be analyzed");
    }

    Ok(())
}

fn analyze_one(analyzer: &Analyzer, file: &str) -> Result<chordscope_core::AnalysisResult> {
    let audio_data = audio::load_mono(file, analyzer.config().sample_rate)?;
    log::info!(
        "Loaded {} ({:.1}s at {} Hz)",
        file,
        audio_data.duration_ms as f64 / 1000.0,
        audio_data.sample_rate
    );

    let result = analyzer.analyze(&audio_data.samples, audio_data.sample_rate)?;
    Ok(result)
}
