//! Audio decoding and resampling
//!
//! Supports WAV, MP3, FLAC and OGG with dedicated pure Rust decoders, and
//! anything else Symphonia can probe (M4A/AAC, MP4, MKV) as a fallback.

mod decoder;
mod resample;
mod container;

pub use decoder::{decode_audio, load_mono, AudioData};
pub use resample::resample_to_target;
pub use container::decode_container;

use std::path::Path;

/// Container formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,

    // Decoded through Symphonia
    Mp4,
    Aac,
    Mkv,

    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") | Some("oga") => AudioFormat::Ogg,
            Some("mp4") | Some("m4a") | Some("m4v") | Some("mov") => AudioFormat::Mp4,
            Some("aac") => AudioFormat::Aac,
            Some("mkv") | Some("mka") | Some("webm") => AudioFormat::Mkv,
            _ => AudioFormat::Unknown,
        }
    }

    /// Whether this format goes through Symphonia instead of a dedicated decoder
    pub fn uses_symphonia(&self) -> bool {
        matches!(self, AudioFormat::Mp4 | AudioFormat::Aac | AudioFormat::Mkv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioFormat::from_path(Path::new("song.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("song.MP3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("a/b/track.flac")), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_path(Path::new("x.m4a")), AudioFormat::Mp4);
        assert_eq!(AudioFormat::from_path(Path::new("noext")), AudioFormat::Unknown);
        assert!(AudioFormat::Mkv.uses_symphonia());
        assert!(!AudioFormat::Ogg.uses_symphonia());
    }
}
