//! Whole-file audio decoding to a normalized mono sample sequence

use crate::audio::mix;
use crate::error::{Result, StripError};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

/// A fully decoded audio file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples, peak-normalized unless the file is silent
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before down-mixing
    pub source_channels: usize,
    /// Whether peak normalization was skipped for an all-zero input
    pub silent: bool,
}

impl DecodedAudio {
    /// Build from already decoded mono samples, applying peak normalization
    pub fn from_mono(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        let silent = mix::normalize_peak(&mut samples).is_none();
        Self {
            samples,
            sample_rate,
            source_channels: 1,
            silent,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file into mono samples
///
/// Multi-channel input is averaged to mono, then scaled so the peak reaches
/// full scale. Corrupt packets are skipped; an unreadable container or a file
/// with no audio is a decode error.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path).map_err(|e| StripError::decode(path, e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let opened = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| StripError::decode(path, e.to_string()))?;
    let mut format = opened.format;

    let track = format
        .default_track()
        .ok_or_else(|| StripError::decode(path, "no default audio track"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| StripError::decode(path, e.to_string()))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut mono = Vec::new();
    let mut sample_buf: Option<(SampleBuffer<f32>, SignalSpec, usize)> = None;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(StripError::decode(path, e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                debug!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(SymphoniaError::IoError(_)) => {
                skipped_packets += 1;
                continue;
            }
            Err(e) => return Err(StripError::decode(path, e.to_string())),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity();
        if frames == 0 {
            continue;
        }

        let reuse = matches!(&sample_buf, Some((_, s, cap)) if *s == spec && *cap >= frames);
        if !reuse {
            sample_buf = Some((SampleBuffer::<f32>::new(frames as u64, spec), spec, frames));
        }
        let Some((buf, _, _)) = sample_buf.as_mut() else {
            continue;
        };

        buf.copy_interleaved_ref(decoded);
        let channels = spec.channels.count();
        sample_rate = spec.rate;
        source_channels = channels;
        mono.extend(mix::downmix_to_mono(buf.samples(), channels));
    }

    if skipped_packets > 0 {
        warn!("Skipped {} undecodable packets in {}", skipped_packets, path.display());
    }
    if mono.is_empty() {
        return Err(StripError::decode(path, "file contains no audio samples"));
    }
    if sample_rate == 0 {
        return Err(StripError::decode(path, "unknown sample rate"));
    }

    let mut audio = DecodedAudio::from_mono(mono, sample_rate);
    audio.source_channels = source_channels;

    if audio.silent {
        info!("Input is silent, skipping normalization");
    }
    info!(
        "Decoded {}: {} samples @ {}Hz ({}ch -> mono, {:.2}s)",
        path.display(),
        audio.samples.len(),
        audio.sample_rate,
        audio.source_channels,
        audio.duration_secs()
    );

    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_stereo_is_mixed_and_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        // Frames: (L, R) averaged -> 0.25, -0.125 of full scale before normalizing
        write_wav(&path, 2, 22_050, &[16384, 0, -8192, 0]);

        let audio = decode_file(&path).unwrap();
        assert_eq!(audio.sample_rate, 22_050);
        assert_eq!(audio.source_channels, 2);
        assert_eq!(audio.samples.len(), 2);
        assert!(!audio.silent);
        assert!((audio.samples[0] - 1.0).abs() < 1e-6);
        assert!((audio.samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_silent_file_is_not_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 1, 8_000, &[0; 800]);

        let audio = decode_file(&path).unwrap();
        assert!(audio.silent);
        assert_eq!(audio.samples.len(), 800);
        assert!(audio.samples.iter().all(|s| *s == 0.0));
        assert!((audio.duration_secs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = decode_file(Path::new("/nonexistent/track.wav")).unwrap_err();
        assert!(matches!(err, StripError::Decode { .. }));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        let err = decode_file(&path).unwrap_err();
        assert!(matches!(err, StripError::Decode { .. }));
    }

    #[test]
    fn test_from_mono_duration() {
        let audio = DecodedAudio::from_mono(vec![0.5; 4410], 44_100);
        assert!((audio.duration_secs() - 0.1).abs() < 1e-9);
        assert!(audio.samples.iter().all(|s| *s == 1.0));
    }
}
