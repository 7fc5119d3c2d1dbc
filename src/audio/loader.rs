use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer as InterleavedSamples;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::types::SampleBuffer;
use crate::error::{AudioError, Result};

/// Produces analysis-ready mono buffers from encoded audio
///
/// The analysis core only ever sees the resulting [`SampleBuffer`]; plug in a
/// different implementation to decode from memory or a remote store.
pub trait AudioDecoder {
    fn decode(&self, path: &Path) -> Result<SampleBuffer>;
}

/// File decoder supporting WAV (hound) and compressed formats (symphonia)
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioLoader;

impl AudioLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load WAV files using the hound crate (most reliable for WAV)
    fn load_wav(path: &Path) -> Result<SampleBuffer> {
        let reader = hound::WavReader::open(path)
            .map_err(|_| load_failed(path))?;

        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| load_failed(path))?,
            hound::SampleFormat::Int => {
                let bit_depth = spec.bits_per_sample;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|s| Self::int_to_float(s, bit_depth)))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| load_failed(path))?
            }
        };

        tracing::debug!(
            "Decoded WAV {:?}: {} Hz, {} channels, {} bits",
            path, spec.sample_rate, spec.channels, spec.bits_per_sample
        );

        SampleBuffer::from_interleaved(&samples, spec.channels, spec.sample_rate)
    }

    /// Load compressed formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<SampleBuffer> {
        let file = File::open(path).map_err(|_| load_failed(path))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &fmt_opts, &meta_opts)
            .map_err(|_| load_failed(path))?;

        let mut format = probed.format;

        // First audio track with a decodable codec
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| load_failed(path))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate
            .ok_or_else(|| AudioError::InvalidParameters {
                details: "No sample rate found".to_string()
            })?;

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &dec_opts)
            .map_err(|_| load_failed(path))?;

        let mut samples = Vec::new();
        let mut channels: Option<u16> = None;
        let mut scratch: Option<InterleavedSamples<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream
                Err(SymphoniaError::IoError(_)) => break,
                Err(err) => {
                    tracing::warn!("Stopping decode of {:?}: {}", path, err);
                    break;
                }
            };

            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(err)) => {
                    tracing::warn!("Skipping corrupt packet in {:?}: {}", path, err);
                    continue;
                }
                Err(SymphoniaError::IoError(_)) => break,
                Err(_) => break,
            };

            let spec = *decoded.spec();
            channels.get_or_insert(spec.channels.count() as u16);

            // Decoders report their maximum packet size, so one scratch buffer fits all
            if scratch.is_none() {
                scratch = Some(InterleavedSamples::new(decoded.capacity() as u64, spec));
            }

            if let Some(buffer) = scratch.as_mut() {
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
        }

        let channels = channels.ok_or_else(|| load_failed(path))?;

        tracing::debug!(
            "Decoded {:?} with symphonia: {} Hz, {} channels",
            path, sample_rate, channels
        );

        SampleBuffer::from_interleaved(&samples, channels, sample_rate)
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    ///
    /// hound already shifts unsigned 8-bit samples to signed.
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}

impl AudioDecoder for AudioLoader {
    fn decode(&self, path: &Path) -> Result<SampleBuffer> {
        let extension = Self::detect_format(path).unwrap_or_default();

        match extension.as_str() {
            "wav" => Self::load_wav(path),
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::load_with_symphonia(path),
            _ => Err(AudioError::UnsupportedFormat {
                format: extension
            }.into()),
        }
    }
}

fn load_failed(path: &Path) -> AudioError {
    AudioError::LoadFailed {
        path: path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RhythmError;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioLoader::detect_format("test.wav"), Some("wav".to_string()));
        assert_eq!(AudioLoader::detect_format("test.MP3"), Some("mp3".to_string()));
        assert_eq!(AudioLoader::detect_format("test"), None);
    }

    #[test]
    fn test_format_support() {
        assert!(AudioLoader::is_format_supported("wav"));
        assert!(AudioLoader::is_format_supported("FLAC"));
        assert!(!AudioLoader::is_format_supported("xyz"));
    }

    #[test]
    fn test_int_to_float_conversion() {
        assert_eq!(AudioLoader::int_to_float(0, 16), 0.0);
        assert_eq!(AudioLoader::int_to_float(-32768, 16), -1.0);
        assert_eq!(AudioLoader::int_to_float(-128, 8), -1.0);
        assert_eq!(AudioLoader::int_to_float(64, 8), 0.5);
        assert_eq!(AudioLoader::int_to_float(1 << 23, 32), 1.0 / 256.0);
    }

    #[test]
    fn test_unsupported_format() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test.xyz");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"dummy content").unwrap();

        match AudioLoader::new().decode(&file_path) {
            Err(RhythmError::Audio(AudioError::UnsupportedFormat { format })) => {
                assert_eq!(format, "xyz")
            }
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_wav_fails_to_load() {
        let temp_dir = tempdir().unwrap();
        let result = AudioLoader::new().decode(&temp_dir.path().join("missing.wav"));
        assert!(matches!(result, Err(RhythmError::Audio(AudioError::LoadFailed { .. }))));
    }

    #[test]
    fn test_decode_stereo_wav_to_mono() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("stereo.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&file_path, spec).unwrap();
        for _ in 0..8000 {
            writer.write_sample(16384i16).unwrap(); // L = 0.5
            writer.write_sample(0i16).unwrap(); // R = 0.0
        }
        writer.finalize().unwrap();

        let buffer = AudioLoader::new().decode(&file_path).unwrap();
        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.len(), 8000);
        assert_eq!(buffer.duration(), 0.5);
        assert!(buffer.samples().iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }
}
