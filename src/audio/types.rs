use crate::error::{AnalysisError, Result};

/// Decoded mono PCM audio ready for analysis
///
/// A buffer is always non-empty, has a positive sample rate and contains only
/// finite samples. Amplitudes are nominally within [-1.0, 1.0] but louder
/// input is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap mono samples, rejecting buffers that cannot be analyzed
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() {
            return Err(invalid("buffer contains no samples"));
        }

        if sample_rate == 0 {
            return Err(invalid("sample rate must be positive"));
        }

        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(invalid(format!("sample {} is not finite", index)));
        }

        let buffer = Self { samples, sample_rate };
        let peak = buffer.peak();
        if peak > 1.0 {
            tracing::warn!("Sample buffer exceeds nominal range (peak {:.3})", peak);
        }

        Ok(buffer)
    }

    /// Downmix interleaved multi-channel samples by averaging each frame
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(invalid("channel count must be positive"));
        }

        if channels == 1 {
            return Self::new(samples.to_vec(), sample_rate);
        }

        let mono = samples
            .chunks_exact(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        Self::new(mono, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.time_for_sample(self.samples.len())
    }

    /// Get time in seconds for a sample index
    pub fn time_for_sample(&self, sample_index: usize) -> f64 {
        sample_index as f64 / self.sample_rate as f64
    }

    /// Get time in seconds for an analysis frame index
    pub fn time_for_frame(&self, frame_index: usize, hop_size: usize) -> f64 {
        self.time_for_sample(frame_index * hop_size)
    }

    /// Largest absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }
}

fn invalid<S: Into<String>>(reason: S) -> crate::error::RhythmError {
    AnalysisError::InvalidBuffer { reason: reason.into() }.into()
}
