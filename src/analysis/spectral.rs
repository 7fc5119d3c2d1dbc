use crate::analysis::dsp::{self, Stft};
use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::rhythm_map::SpectralSummary;

/// Frame-wise spectral centroid, rolloff and zero-crossing statistics
pub struct SpectralAnalyzer {
    stft: Stft,
    frame_size: usize,
    hop_size: usize,
    rolloff_percent: f64,
}

impl SpectralAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            stft: Stft::new(config.frame_size, config.hop_size),
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            rolloff_percent: config.rolloff_percent,
        }
    }

    /// Reduce the buffer's spectral features to their means and the centroid variance
    pub fn analyze(&self, buffer: &SampleBuffer) -> Result<SpectralSummary> {
        if let Err(err) = dsp::require_frame("spectral_analyzer", buffer.len(), self.frame_size) {
            tracing::debug!("{}; reporting an empty spectral summary", err);
            return Ok(SpectralSummary::default());
        }

        let sample_rate = buffer.sample_rate();
        let mut centroids = Vec::new();
        let mut rolloffs = Vec::new();

        self.stft.for_each_magnitude(buffer.samples(), |_, magnitude| {
            let (centroid, rolloff) = self.centroid_and_rolloff(magnitude, sample_rate);
            centroids.push(centroid);
            rolloffs.push(rolloff);
        })?;

        let zero_crossings = dsp::zero_crossing_rates(buffer.samples(), self.frame_size, self.hop_size);

        let summary = SpectralSummary {
            avg_centroid: dsp::mean(&centroids),
            avg_rolloff: dsp::mean(&rolloffs),
            avg_zero_crossing_rate: dsp::mean(&zero_crossings),
            centroid_variance: dsp::variance(&centroids),
        };

        tracing::debug!(
            "Spectral analysis over {} frames: centroid {:.1} Hz, rolloff {:.1} Hz, zcr {:.4}",
            centroids.len(),
            summary.avg_centroid,
            summary.avg_rolloff,
            summary.avg_zero_crossing_rate
        );

        Ok(summary)
    }

    /// Centroid and rolloff frequency of one magnitude spectrum (both 0 when silent)
    fn centroid_and_rolloff(&self, magnitude: &[f32], sample_rate: u32) -> (f32, f32) {
        let total: f64 = magnitude.iter().map(|&m| m as f64).sum();
        if total <= 0.0 {
            return (0.0, 0.0);
        }

        let weighted: f64 = magnitude
            .iter()
            .enumerate()
            .map(|(bin, &m)| self.stft.bin_frequency(bin, sample_rate) * m as f64)
            .sum();

        let target = total * self.rolloff_percent;
        let mut cumulative = 0.0f64;
        let mut rolloff_bin = magnitude.len() - 1;
        for (bin, &m) in magnitude.iter().enumerate() {
            cumulative += m as f64;
            if cumulative >= target {
                rolloff_bin = bin;
                break;
            }
        }

        (
            (weighted / total) as f32,
            self.stft.bin_frequency(rolloff_bin, sample_rate) as f32,
        )
    }
}
