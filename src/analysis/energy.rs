use crate::analysis::dsp;
use crate::audio::SampleBuffer;
use crate::config::{AnalysisConfig, EnergyReference};
use crate::rhythm_map::{EmphasisKind, EmphasisPoint, EnergyProfilePoint};

/// Frame energies and everything derived from them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyAnalysis {
    /// RMS of every analysis frame
    pub rms_frames: Vec<f32>,

    /// Mean energy per profile window
    pub energy_profile: Vec<EnergyProfilePoint>,

    /// Loudness peaks of the smoothed RMS curve
    pub emphasis_points: Vec<EmphasisPoint>,

    /// Smoothed-RMS level an emphasis peak had to exceed
    pub emphasis_threshold: f64,
}

/// Short-time energy analysis: energy profile and emphasis detection
pub struct EnergyAnalyzer {
    frame_size: usize,
    hop_size: usize,
    profile_window: f64,
    reference: EnergyReference,
    emphasis_sigma: f64,
    emphasis_deviations: f64,
    emphasis_min_spacing: f64,
}

impl EnergyAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            profile_window: config.profile_window,
            reference: config.energy_reference,
            emphasis_sigma: config.emphasis_sigma,
            emphasis_deviations: config.emphasis_deviations,
            emphasis_min_spacing: config.emphasis_min_spacing,
        }
    }

    /// Compute RMS frames, the energy profile and emphasis points
    ///
    /// A buffer shorter than one frame yields an empty analysis.
    pub fn compute(&self, buffer: &SampleBuffer) -> EnergyAnalysis {
        if let Err(err) = dsp::require_frame("energy_analyzer", buffer.len(), self.frame_size) {
            tracing::debug!("{}; skipping energy analysis", err);
            return EnergyAnalysis::default();
        }

        let rms_frames = dsp::rms_frames(buffer.samples(), self.frame_size, self.hop_size);
        let energy_profile = self.energy_profile(&rms_frames, buffer);
        let (emphasis_points, emphasis_threshold) = self.emphasis_points(&rms_frames, buffer);

        tracing::debug!(
            "Energy analysis: {} frames, {} profile points, {} emphasis points (threshold {:.4})",
            rms_frames.len(),
            energy_profile.len(),
            emphasis_points.len(),
            emphasis_threshold
        );

        EnergyAnalysis {
            rms_frames,
            energy_profile,
            emphasis_points,
            emphasis_threshold,
        }
    }

    /// Frames per profile bin, truncated, at least one
    fn frames_per_bin(&self, sample_rate: u32) -> usize {
        ((self.profile_window * sample_rate as f64 / self.hop_size as f64) as usize).max(1)
    }

    /// Minimum emphasis separation in frames, rounded up so the spacing in
    /// seconds never drops below the configured value
    fn min_peak_distance(&self, sample_rate: u32) -> usize {
        (self.emphasis_min_spacing * sample_rate as f64 / self.hop_size as f64).ceil() as usize
    }

    fn energy_profile(&self, rms: &[f32], buffer: &SampleBuffer) -> Vec<EnergyProfilePoint> {
        let frames_per_bin = self.frames_per_bin(buffer.sample_rate());

        let bins: Vec<(usize, f64)> = rms
            .chunks(frames_per_bin)
            .enumerate()
            .map(|(i, chunk)| (i * frames_per_bin, dsp::mean(chunk)))
            .collect();

        let reference = match self.reference {
            EnergyReference::FramePeak => rms.iter().fold(0.0f32, |acc, &x| acc.max(x)) as f64,
            EnergyReference::ProfilePeak => bins.iter().fold(0.0f64, |acc, &(_, e)| acc.max(e)),
        };

        bins.into_iter()
            .map(|(frame, energy)| EnergyProfilePoint {
                timestamp: buffer.time_for_frame(frame, self.hop_size),
                energy,
                relative_energy: if reference > 0.0 {
                    (energy / reference).clamp(0.0, 1.0)
                } else {
                    0.0
                },
            })
            .collect()
    }

    fn emphasis_points(&self, rms: &[f32], buffer: &SampleBuffer) -> (Vec<EmphasisPoint>, f64) {
        let smoothed = dsp::gaussian_smooth(rms, self.emphasis_sigma);
        let threshold =
            dsp::mean(&smoothed) + self.emphasis_deviations * dsp::variance(&smoothed).sqrt();
        let distance = self.min_peak_distance(buffer.sample_rate());

        let points = dsp::find_peaks(&smoothed, threshold, distance)
            .into_iter()
            .map(|frame| EmphasisPoint {
                timestamp: buffer.time_for_frame(frame, self.hop_size),
                intensity: smoothed[frame] as f64,
                kind: EmphasisKind::VocalEmphasis,
            })
            .collect();

        (points, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 22050;

    fn analyzer() -> EnergyAnalyzer {
        EnergyAnalyzer::new(&AnalysisConfig::default())
    }

    fn tone(seconds: f64, amplitude: f32) -> Vec<f32> {
        (0..(seconds * SAMPLE_RATE as f64) as usize)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                amplitude * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_short_buffer_yields_empty_analysis() {
        let buffer = SampleBuffer::new(vec![0.5; 1000], SAMPLE_RATE).unwrap();
        assert_eq!(analyzer().compute(&buffer), EnergyAnalysis::default());
    }

    #[test]
    fn test_silent_buffer_has_zero_relative_energy() {
        let buffer = SampleBuffer::new(vec![0.0; SAMPLE_RATE as usize * 2], SAMPLE_RATE).unwrap();
        let analysis = analyzer().compute(&buffer);

        assert!(!analysis.energy_profile.is_empty());
        assert!(analysis.energy_profile.iter().all(|p| p.energy == 0.0 && p.relative_energy == 0.0));
        assert!(analysis.emphasis_points.is_empty());
    }

    #[test]
    fn test_profile_bins_and_normalization() {
        let mut samples = tone(1.0, 0.2);
        samples.extend(tone(1.0, 0.8));
        samples.extend(tone(1.0, 0.4));
        let buffer = SampleBuffer::new(samples, SAMPLE_RATE).unwrap();

        let analysis = analyzer().compute(&buffer);
        let profile = &analysis.energy_profile;

        // 130 frames in bins of 21
        assert_eq!(analysis.rms_frames.len(), 130);
        assert_eq!(profile.len(), 7);
        assert_eq!(profile[1].timestamp, 21.0 * 512.0 / SAMPLE_RATE as f64);

        assert!(profile.iter().all(|p| (0.0..=1.0).contains(&p.relative_energy)));
        assert!(profile.iter().any(|p| p.relative_energy == 1.0));

        let loudest = profile
            .iter()
            .max_by(|a, b| a.energy.total_cmp(&b.energy))
            .unwrap();
        assert!(loudest.timestamp >= 1.0 && loudest.timestamp < 2.0);
    }

    #[test]
    fn test_frame_peak_reference() {
        let mut config = AnalysisConfig::default();
        config.energy_reference = EnergyReference::FramePeak;

        let mut samples = tone(1.0, 0.1);
        samples.extend(tone(0.05, 0.9));
        samples.extend(tone(1.0, 0.1));
        let buffer = SampleBuffer::new(samples, SAMPLE_RATE).unwrap();

        let analysis = EnergyAnalyzer::new(&config).compute(&buffer);
        // A short burst dominates the frame peak but not any bin mean
        assert!(analysis.energy_profile.iter().all(|p| p.relative_energy < 1.0));
        assert!(analysis.energy_profile.iter().all(|p| p.relative_energy >= 0.0));

        let frame_peak = analysis.rms_frames.iter().fold(0.0f32, |acc, &x| acc.max(x)) as f64;
        for point in &analysis.energy_profile {
            assert!((point.relative_energy - point.energy / frame_peak).abs() < 1e-12);
        }
    }

    #[test]
    fn test_default_reference_is_profile_peak() {
        assert_eq!(AnalysisConfig::default().energy_reference, EnergyReference::ProfilePeak);

        let mut samples = tone(1.0, 0.1);
        samples.extend(tone(0.05, 0.9));
        samples.extend(tone(1.0, 0.1));
        let buffer = SampleBuffer::new(samples, SAMPLE_RATE).unwrap();

        let profile = analyzer().compute(&buffer).energy_profile;
        let bin_peak = profile.iter().fold(0.0f64, |acc, p| acc.max(p.energy));
        assert!(profile.iter().any(|p| p.relative_energy == 1.0));
        for point in &profile {
            assert!((point.relative_energy - point.energy / bin_peak).abs() < 1e-12);
        }
    }

    #[test]
    fn test_emphasis_on_loud_bursts() {
        let mut samples = Vec::new();
        for _ in 0..3 {
            samples.extend(tone(1.4, 0.05));
            samples.extend(tone(0.2, 0.9));
        }
        samples.extend(tone(1.0, 0.05));
        let buffer = SampleBuffer::new(samples, SAMPLE_RATE).unwrap();

        let analysis = analyzer().compute(&buffer);
        let times: Vec<f64> = analysis.emphasis_points.iter().map(|p| p.timestamp).collect();

        assert_eq!(times.len(), 3, "emphasis at {:?}", times);
        for (found, expected) in times.iter().zip([1.5, 3.1, 4.7]) {
            assert!((found - expected).abs() < 0.1, "emphasis at {:?}", times);
        }
        assert!(times.windows(2).all(|w| w[1] - w[0] >= 0.5));
        assert!(analysis
            .emphasis_points
            .iter()
            .all(|p| p.intensity > analysis.emphasis_threshold && p.kind == EmphasisKind::VocalEmphasis));
    }

    #[test]
    fn test_emphasis_spacing_is_enforced() {
        // Two bursts 0.3s apart collapse into one emphasis point
        let mut samples = tone(1.0, 0.05);
        samples.extend(tone(0.1, 0.9));
        samples.extend(tone(0.2, 0.05));
        samples.extend(tone(0.1, 0.7));
        samples.extend(tone(1.0, 0.05));
        let buffer = SampleBuffer::new(samples, SAMPLE_RATE).unwrap();

        let analysis = analyzer().compute(&buffer);
        assert_eq!(analysis.emphasis_points.len(), 1);
        assert!((analysis.emphasis_points[0].timestamp - 1.05).abs() < 0.1);
    }
}
