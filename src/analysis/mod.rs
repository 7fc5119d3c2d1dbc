//! # Rhythm Analysis
//!
//! [`RhythmAnalyzer`] runs the four independent leaf analyzers over one
//! [`SampleBuffer`] and joins their results into a [`RhythmMap`]:
//!
//! - [`energy::EnergyAnalyzer`] - RMS frames, energy profile, emphasis points
//! - [`spectral::SpectralAnalyzer`] - centroid, rolloff and zero-crossing summary
//! - [`silence::SilenceSegmenter`] - speech segments and natural breaks
//! - [`beat::BeatTracker`] - tempo and beat positions
//!
//! Pacing recommendations are derived afterwards from the energy, beat and
//! break results. The whole call is CPU-bound and blocks the calling thread.
//!
//! ```rust,no_run
//! use rhythm_mapper::{RhythmAnalyzer, SampleBuffer};
//!
//! # fn main() -> rhythm_mapper::Result<()> {
//! let buffer = SampleBuffer::new(vec![0.0; 22050 * 3], 22050)?;
//! let map = RhythmAnalyzer::new().analyze(&buffer)?;
//! println!("{}", map.to_json(true)?);
//! # Ok(())
//! # }
//! ```

pub mod beat;
pub mod dsp;
pub mod energy;
pub mod pacing;
pub mod silence;
pub mod spectral;

use serde::{Deserialize, Serialize};

use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::rhythm_map::{RhythmMap, RhythmMapBuilder};

use beat::BeatTracker;
use energy::EnergyAnalyzer;
use pacing::PacingRecommender;
use silence::SilenceSegmenter;
use spectral::SpectralAnalyzer;

/// Record of how an analysis run went, for callers that want more than the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    pub sample_count: usize,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub hop_size: usize,
    /// Energy frames analysed (0 when the buffer is shorter than a frame)
    pub frames: usize,
    pub onset_frames: usize,
    pub emphasis_threshold: f64,
    pub speech_top_db: f32,
    pub break_top_db: f32,
    pub speech_segment_count: usize,
    pub break_count: usize,
    pub beat_count: usize,
    /// Components that fell back to empty output
    pub degraded_components: Vec<String>,
}

/// Rhythm analysis engine
pub struct RhythmAnalyzer {
    config: AnalysisConfig,
}

impl RhythmAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a buffer into a rhythm map
    pub fn analyze(&self, buffer: &SampleBuffer) -> Result<RhythmMap> {
        self.analyze_with_diagnostics(buffer).map(|(map, _)| map)
    }

    /// Analyze a buffer, also returning run diagnostics
    pub fn analyze_with_diagnostics(
        &self,
        buffer: &SampleBuffer,
    ) -> Result<(RhythmMap, AnalysisDiagnostics)> {
        self.config.validate()?;

        let span = tracing::info_span!(
            "rhythm_analysis",
            samples = buffer.len(),
            sample_rate = buffer.sample_rate()
        );
        let _entered = span.enter();

        tracing::info!(
            "Starting rhythm analysis of {:.2}s of audio at {} Hz",
            buffer.duration(),
            buffer.sample_rate()
        );

        let energy_analyzer = EnergyAnalyzer::new(&self.config);
        let spectral_analyzer = SpectralAnalyzer::new(&self.config);
        let segmenter = SilenceSegmenter::new(&self.config);
        let tracker = BeatTracker::new(&self.config);

        // The leaves share the buffer read-only and depend on nothing else
        let (energy, spectral, silence, track) = if self.config.parallel {
            let ((energy, spectral), (silence, track)) = rayon::join(
                || {
                    rayon::join(
                        || energy_analyzer.compute(buffer),
                        || spectral_analyzer.analyze(buffer),
                    )
                },
                || rayon::join(|| segmenter.analyze(buffer), || tracker.track(buffer)),
            );
            (energy, spectral, silence, track)
        } else {
            (
                energy_analyzer.compute(buffer),
                spectral_analyzer.analyze(buffer),
                segmenter.analyze(buffer),
                tracker.track(buffer),
            )
        };
        let spectral = spectral?;
        let track = track?;

        let pacing =
            PacingRecommender::new().recommend(&energy.rms_frames, &track.beats, &silence.natural_breaks);

        let mut degraded_components = Vec::new();
        if buffer.len() < self.config.frame_size {
            degraded_components.extend(
                ["energy_analyzer", "spectral_analyzer", "silence_segmenter"].map(String::from),
            );
        }
        if track.tempo == 0.0 {
            degraded_components.push("beat_tracker".to_string());
        }

        let diagnostics = AnalysisDiagnostics {
            sample_count: buffer.len(),
            sample_rate: buffer.sample_rate(),
            frame_size: self.config.frame_size,
            hop_size: self.config.hop_size,
            frames: energy.rms_frames.len(),
            onset_frames: track.onset_frames,
            emphasis_threshold: energy.emphasis_threshold,
            speech_top_db: self.config.speech_top_db,
            break_top_db: self.config.break_top_db,
            speech_segment_count: silence.speech_segments.len(),
            break_count: silence.natural_breaks.len(),
            beat_count: track.beats.len(),
            degraded_components,
        };

        let map = RhythmMapBuilder::new(buffer.duration())
            .tempo(track.tempo)
            .beats(track.beats)
            .speech_segments(silence.speech_segments)
            .natural_breaks(silence.natural_breaks)
            .emphasis_points(energy.emphasis_points)
            .spectral(spectral)
            .energy_profile(energy.energy_profile)
            .pacing(pacing)
            .build()?;

        tracing::info!(
            "Rhythm analysis complete - Duration: {:.2}s, Tempo: {:.1} BPM, {} beats, {} segments, {} breaks",
            map.duration(),
            map.tempo(),
            diagnostics.beat_count,
            diagnostics.speech_segment_count,
            diagnostics.break_count
        );

        Ok((map, diagnostics))
    }
}

impl Default for RhythmAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
