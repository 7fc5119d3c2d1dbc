use crate::analysis::dsp;
use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::rhythm_map::{Break, BreakKind, SpeechInterval};

/// Frame power below this floor is treated as -100 dB
const POWER_FLOOR: f64 = 1e-10;

/// Active intervals and the pauses between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilenceAnalysis {
    pub speech_segments: Vec<SpeechInterval>,
    pub natural_breaks: Vec<Break>,
}

/// Splits a buffer into active and silent stretches relative to its loudest frame
pub struct SilenceSegmenter {
    frame_size: usize,
    hop_size: usize,
    speech_top_db: f32,
    break_top_db: f32,
    min_break_duration: f64,
    long_break_duration: f64,
    include_edge_breaks: bool,
}

impl SilenceSegmenter {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            speech_top_db: config.speech_top_db,
            break_top_db: config.break_top_db,
            min_break_duration: config.min_break_duration,
            long_break_duration: config.long_break_duration,
            include_edge_breaks: config.include_edge_breaks,
        }
    }

    /// Active intervals whose frame power stays within `top_db` of the peak frame
    pub fn segment(&self, buffer: &SampleBuffer, top_db: f32) -> Vec<SpeechInterval> {
        match self.frame_rms(buffer) {
            Some(rms) => self.active_intervals(&rms, top_db, buffer),
            None => Vec::new(),
        }
    }

    /// Speech segments at the coarse threshold and breaks from the sensitive one
    pub fn analyze(&self, buffer: &SampleBuffer) -> SilenceAnalysis {
        let Some(rms) = self.frame_rms(buffer) else {
            return SilenceAnalysis::default();
        };

        let speech_segments = self.active_intervals(&rms, self.speech_top_db, buffer);
        let break_intervals = self.active_intervals(&rms, self.break_top_db, buffer);
        let natural_breaks = self.breaks_between(&break_intervals, buffer.duration());

        tracing::debug!(
            "Silence segmentation: {} speech segments at -{} dB, {} breaks from {} intervals at -{} dB",
            speech_segments.len(),
            self.speech_top_db,
            natural_breaks.len(),
            break_intervals.len(),
            self.break_top_db
        );

        SilenceAnalysis {
            speech_segments,
            natural_breaks,
        }
    }

    /// Pauses between consecutive intervals that are long enough to count
    ///
    /// With edge breaks enabled, the silence before the first and after the
    /// last interval is considered too. No intervals means no breaks.
    pub fn breaks_between(&self, intervals: &[SpeechInterval], duration: f64) -> Vec<Break> {
        let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
            return Vec::new();
        };

        let mut gaps = Vec::with_capacity(intervals.len() + 1);
        if self.include_edge_breaks {
            gaps.push((0.0, first.start));
        }
        gaps.extend(intervals.windows(2).map(|pair| (pair[0].end, pair[1].start)));
        if self.include_edge_breaks {
            gaps.push((last.end, duration));
        }

        gaps.into_iter()
            .filter_map(|(start, end)| {
                let duration = end - start;
                (duration > self.min_break_duration).then(|| Break {
                    start,
                    end,
                    duration,
                    kind: BreakKind::classify(duration, self.long_break_duration),
                })
            })
            .collect()
    }

    fn frame_rms(&self, buffer: &SampleBuffer) -> Option<Vec<f32>> {
        if let Err(err) = dsp::require_frame("silence_segmenter", buffer.len(), self.frame_size) {
            tracing::debug!("{}; reporting no active intervals", err);
            return None;
        }
        Some(dsp::rms_frames(buffer.samples(), self.frame_size, self.hop_size))
    }

    fn active_intervals(&self, rms: &[f32], top_db: f32, buffer: &SampleBuffer) -> Vec<SpeechInterval> {
        let power: Vec<f64> = rms.iter().map(|&r| r as f64 * r as f64).collect();
        let peak = power.iter().fold(0.0f64, |acc, &p| acc.max(p));

        // Nothing to be relative to
        if peak <= 0.0 {
            return Vec::new();
        }

        let reference_db = to_db(peak);
        let active: Vec<bool> = power
            .iter()
            .map(|&p| to_db(p) - reference_db > -(top_db as f64))
            .collect();

        let len = buffer.len();
        let mut intervals = Vec::new();
        let mut run_start: Option<usize> = None;

        for (frame, &is_active) in active.iter().chain(std::iter::once(&false)).enumerate() {
            match (is_active, run_start) {
                (true, None) => run_start = Some(frame),
                (false, Some(start_frame)) => {
                    let start = start_frame * self.hop_size;
                    let end = (frame * self.hop_size).min(len);
                    if start < end {
                        intervals.push(SpeechInterval::new(
                            buffer.time_for_sample(start),
                            buffer.time_for_sample(end),
                        ));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }

        intervals
    }
}

fn to_db(power: f64) -> f64 {
    10.0 * power.max(POWER_FLOOR).log10()
}
