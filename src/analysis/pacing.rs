use crate::analysis::dsp;
use crate::rhythm_map::{
    Beat, Break, CutOrigin, CutPoint, PacingRecommendation, PacingStyle, TransitionStyle,
};

/// Breaks at least this long become cut candidates
const MIN_CUT_BREAK: f64 = 0.5;
const BREAK_CUT_CONFIDENCE: f64 = 0.9;
const RHYTHMIC_CUT_CONFIDENCE: f64 = 0.6;
/// Every n-th beat is a cut candidate
const BEATS_PER_CUT: usize = 4;

/// Editing recommendations from energy, beat and break data
#[derive(Debug, Clone, Copy, Default)]
pub struct PacingRecommender;

impl PacingRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Pick a pacing style and collect cut candidates
    ///
    /// Break cuts come first, then rhythmic cuts, each group in input order.
    /// Use [`PacingRecommendation::cuts_by_time`] for a single timeline.
    pub fn recommend(&self, rms_frames: &[f32], beats: &[Beat], breaks: &[Break]) -> PacingRecommendation {
        let style = Self::style(rms_frames);

        let break_cuts = breaks
            .iter()
            .filter(|b| b.duration > MIN_CUT_BREAK)
            .map(|b| CutPoint {
                timestamp: b.start,
                origin: CutOrigin::NaturalBreak,
                confidence: BREAK_CUT_CONFIDENCE,
            });

        let rhythmic_cuts = beats.iter().step_by(BEATS_PER_CUT).map(|beat| CutPoint {
            timestamp: beat.timestamp,
            origin: CutOrigin::Rhythmic,
            confidence: RHYTHMIC_CUT_CONFIDENCE,
        });

        let cuts: Vec<CutPoint> = break_cuts.chain(rhythmic_cuts).collect();

        tracing::debug!("Pacing: {:?} with {} recommended cuts", style, cuts.len());

        PacingRecommendation {
            style,
            cuts,
            avg_scene_duration: if style == PacingStyle::Energetic { 3.0 } else { 5.0 },
            transition_style: if style == PacingStyle::Dynamic {
                TransitionStyle::Quick
            } else {
                TransitionStyle::Smooth
            },
        }
    }

    fn style(rms_frames: &[f32]) -> PacingStyle {
        if rms_frames.is_empty() {
            return PacingStyle::Steady;
        }

        let avg_energy = dsp::mean(rms_frames);
        let energy_variance = dsp::variance(rms_frames);

        if energy_variance > 0.3 * avg_energy {
            PacingStyle::Dynamic
        } else if avg_energy > dsp::percentile(rms_frames, 70.0) {
            PacingStyle::Energetic
        } else {
            PacingStyle::Steady
        }
    }
}
