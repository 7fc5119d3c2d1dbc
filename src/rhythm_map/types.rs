use serde::{Deserialize, Serialize};

/// A beat position in seconds; serialized as a bare number
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Beat {
    pub timestamp: f64,
}

/// A run of non-silent audio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechInterval {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl SpeechInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            duration: end - start,
        }
    }
}

/// Length class of a natural break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    pub fn classify(duration: f64, long_threshold: f64) -> Self {
        if duration < long_threshold {
            Self::Short
        } else {
            Self::Long
        }
    }
}

/// A pause between active intervals that is long enough to cut on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Break {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
    #[serde(rename = "type")]
    pub kind: BreakKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmphasisKind {
    VocalEmphasis,
}

/// A local loudness peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmphasisPoint {
    pub timestamp: f64,
    pub intensity: f64,
    #[serde(rename = "type")]
    pub kind: EmphasisKind,
}

/// Frame-averaged spectral statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    /// Mean spectral centroid (Hz)
    #[serde(rename = "avg_spectral_centroid")]
    pub avg_centroid: f64,

    /// Mean spectral rolloff (Hz)
    #[serde(rename = "avg_spectral_rolloff")]
    pub avg_rolloff: f64,

    /// Mean zero-crossing rate (crossings per sample)
    pub avg_zero_crossing_rate: f64,

    /// Variance of the centroid sequence (Hz²)
    #[serde(rename = "spectral_variance")]
    pub centroid_variance: f64,
}

/// Mean energy over one profile window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfilePoint {
    pub timestamp: f64,
    pub energy: f64,
    pub relative_energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStyle {
    Dynamic,
    Energetic,
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    Quick,
    Smooth,
}

/// What produced a recommended cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutOrigin {
    NaturalBreak,
    Rhythmic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub origin: CutOrigin,
    pub confidence: f64,
}

/// Editing guidance derived from energy, beats and breaks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingRecommendation {
    #[serde(rename = "pacing_style")]
    pub style: PacingStyle,

    /// Break-derived cuts followed by beat-derived cuts; not globally sorted
    #[serde(rename = "recommended_cuts")]
    pub cuts: Vec<CutPoint>,

    pub avg_scene_duration: f64,

    pub transition_style: TransitionStyle,
}

impl Default for PacingRecommendation {
    /// Steady pacing with no cuts, used when there is nothing to go on
    fn default() -> Self {
        Self {
            style: PacingStyle::Steady,
            cuts: Vec::new(),
            avg_scene_duration: 5.0,
            transition_style: TransitionStyle::Smooth,
        }
    }
}

impl PacingRecommendation {
    /// Cuts ordered by timestamp, for consumers that need a single timeline
    pub fn cuts_by_time(&self) -> Vec<CutPoint> {
        let mut cuts = self.cuts.clone();
        cuts.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        cuts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_classification_boundary() {
        assert_eq!(BreakKind::classify(0.99, 1.0), BreakKind::Short);
        assert_eq!(BreakKind::classify(1.0, 1.0), BreakKind::Long);
    }

    #[test]
    fn test_tagged_fields_use_type_key() {
        let point = EmphasisPoint {
            timestamp: 1.5,
            intensity: 0.25,
            kind: EmphasisKind::VocalEmphasis,
        };
        let json = serde_json::to_value(point).unwrap();
        assert_eq!(json["type"], "vocal_emphasis");

        let cut = CutPoint {
            timestamp: 2.0,
            origin: CutOrigin::NaturalBreak,
            confidence: 0.9,
        };
        assert_eq!(serde_json::to_value(cut).unwrap()["type"], "natural_break");
    }

    #[test]
    fn test_beat_serializes_as_number() {
        let beats = vec![Beat { timestamp: 0.5 }, Beat { timestamp: 1.0 }];
        assert_eq!(serde_json::to_string(&beats).unwrap(), "[0.5,1.0]");
    }

    #[test]
    fn test_cuts_by_time_sorts_copy() {
        let pacing = PacingRecommendation {
            style: PacingStyle::Steady,
            cuts: vec![
                CutPoint { timestamp: 4.0, origin: CutOrigin::NaturalBreak, confidence: 0.9 },
                CutPoint { timestamp: 0.0, origin: CutOrigin::Rhythmic, confidence: 0.6 },
            ],
            avg_scene_duration: 5.0,
            transition_style: TransitionStyle::Smooth,
        };

        let sorted = pacing.cuts_by_time();
        assert_eq!(sorted[0].timestamp, 0.0);
        assert_eq!(pacing.cuts[0].timestamp, 4.0);
    }
}
