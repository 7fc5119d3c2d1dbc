//! # Rhythm Map
//!
//! The immutable result of an analysis run. A [`RhythmMap`] can only be
//! obtained through [`RhythmMapBuilder::build`] or by parsing JSON, and both
//! paths run the same consistency checks, so every map in memory satisfies:
//!
//! - `duration` and `tempo` are finite and non-negative
//! - no timestamp lies outside `[0, duration]` (within a 1µs tolerance)
//! - beats and emphasis points are strictly increasing
//! - speech segments and breaks are non-empty, sorted and non-overlapping
//! - relative energies lie in `[0, 1]`, cut confidences in `(0, 1]`
//!
//! The JSON layout is consumed by downstream scene-timing tools and must not
//! change shape.

pub mod types;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
pub use types::{
    Beat, Break, BreakKind, CutOrigin, CutPoint, EmphasisKind, EmphasisPoint,
    EnergyProfilePoint, PacingRecommendation, PacingStyle, SpectralSummary,
    SpeechInterval, TransitionStyle,
};

/// Slack allowed when comparing timestamps against the track duration
pub const TIMESTAMP_TOLERANCE: f64 = 1e-6;

/// Structured rhythm and timing description of one audio track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RhythmMapBuilder")]
pub struct RhythmMap {
    duration: f64,
    tempo: f64,
    beats: Vec<Beat>,
    speech_segments: Vec<SpeechInterval>,
    natural_breaks: Vec<Break>,
    emphasis_points: Vec<EmphasisPoint>,
    #[serde(rename = "spectral_features")]
    spectral: SpectralSummary,
    energy_profile: Vec<EnergyProfilePoint>,
    #[serde(rename = "pacing_recommendations")]
    pacing: PacingRecommendation,
}

impl RhythmMap {
    /// Track length in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Global tempo in BPM; 0 when unknown
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn beats(&self) -> &[Beat] {
        &self.beats
    }

    pub fn speech_segments(&self) -> &[SpeechInterval] {
        &self.speech_segments
    }

    pub fn natural_breaks(&self) -> &[Break] {
        &self.natural_breaks
    }

    pub fn emphasis_points(&self) -> &[EmphasisPoint] {
        &self.emphasis_points
    }

    pub fn spectral(&self) -> &SpectralSummary {
        &self.spectral
    }

    pub fn energy_profile(&self) -> &[EnergyProfilePoint] {
        &self.energy_profile
    }

    pub fn pacing(&self) -> &PacingRecommendation {
        &self.pacing
    }

    /// Whether a tempo could be estimated
    pub fn has_tempo(&self) -> bool {
        self.tempo > 0.0
    }

    /// Serialize to the rhythm map JSON document
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Parse and validate a rhythm map JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Collects component outputs and validates them into a [`RhythmMap`]
#[derive(Debug, Clone, Deserialize)]
pub struct RhythmMapBuilder {
    duration: f64,
    tempo: f64,
    beats: Vec<Beat>,
    speech_segments: Vec<SpeechInterval>,
    natural_breaks: Vec<Break>,
    emphasis_points: Vec<EmphasisPoint>,
    #[serde(rename = "spectral_features")]
    spectral: SpectralSummary,
    energy_profile: Vec<EnergyProfilePoint>,
    #[serde(rename = "pacing_recommendations")]
    pacing: PacingRecommendation,
}

impl RhythmMapBuilder {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            tempo: 0.0,
            beats: Vec::new(),
            speech_segments: Vec::new(),
            natural_breaks: Vec::new(),
            emphasis_points: Vec::new(),
            spectral: SpectralSummary::default(),
            energy_profile: Vec::new(),
            pacing: PacingRecommendation::default(),
        }
    }

    pub fn tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn beats(mut self, beats: Vec<Beat>) -> Self {
        self.beats = beats;
        self
    }

    pub fn speech_segments(mut self, segments: Vec<SpeechInterval>) -> Self {
        self.speech_segments = segments;
        self
    }

    pub fn natural_breaks(mut self, breaks: Vec<Break>) -> Self {
        self.natural_breaks = breaks;
        self
    }

    pub fn emphasis_points(mut self, points: Vec<EmphasisPoint>) -> Self {
        self.emphasis_points = points;
        self
    }

    pub fn spectral(mut self, spectral: SpectralSummary) -> Self {
        self.spectral = spectral;
        self
    }

    pub fn energy_profile(mut self, profile: Vec<EnergyProfilePoint>) -> Self {
        self.energy_profile = profile;
        self
    }

    pub fn pacing(mut self, pacing: PacingRecommendation) -> Self {
        self.pacing = pacing;
        self
    }

    /// Validate and freeze the map
    pub fn build(self) -> Result<RhythmMap> {
        Ok(RhythmMap::try_from(self)?)
    }

    fn validate(&self) -> std::result::Result<(), AnalysisError> {
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(violation("duration", format!("{} is not a valid duration", self.duration)));
        }

        if !(self.tempo.is_finite() && self.tempo >= 0.0) {
            return Err(violation("tempo", format!("{} is not a valid tempo", self.tempo)));
        }

        let bounds = TimeBounds { limit: self.duration + TIMESTAMP_TOLERANCE, duration: self.duration };

        bounds.check_increasing("beats", self.beats.iter().map(|b| b.timestamp))?;
        bounds.check_intervals(
            "speech_segments",
            self.speech_segments.iter().map(|s| (s.start, s.end)),
        )?;
        bounds.check_intervals(
            "natural_breaks",
            self.natural_breaks.iter().map(|b| (b.start, b.end)),
        )?;
        bounds.check_increasing(
            "emphasis_points",
            self.emphasis_points.iter().map(|p| p.timestamp),
        )?;

        for point in &self.energy_profile {
            bounds.check("energy_profile", point.timestamp)?;
            if !(0.0..=1.0).contains(&point.relative_energy) {
                return Err(violation(
                    "energy_profile",
                    format!("relative energy {} outside [0, 1]", point.relative_energy),
                ));
            }
        }

        for cut in &self.pacing.cuts {
            bounds.check("pacing_recommendations", cut.timestamp)?;
            if !(cut.confidence > 0.0 && cut.confidence <= 1.0) {
                return Err(violation(
                    "pacing_recommendations",
                    format!("confidence {} outside (0, 1]", cut.confidence),
                ));
            }
        }

        Ok(())
    }
}

impl TryFrom<RhythmMapBuilder> for RhythmMap {
    type Error = AnalysisError;

    fn try_from(builder: RhythmMapBuilder) -> std::result::Result<Self, Self::Error> {
        builder.validate()?;

        Ok(Self {
            duration: builder.duration,
            tempo: builder.tempo,
            beats: builder.beats,
            speech_segments: builder.speech_segments,
            natural_breaks: builder.natural_breaks,
            emphasis_points: builder.emphasis_points,
            spectral: builder.spectral,
            energy_profile: builder.energy_profile,
            pacing: builder.pacing,
        })
    }
}

struct TimeBounds {
    limit: f64,
    duration: f64,
}

impl TimeBounds {
    fn check(&self, field: &str, timestamp: f64) -> std::result::Result<(), AnalysisError> {
        if timestamp.is_finite() && timestamp >= 0.0 && timestamp <= self.limit {
            Ok(())
        } else {
            Err(violation(
                field,
                format!("timestamp {} outside [0, {}]", timestamp, self.duration),
            ))
        }
    }

    fn check_increasing(
        &self,
        field: &str,
        timestamps: impl Iterator<Item = f64>,
    ) -> std::result::Result<(), AnalysisError> {
        let mut previous: Option<f64> = None;
        for timestamp in timestamps {
            self.check(field, timestamp)?;
            if let Some(prev) = previous {
                if timestamp <= prev {
                    return Err(violation(
                        field,
                        format!("timestamp {} does not follow {}", timestamp, prev),
                    ));
                }
            }
            previous = Some(timestamp);
        }
        Ok(())
    }

    fn check_intervals(
        &self,
        field: &str,
        intervals: impl Iterator<Item = (f64, f64)>,
    ) -> std::result::Result<(), AnalysisError> {
        let mut previous_end: Option<f64> = None;
        for (start, end) in intervals {
            self.check(field, start)?;
            self.check(field, end)?;
            if start >= end {
                return Err(violation(field, format!("empty interval [{}, {}]", start, end)));
            }
            if let Some(prev) = previous_end {
                if start < prev {
                    return Err(violation(
                        field,
                        format!("interval starting at {} overlaps one ending at {}", start, prev),
                    ));
                }
            }
            previous_end = Some(end);
        }
        Ok(())
    }
}

fn violation(field: &str, details: String) -> AnalysisError {
    AnalysisError::ConsistencyViolation {
        field: field.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RhythmError;

    fn sample_map() -> RhythmMap {
        RhythmMapBuilder::new(10.0)
            .tempo(120.0)
            .beats(vec![Beat { timestamp: 0.5 }, Beat { timestamp: 1.0 }, Beat { timestamp: 1.5 }])
            .speech_segments(vec![SpeechInterval::new(1.0, 3.0), SpeechInterval::new(4.5, 9.0)])
            .natural_breaks(vec![Break {
                start: 3.0,
                end: 4.5,
                duration: 1.5,
                kind: BreakKind::Long,
            }])
            .emphasis_points(vec![EmphasisPoint {
                timestamp: 2.1,
                intensity: 0.31,
                kind: EmphasisKind::VocalEmphasis,
            }])
            .spectral(SpectralSummary {
                avg_centroid: 1520.25,
                avg_rolloff: 3010.5,
                avg_zero_crossing_rate: 0.071,
                centroid_variance: 8100.0,
            })
            .energy_profile(vec![
                EnergyProfilePoint { timestamp: 0.0, energy: 0.1, relative_energy: 0.5 },
                EnergyProfilePoint { timestamp: 0.5, energy: 0.2, relative_energy: 1.0 },
            ])
            .pacing(PacingRecommendation {
                style: PacingStyle::Dynamic,
                cuts: vec![
                    CutPoint { timestamp: 3.0, origin: CutOrigin::NaturalBreak, confidence: 0.9 },
                    CutPoint { timestamp: 0.5, origin: CutOrigin::Rhythmic, confidence: 0.6 },
                ],
                avg_scene_duration: 5.0,
                transition_style: TransitionStyle::Quick,
            })
            .build()
            .unwrap()
    }

    fn assert_violation(result: Result<RhythmMap>, expected_field: &str) {
        match result {
            Err(RhythmError::Analysis(AnalysisError::ConsistencyViolation { field, .. })) => {
                assert_eq!(field, expected_field)
            }
            other => panic!("Expected consistency violation in {}, got {:?}", expected_field, other),
        }
    }

    #[test]
    fn test_empty_map_is_valid() {
        let map = RhythmMapBuilder::new(0.0).build().unwrap();
        assert_eq!(map.duration(), 0.0);
        assert!(!map.has_tempo());
        assert_eq!(map.pacing().style, PacingStyle::Steady);
    }

    #[test]
    fn test_rejects_negative_duration() {
        assert_violation(RhythmMapBuilder::new(-1.0).build(), "duration");
    }

    #[test]
    fn test_rejects_beat_past_duration() {
        let result = RhythmMapBuilder::new(2.0)
            .beats(vec![Beat { timestamp: 1.0 }, Beat { timestamp: 2.5 }])
            .build();
        assert_violation(result, "beats");
    }

    #[test]
    fn test_tolerates_rounding_at_duration() {
        let result = RhythmMapBuilder::new(2.0)
            .beats(vec![Beat { timestamp: 2.0 + TIMESTAMP_TOLERANCE / 2.0 }])
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_unordered_beats() {
        let result = RhythmMapBuilder::new(5.0)
            .beats(vec![Beat { timestamp: 1.0 }, Beat { timestamp: 1.0 }])
            .build();
        assert_violation(result, "beats");
    }

    #[test]
    fn test_rejects_overlapping_segments() {
        let result = RhythmMapBuilder::new(5.0)
            .speech_segments(vec![SpeechInterval::new(0.0, 2.0), SpeechInterval::new(1.5, 3.0)])
            .build();
        assert_violation(result, "speech_segments");
    }

    #[test]
    fn test_rejects_cut_past_duration() {
        let result = RhythmMapBuilder::new(5.0)
            .pacing(PacingRecommendation {
                cuts: vec![CutPoint { timestamp: 7.0, origin: CutOrigin::Rhythmic, confidence: 0.6 }],
                ..PacingRecommendation::default()
            })
            .build();
        assert_violation(result, "pacing_recommendations");
    }

    #[test]
    fn test_rejects_relative_energy_above_one() {
        let result = RhythmMapBuilder::new(5.0)
            .energy_profile(vec![EnergyProfilePoint { timestamp: 0.0, energy: 1.0, relative_energy: 1.5 }])
            .build();
        assert_violation(result, "energy_profile");
    }

    #[test]
    fn test_json_field_names() {
        let json: serde_json::Value = serde_json::from_str(&sample_map().to_json(false).unwrap()).unwrap();

        for key in [
            "duration", "tempo", "beats", "speech_segments", "natural_breaks",
            "emphasis_points", "spectral_features", "energy_profile", "pacing_recommendations",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json.as_object().unwrap().len(), 9);

        assert_eq!(json["beats"][1], 1.0);
        assert_eq!(json["natural_breaks"][0]["type"], "long");
        assert_eq!(json["spectral_features"]["avg_spectral_centroid"], 1520.25);
        assert_eq!(json["spectral_features"]["spectral_variance"], 8100.0);
        assert_eq!(json["pacing_recommendations"]["pacing_style"], "dynamic");
        assert_eq!(json["pacing_recommendations"]["transition_style"], "quick");
        assert_eq!(json["pacing_recommendations"]["recommended_cuts"][1]["type"], "rhythmic");
    }

    #[test]
    fn test_json_roundtrip() {
        let map = sample_map();
        for pretty in [true, false] {
            let parsed = RhythmMap::from_json(&map.to_json(pretty).unwrap()).unwrap();
            assert_eq!(parsed, map);
        }
    }

    #[test]
    fn test_parsing_rejects_inconsistent_document() {
        let mut json: serde_json::Value = serde_json::to_value(sample_map()).unwrap();
        json["duration"] = serde_json::json!(1.0);

        let result = RhythmMap::from_json(&json.to_string());
        assert!(matches!(result, Err(RhythmError::Serialization(_))));
    }
}
