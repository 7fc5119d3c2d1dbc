//! Onset-driven tempo estimation and dynamic-programming beat tracking.
//!
//! The onset envelope measures how much the log-magnitude spectrum rises
//! from one frame to the next. Its autocorrelation, weighted by a tempo
//! prior, gives the global beat period. Beats are then placed by a dynamic
//! program that rewards landing on strong onsets and penalises intervals
//! that stray from the period.

use crate::analysis::dsp::{self, Stft};
use crate::audio::SampleBuffer;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::rhythm_map::Beat;

/// Width of the tempo prior in octaves
const PRIOR_OCTAVES: f64 = 1.0;

/// Local score kernel width as a fraction of the period
const LOCAL_SCORE_SHARPNESS: f64 = 32.0;

/// Onset strength a first beat must reach, relative to the strongest
const FIRST_BEAT_THRESHOLD: f64 = 0.01;

/// Share of the chosen lag's correlation that half the lag must reach to replace it
const HARMONIC_AGREEMENT: f64 = 0.8;

/// Tempo and beat positions of a buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatTrack {
    /// Beats per minute, 0 when no periodicity was found
    pub tempo: f64,
    pub beats: Vec<Beat>,
    /// Length of the onset envelope the track was derived from
    pub onset_frames: usize,
}

pub struct BeatTracker {
    stft: Stft,
    frame_size: usize,
    hop_size: usize,
    min_bpm: f64,
    max_bpm: f64,
    start_bpm: f64,
    tightness: f64,
}

impl BeatTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            stft: Stft::new(config.frame_size, config.hop_size),
            frame_size: config.frame_size,
            hop_size: config.hop_size,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            start_bpm: config.start_bpm,
            tightness: config.tightness,
        }
    }

    /// Estimate the tempo and place beats
    ///
    /// Buffers without a detectable periodicity report tempo 0 and no beats.
    pub fn track(&self, buffer: &SampleBuffer) -> Result<BeatTrack> {
        if let Err(err) = dsp::require_frame("beat_tracker", buffer.len(), self.frame_size) {
            tracing::debug!("{}; tempo unknown", err);
            return Ok(BeatTrack::default());
        }

        let onset = self.onset_strength(buffer.samples())?;
        let frames_per_second = buffer.sample_rate() as f64 / self.hop_size as f64;

        let Some(tempo) = self.estimate_tempo(&onset, frames_per_second) else {
            tracing::debug!("No periodicity in {} onset frames; tempo unknown", onset.len());
            return Ok(BeatTrack {
                tempo: 0.0,
                beats: Vec::new(),
                onset_frames: onset.len(),
            });
        };

        let period = 60.0 * frames_per_second / tempo;
        let beats: Vec<Beat> = self
            .place_beats(&onset, period)
            .into_iter()
            .map(|frame| Beat {
                timestamp: buffer.time_for_frame(frame, self.hop_size),
            })
            .collect();

        tracing::debug!(
            "Beat tracking: {:.1} BPM (period {:.2} frames), {} beats",
            tempo,
            period,
            beats.len()
        );

        Ok(BeatTrack {
            tempo,
            beats,
            onset_frames: onset.len(),
        })
    }

    /// Mean positive rise of the log-magnitude spectrum per frame; frame 0 is 0
    pub fn onset_strength(&self, samples: &[f32]) -> Result<Vec<f32>> {
        let mut envelope = Vec::with_capacity(dsp::frame_count(samples.len(), self.hop_size));
        let mut previous: Vec<f32> = Vec::with_capacity(self.stft.bins());

        self.stft.for_each_magnitude(samples, |_, magnitude| {
            let strength = if previous.is_empty() {
                0.0
            } else {
                let rise: f64 = magnitude
                    .iter()
                    .zip(&previous)
                    .map(|(&m, &p)| (m.ln_1p() - p).max(0.0) as f64)
                    .sum();
                (rise / magnitude.len() as f64) as f32
            };

            previous.clear();
            previous.extend(magnitude.iter().map(|m| m.ln_1p()));
            envelope.push(strength);
        })?;

        Ok(envelope)
    }

    /// Dominant tempo of the onset envelope in BPM
    fn estimate_tempo(&self, onset: &[f32], frames_per_second: f64) -> Option<f64> {
        let smoothed = dsp::gaussian_smooth(onset, 1.0);
        let mean = dsp::mean(&smoothed);
        let centered: Vec<f64> = smoothed.iter().map(|&v| v as f64 - mean).collect();
        let energy: f64 = centered.iter().map(|v| v * v).sum();

        if energy <= 1e-12 {
            return None;
        }

        // The lag window spans the whole BPM range; the result is clamped to it
        let min_lag = ((60.0 * frames_per_second / self.max_bpm).floor() as usize).max(1);
        let max_lag = ((60.0 * frames_per_second / self.min_bpm).ceil() as usize).min(centered.len() / 2);
        if max_lag < min_lag {
            return None;
        }

        let correlations: Vec<f64> = (min_lag..=max_lag)
            .map(|lag| {
                let correlation: f64 = centered
                    .iter()
                    .zip(&centered[lag..])
                    .map(|(a, b)| a * b)
                    .sum();
                correlation / energy
            })
            .collect();
        let scores: Vec<f64> = correlations
            .iter()
            .zip(min_lag..)
            .map(|(&correlation, lag)| correlation * self.tempo_prior(60.0 * frames_per_second / lag as f64))
            .collect();

        let (mut best, &best_score) = scores
            .iter()
            .enumerate()
            .fold((0, &f64::NEG_INFINITY), |acc, item| if item.1 > acc.1 { item } else { acc });

        if best_score <= 0.0 {
            return None;
        }

        while let Some(faster) = half_period(&correlations, min_lag, best) {
            tracing::trace!("Tempo lag {} halved to {}", min_lag + best, min_lag + faster);
            best = faster;
        }

        let offset = if best > 0 && best + 1 < scores.len() {
            let (left, centre, right) = (scores[best - 1], scores[best], scores[best + 1]);
            let curvature = left - 2.0 * centre + right;
            if curvature < 0.0 {
                (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
            } else {
                0.0
            }
        } else {
            0.0
        };

        let lag = (min_lag + best) as f64 + offset;
        Some((60.0 * frames_per_second / lag).clamp(self.min_bpm, self.max_bpm))
    }

    /// Log-normal weight around the preferred tempo
    fn tempo_prior(&self, bpm: f64) -> f64 {
        let octaves = (bpm / self.start_bpm).log2() / PRIOR_OCTAVES;
        (-0.5 * octaves * octaves).exp()
    }

    /// Beat frames maximising onset agreement and period consistency
    fn place_beats(&self, onset: &[f32], period: f64) -> Vec<usize> {
        let spread = dsp::variance(onset).sqrt();
        if spread <= 0.0 {
            return Vec::new();
        }

        let normalized: Vec<f64> = onset.iter().map(|&v| v as f64 / spread).collect();
        let local = local_score(&normalized, period);
        let peak = local.iter().fold(0.0f64, |acc, &v| acc.max(v));
        if peak <= 0.0 {
            return Vec::new();
        }

        // Predecessors lie between half a period and two periods back
        let near = ((period / 2.0).round() as usize).max(1);
        let far = ((2.0 * period).round() as usize).max(near);
        let transition: Vec<f64> = (near..=far)
            .map(|gap| -self.tightness * (gap as f64 / period).ln().powi(2))
            .collect();

        let threshold = FIRST_BEAT_THRESHOLD * peak;
        let mut cumulative = vec![0.0f64; local.len()];
        let mut backlink: Vec<Option<usize>> = vec![None; local.len()];
        let mut first_beat = true;

        for (frame, &score) in local.iter().enumerate() {
            // A predecessor before the signal start costs only the transition
            let mut best: (Option<usize>, f64) = (None, f64::NEG_INFINITY);
            for (gap, &cost) in (near..=far).zip(&transition) {
                let candidate = match frame.checked_sub(gap) {
                    Some(previous) => (Some(previous), cumulative[previous] + cost),
                    None => (None, cost),
                };
                if candidate.1 > best.1 {
                    best = candidate;
                }
            }

            cumulative[frame] = score + best.1;

            if first_beat && score < threshold {
                backlink[frame] = None;
            } else {
                backlink[frame] = best.0;
                first_beat = false;
            }
        }

        let Some(last) = last_beat(&cumulative) else {
            return Vec::new();
        };

        let mut beats = vec![last];
        let mut cursor = backlink[last];
        while let Some(frame) = cursor {
            beats.push(frame);
            cursor = backlink[frame];
        }
        beats.reverse();

        trim_weak_edges(beats, &local)
    }
}

/// Index of the strongest lag near half of `best`'s lag, when it correlates
/// almost as well as `best` itself
///
/// `correlations[i]` belongs to lag `min_lag + i`. The prior can favour a
/// lag twice the true period when the two correlate about equally.
fn half_period(correlations: &[f64], min_lag: usize, best: usize) -> Option<usize> {
    let lag = min_lag + best;
    let reference = correlations[best];
    if reference <= 0.0 {
        return None;
    }

    let candidates = (lag / 2).saturating_sub(1)..=(lag + 1) / 2 + 1;
    let (index, correlation) = candidates
        .filter(|&candidate| candidate >= min_lag && candidate < lag)
        .map(|candidate| (candidate - min_lag, correlations[candidate - min_lag]))
        .fold(None, |acc: Option<(usize, f64)>, item| match acc {
            Some(current) if current.1 >= item.1 => Some(current),
            _ => Some(item),
        })?;

    (correlation >= HARMONIC_AGREEMENT * reference).then_some(index)
}

/// Onset envelope convolved with a Gaussian of width `period / 32`
fn local_score(onset: &[f64], period: f64) -> Vec<f64> {
    let radius = period.round() as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 * LOCAL_SCORE_SHARPNESS / period).powi(2)).exp())
        .collect();

    let len = onset.len() as isize;
    (0..len)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .filter_map(|(&weight, k)| {
                    let index = i + k;
                    (0..len).contains(&index).then(|| weight * onset[index as usize])
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score above half the median maximum
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let len = cumulative.len();
    let maxima: Vec<usize> = (1..len)
        .filter(|&i| {
            cumulative[i] > cumulative[i - 1] && (i + 1 == len || cumulative[i] >= cumulative[i + 1])
        })
        .collect();

    let peaks: Vec<f32> = maxima.iter().map(|&i| cumulative[i] as f32).collect();
    let median = dsp::percentile(&peaks, 50.0);

    maxima.into_iter().rev().find(|&i| 2.0 * cumulative[i] > median)
}

/// Drop leading and trailing beats whose smoothed onset strength is at most
/// half the RMS strength
fn trim_weak_edges(beats: Vec<usize>, local: &[f64]) -> Vec<usize> {
    let strengths: Vec<f64> = beats.iter().map(|&frame| local[frame]).collect();
    let smoothed: Vec<f64> = (0..strengths.len())
        .map(|i| {
            let before = if i > 0 { strengths[i - 1] } else { 0.0 };
            let after = strengths.get(i + 1).copied().unwrap_or(0.0);
            0.5 * before + strengths[i] + 0.5 * after
        })
        .collect();

    if smoothed.is_empty() {
        return beats;
    }

    let rms = (smoothed.iter().map(|s| s * s).sum::<f64>() / smoothed.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    match (
        smoothed.iter().position(|&s| s > threshold),
        smoothed.iter().rposition(|&s| s > threshold),
    ) {
        (Some(first), Some(last)) => beats[first..=last].to_vec(),
        _ => Vec::new(),
    }
}
