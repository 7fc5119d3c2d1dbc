//! Frame-level signal helpers shared by the analyzers.
//!
//! Every frame-based computation uses the same centered framing: frame `i`
//! covers `frame_size` samples centered on sample `i * hop_size`, zero padded
//! past either end of the signal. A signal of `n` samples therefore has
//! `1 + n / hop_size` frames and frame `i` sits at `i * hop_size / sample_rate`
//! seconds.

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{AnalysisError, Result};

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_size: usize) -> usize {
    if len == 0 {
        0
    } else {
        1 + len / hop_size
    }
}

/// Fail with [`AnalysisError::InsufficientData`] when the signal is shorter than one frame
pub fn require_frame(
    component: &'static str,
    len: usize,
    frame_size: usize,
) -> std::result::Result<(), AnalysisError> {
    if len < frame_size {
        Err(AnalysisError::InsufficientData {
            component,
            required: frame_size,
            actual: len,
        })
    } else {
        Ok(())
    }
}

/// Copy the frame centered on `index * hop_size` into `out`
pub fn fill_frame(samples: &[f32], index: usize, hop_size: usize, out: &mut [f32]) {
    let half = out.len() / 2;
    let center = index * hop_size;

    for (offset, slot) in out.iter_mut().enumerate() {
        *slot = (center + offset)
            .checked_sub(half)
            .and_then(|pos| samples.get(pos))
            .copied()
            .unwrap_or(0.0);
    }
}

/// Root-mean-square energy of every frame
pub fn rms_frames(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    let mut frame = vec![0.0f32; frame_size];

    (0..frame_count(samples.len(), hop_size))
        .map(|index| {
            fill_frame(samples, index, hop_size, &mut frame);
            let energy: f64 = frame.iter().map(|&x| x as f64 * x as f64).sum();
            (energy / frame_size as f64).sqrt() as f32
        })
        .collect()
}

/// Fraction of adjacent sample pairs that change sign, per frame
///
/// Zero counts as positive.
pub fn zero_crossing_rates(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    let mut frame = vec![0.0f32; frame_size];

    (0..frame_count(samples.len(), hop_size))
        .map(|index| {
            fill_frame(samples, index, hop_size, &mut frame);
            let crossings = frame
                .windows(2)
                .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
                .count();
            crossings as f32 / frame_size as f32
        })
        .collect()
}

/// Short-time Fourier transform over centered, Hann-windowed frames
pub struct Stft {
    frame_size: usize,
    hop_size: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

impl Stft {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);

        // Periodic Hann window
        let window = (0..frame_size)
            .map(|i| {
                let t = i as f32 / frame_size as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
            })
            .collect();

        Self {
            frame_size,
            hop_size,
            fft,
            window,
        }
    }

    /// Number of frequency bins per frame
    pub fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f64 {
        bin as f64 * sample_rate as f64 / self.frame_size as f64
    }

    /// Call `visit(frame_index, magnitudes)` for every frame; returns the frame count
    pub fn for_each_magnitude<F>(&self, samples: &[f32], mut visit: F) -> Result<usize>
    where
        F: FnMut(usize, &[f32]),
    {
        let mut input = self.fft.make_input_vec();
        let mut spectrum: Vec<Complex<f32>> = self.fft.make_output_vec();
        let mut magnitude = vec![0.0f32; spectrum.len()];
        let frames = frame_count(samples.len(), self.hop_size);

        for index in 0..frames {
            fill_frame(samples, index, self.hop_size, &mut input);
            for (sample, weight) in input.iter_mut().zip(&self.window) {
                *sample *= weight;
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| AnalysisError::FftFailed { reason: e.to_string() })?;

            for (mag, bin) in magnitude.iter_mut().zip(&spectrum) {
                *mag = bin.norm();
            }

            visit(index, &magnitude);
        }

        Ok(frames)
    }
}

pub fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64
}

/// Percentile `q` in [0, 100] with linear interpolation between closest ranks
pub fn percentile(values: &[f32], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let low = sorted[lower] as f64;
    let high = sorted[upper] as f64;

    low + (high - low) * (rank - lower as f64)
}

/// Gaussian filter with mirror-reflected edges and a 4σ kernel radius
pub fn gaussian_smooth(values: &[f32], sigma: f64) -> Vec<f32> {
    if values.is_empty() || sigma <= 0.0 {
        return values.to_vec();
    }

    let radius = (4.0 * sigma + 0.5) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();

    let len = values.len() as isize;
    (0..len)
        .map(|i| {
            let acc: f64 = kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(&weight, k)| weight * values[reflect(i + k, len)] as f64)
                .sum();
            (acc / norm) as f32
        })
        .collect()
}

/// Mirror an out-of-range index back into `[0, len)` (edge sample repeated)
fn reflect(index: isize, len: isize) -> usize {
    let period = 2 * len;
    let wrapped = index.rem_euclid(period);
    if wrapped < len {
        wrapped as usize
    } else {
        (period - 1 - wrapped) as usize
    }
}

/// Indices of local maxima strictly above `height`, at least `distance` apart
///
/// Flat peaks resolve to their middle sample and the first and last samples
/// are never peaks. When two peaks are too close the higher one is kept.
pub fn find_peaks(values: &[f32], height: f64, distance: usize) -> Vec<usize> {
    let len = values.len();
    let mut peaks = Vec::new();

    let mut i = 1;
    while i + 1 < len {
        if values[i - 1] < values[i] {
            let mut ahead = i + 1;
            while ahead + 1 < len && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks.retain(|&p| values[p] as f64 > height);

    if distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    let mut keep = vec![true; peaks.len()];
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| values[peaks[a]].total_cmp(&values[peaks[b]]));

    for &current in priority.iter().rev() {
        if !keep[current] {
            continue;
        }

        for other in (0..current).rev() {
            if peaks[current] - peaks[other] >= distance {
                break;
            }
            keep[other] = false;
        }

        for other in current + 1..peaks.len() {
            if peaks[other] - peaks[current] >= distance {
                break;
            }
            keep[other] = false;
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(peak))
        .collect()
}
