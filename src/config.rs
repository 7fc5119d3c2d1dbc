use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for rhythm-mapper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rhythm analysis settings
    pub analysis: AnalysisConfig,

    /// JSON output settings
    pub output: OutputConfig,

    /// Thread pool settings for the CLI
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.runtime.validate()?;
        Ok(())
    }
}

/// Which energy value maps to `relative_energy == 1.0` in the energy profile
///
/// `frame_peak` is the classic rhythm-map formula, `bin_mean / max(rms_frames)`.
/// The default `profile_peak` divides by the loudest bin mean instead, so the
/// loudest bin always reports exactly 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyReference {
    /// Loudest profile bin (its mean RMS)
    #[default]
    ProfilePeak,

    /// Loudest single RMS frame: `bin_mean / max(rms_frames)`
    FramePeak,
}

/// Rhythm analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples per analysis frame
    pub frame_size: usize,

    /// Samples between consecutive frames
    pub hop_size: usize,

    /// Silence threshold below peak (dB) for speech segments
    pub speech_top_db: f32,

    /// Silence threshold below peak (dB) for natural break detection
    pub break_top_db: f32,

    /// Gaps at or below this length (seconds) are not breaks
    pub min_break_duration: f64,

    /// Breaks at least this long (seconds) are "long"
    pub long_break_duration: f64,

    /// Also report silence before the first and after the last active interval
    pub include_edge_breaks: bool,

    /// Energy profile bin length in seconds
    pub profile_window: f64,

    /// Normalization reference for relative energy
    pub energy_reference: EnergyReference,

    /// Gaussian smoothing width (frames) applied before emphasis detection
    pub emphasis_sigma: f64,

    /// Emphasis threshold in standard deviations above the mean
    pub emphasis_deviations: f64,

    /// Minimum spacing between emphasis points in seconds
    pub emphasis_min_spacing: f64,

    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f64,

    /// Minimum BPM to detect
    pub min_bpm: f64,

    /// Maximum BPM to detect
    pub max_bpm: f64,

    /// Center of the tempo prior
    pub start_bpm: f64,

    /// How strongly beat placement sticks to the global tempo
    pub tightness: f64,

    /// Run the leaf analyzers on the rayon pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            speech_top_db: 20.0,
            break_top_db: 25.0,
            min_break_duration: 0.2,
            long_break_duration: 1.0,
            include_edge_breaks: false,
            profile_window: 0.5,
            energy_reference: EnergyReference::default(),
            emphasis_sigma: 2.0,
            emphasis_deviations: 0.7,
            emphasis_min_spacing: 0.5,
            rolloff_percent: 0.85,
            min_bpm: 60.0,
            max_bpm: 200.0,
            start_bpm: 120.0,
            tightness: 100.0,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(invalid("analysis.frame_size", self.frame_size));
        }

        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return Err(invalid("analysis.hop_size", self.hop_size));
        }

        for (key, value) in [
            ("analysis.speech_top_db", self.speech_top_db),
            ("analysis.break_top_db", self.break_top_db),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, value));
            }
        }

        if !(self.min_break_duration >= 0.0 && self.long_break_duration > self.min_break_duration) {
            return Err(invalid(
                "analysis.break_durations",
                format!("{}-{}", self.min_break_duration, self.long_break_duration),
            ));
        }

        for (key, value) in [
            ("analysis.profile_window", self.profile_window),
            ("analysis.emphasis_min_spacing", self.emphasis_min_spacing),
            ("analysis.tightness", self.tightness),
            ("analysis.start_bpm", self.start_bpm),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(key, value));
            }
        }

        if !(self.emphasis_sigma.is_finite() && self.emphasis_sigma >= 0.0) {
            return Err(invalid("analysis.emphasis_sigma", self.emphasis_sigma));
        }

        if !self.emphasis_deviations.is_finite() {
            return Err(invalid("analysis.emphasis_deviations", self.emphasis_deviations));
        }

        if !(self.rolloff_percent > 0.0 && self.rolloff_percent < 1.0) {
            return Err(invalid("analysis.rolloff_percent", self.rolloff_percent));
        }

        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm && self.max_bpm.is_finite()) {
            return Err(invalid(
                "analysis.bpm_range",
                format!("{}-{}", self.min_bpm, self.max_bpm),
            ));
        }

        Ok(())
    }
}

/// JSON output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the rhythm map
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of rayon worker threads
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

impl RuntimeConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(invalid("runtime.worker_threads", self.worker_threads));
        }
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> crate::error::RhythmError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original_config = Config::default();
        original_config.analysis.include_edge_breaks = true;
        original_config.analysis.energy_reference = EnergyReference::FramePeak;

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [analysis]
            hop_size = 256
            energy_reference = "frame_peak"
            "#,
        )
        .unwrap();

        assert_eq!(config.analysis.hop_size, 256);
        assert_eq!(config.analysis.frame_size, 2048);
        assert_eq!(config.analysis.energy_reference, EnergyReference::FramePeak);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::from_file(dir.path().join("nope.toml"));
        assert!(matches!(
            result,
            Err(crate::error::RhythmError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_invalid_hop_size() {
        let mut config = Config::default();
        config.analysis.hop_size = 4096;
        assert!(config.validate().is_err());

        config.analysis.hop_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_frame_size() {
        let mut config = AnalysisConfig::default();
        config.frame_size = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bpm_range() {
        let mut config = Config::default();
        config.analysis.min_bpm = 150.0;
        config.analysis.max_bpm = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_break_durations() {
        let mut config = AnalysisConfig::default();
        config.long_break_duration = 0.1;
        assert!(config.validate().is_err());
    }
}
