//! # Rhythm-Mapper
//!
//! Turn a decoded audio track into a rhythm map: tempo, beat positions,
//! speech segments and natural breaks, emphasis points, a spectral summary,
//! an energy profile and editing pacing recommendations.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rhythm_mapper::{AudioDecoder, AudioLoader, RhythmAnalyzer};
//!
//! # fn main() -> rhythm_mapper::Result<()> {
//! let buffer = AudioLoader::new().decode("narration.wav".as_ref())?;
//! let map = RhythmAnalyzer::new().analyze(&buffer)?;
//!
//! println!("{:.1} BPM, {} beats", map.tempo(), map.beats().len());
//! for cut in map.pacing().cuts_by_time() {
//!     println!("cut at {:.2}s ({:?})", cut.timestamp, cut.origin);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - sample buffers and file decoding
//! - [`analysis`] - the analyzers and the [`RhythmAnalyzer`] that runs them
//! - [`rhythm_map`] - the validated output document and its JSON form
//! - [`config`] - configuration management
//! - [`error`] - error types
//!
//! The analysis core never touches the filesystem: it takes a
//! [`SampleBuffer`] and returns a [`RhythmMap`]. Decoding lives behind the
//! [`AudioDecoder`] trait so callers can bring their own.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod rhythm_map;

// Re-export commonly used types for convenience
pub use crate::{
    analysis::{AnalysisDiagnostics, RhythmAnalyzer},
    audio::{AudioDecoder, AudioLoader, SampleBuffer},
    config::{AnalysisConfig, Config},
    error::{Result, RhythmError},
    rhythm_map::{RhythmMap, RhythmMapBuilder},
};
