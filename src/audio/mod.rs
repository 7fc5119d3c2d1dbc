//! # Audio Input Module
//!
//! Holds the [`SampleBuffer`] consumed by the analysis core and the decoder
//! boundary that produces it. Decoding is the only I/O in the crate; the
//! analyzers never open files themselves.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rhythm_mapper::audio::{AudioDecoder, AudioLoader};
//!
//! # fn main() -> rhythm_mapper::Result<()> {
//! let buffer = AudioLoader::new().decode(Path::new("narration.wav"))?;
//! println!("{:.2}s at {} Hz", buffer.duration(), buffer.sample_rate());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod types;
pub use loader::{AudioDecoder, AudioLoader};
pub use types::SampleBuffer;
