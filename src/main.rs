use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rhythm_mapper::{AudioDecoder, AudioLoader, Config, RhythmAnalyzer, RhythmError};

#[derive(Parser)]
#[command(
    name = "rhythm-mapper",
    version,
    about = "Analyze an audio track into a rhythm map",
    long_about = "Rhythm-Mapper estimates tempo and beats, finds speech segments, pauses and emphasis points, and derives cut recommendations for video editing. The result is written as a JSON rhythm map."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG, M4A, AAC)
    #[arg(short, long)]
    audio: PathBuf,

    /// Rhythm map output path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write analysis diagnostics as JSON to this path
    #[arg(short, long)]
    diagnostics: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Rhythm-Mapper v{}", env!("CARGO_PKG_VERSION"));
    info!("Audio: {:?}", cli.audio);

    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.runtime.worker_threads)
        .build_global()
        .context("failed to build the analysis thread pool")?;
    info!("Using {} worker threads", config.runtime.worker_threads);

    // Decoding and analysis are CPU-bound
    let audio_path = cli.audio.clone();
    let analysis_config = config.analysis.clone();
    let (map, diagnostics) = tokio::task::spawn_blocking(move || {
        let buffer = AudioLoader::new().decode(&audio_path)?;
        RhythmAnalyzer::with_config(analysis_config).analyze_with_diagnostics(&buffer)
    })
    .await
    .context("analysis task panicked")?
    .map_err(with_user_message)?;

    let json = map.to_json(config.output.pretty)?;
    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write rhythm map to {:?}", path))?;
            info!("Rhythm map saved to: {:?}", path);
        }
        None => println!("{}", json),
    }

    if let Some(path) = &cli.diagnostics {
        let report = serde_json::to_string_pretty(&diagnostics)?;
        tokio::fs::write(path, report)
            .await
            .with_context(|| format!("failed to write diagnostics to {:?}", path))?;
        info!("Diagnostics saved to: {:?}", path);
    }

    Ok(())
}

/// Lead with the user-facing message and keep the error chain for `{:#}` output
fn with_user_message(err: RhythmError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythm_mapper::error::AudioError;

    #[test]
    fn test_user_message_keeps_source_chain() {
        let err = with_user_message(RhythmError::Audio(AudioError::LoadFailed {
            path: "missing.wav".to_string(),
        }));

        assert!(err.to_string().contains("missing.wav"));
        assert!(err.chain().count() >= 2);
        assert!(err.downcast_ref::<RhythmError>().is_some());
        assert!(format!("{:#}", err).contains("Failed to load audio file"));
    }
}
