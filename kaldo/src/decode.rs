//! Decode subcommand - stream a WAV file through a recognizer.

use crate::cli::ModelArgs;
use crate::config::RepoConfig;
use eyre::{Context, Result};
use kaldo_asr::audio::read_audio_mono;
use kaldo_asr::chunk::{ChunkConfig, DEFAULT_CHUNK_SAMPLES};
use kaldo_asr::engine::energy::EnergyEngine;
use kaldo_asr::model::Model;
use kaldo_asr::recognizer::{Recognizer, RecognizerConfig};
use kaldo_asr::types::{ModelRepo, UtteranceResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// CLI arguments for decoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Path to input WAV file
    pub audio: PathBuf,

    /// Samples fed to the recognizer per call
    #[arg(long, default_value_t = DEFAULT_CHUNK_SAMPLES)]
    pub chunk_samples: usize,

    /// Decoding option override, e.g. `--set beam=13`
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

/// Resolved configuration for decoding.
#[derive(Debug)]
pub struct Config {
    pub repo: ModelRepo,
    pub audio: PathBuf,
    pub chunk: ChunkConfig,
    pub overrides: Vec<(String, String)>,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let RepoConfig { repo } = args.model.try_into()?;

        Ok(Self {
            repo,
            audio: args.audio,
            chunk: ChunkConfig::new(args.chunk_samples)?,
            overrides: args.set,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let stdout = std::io::stdout();
    decode_to(&config, &mut stdout.lock())
}

/// Decode `config.audio` and write each utterance as a JSON line to `out`.
pub fn decode_to<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    tracing::info!(
        audio = ?config.audio.display(),
        model = %config.repo.location(),
        "decoding"
    );

    let s = Instant::now();

    let model = Model::from_repo_with_overrides(&config.repo, config.overrides.iter().cloned())
        .wrap_err_with(|| format!("failed to load model: {}", config.repo.location()))?;

    tracing::info!(duration = %format_secs(s.elapsed().as_secs_f32()), "model loaded");

    let results = decode_file(Arc::new(model), &config.audio, config.chunk)?;

    for result in &results {
        writeln!(out, "{}", result.to_json()?)?;
    }

    Ok(())
}

/// Stream a WAV file through a new recognizer, `chunk` samples per call.
fn decode_file(model: Arc<Model>, path: &Path, chunk: ChunkConfig) -> Result<Vec<UtteranceResult>> {
    let (audio, sample_rate) = read_audio_mono(path)
        .wrap_err_with(|| format!("failed to load audio: {:?}", path.display()))?;

    // Block size stays at the default; `chunk` only slices the input
    let mut recognizer = Recognizer::with_config(
        model,
        EnergyEngine::default(),
        sample_rate as f32,
        RecognizerConfig::default(),
    )
    .wrap_err("failed to create recognizer")?;

    tracing::debug!(
        chunk_samples = chunk.samples,
        chunks = chunk.count(audio.len()),
        "feeding audio"
    );

    let s = Instant::now();
    let mut results = Vec::new();

    for block in chunk.chunks(audio.iter().copied()) {
        results.extend(recognizer.accept_waveform(&block).wrap_err("decoding failed")?);
    }
    results.push(recognizer.final_result().wrap_err("decoding failed")?);

    tracing::info!(
        duration = %format_secs(s.elapsed().as_secs_f32()),
        audio = %format_secs(audio.len() as f32 / sample_rate as f32),
        utterances = results.len(),
        "decoding completed"
    );

    Ok(results)
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value() {
        assert_eq!(
            parse_key_value("beam=13"),
            Ok(("beam".to_string(), "13".to_string()))
        );
        assert_eq!(
            parse_key_value("endpoint.silence-phones=1:2"),
            Ok(("endpoint.silence-phones".to_string(), "1:2".to_string()))
        );
        assert!(parse_key_value("beam").is_err());
        assert!(parse_key_value("=13").is_err());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let args = Args {
            model: ModelArgs {
                model_id: "model".to_string(),
                model_source: crate::cli::ModelSource::Path,
            },
            audio: PathBuf::from("audio.wav"),
            chunk_samples: 0,
            set: Vec::new(),
        };

        assert!(Config::try_from(args).is_err());
    }

    #[test]
    fn format_secs_two_decimals() {
        assert_eq!(format_secs(1.234), "1.23s");
    }
}
