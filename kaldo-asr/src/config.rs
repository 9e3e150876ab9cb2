//! Kaldi-style option files and the typed configuration they resolve into.
//!
//! Option files hold one `--key=value` (or bare `--flag`) per line; `#` starts
//! a comment. The same syntax is used for the built-in defaults of flat model
//! layouts and for caller overrides, so every source goes through
//! [`ModelConfig::apply`].

use crate::endpoint::{EndpointConfig, EndpointRule};
use crate::error::ConfigError;
use std::path::Path;
use std::str::FromStr;

/// Decode/endpoint defaults for flat model layouts, which carry no `model.conf`.
pub const FLAT_LAYOUT_DEFAULTS: &[&str] = &[
    "--min-active=200",
    "--max-active=3000",
    "--beam=10.0",
    "--lattice-beam=2.0",
    "--acoustic-scale=1.0",
    "--frame-subsampling-factor=3",
    "--endpoint.silence-phones=1:2:3:4:5:6:7:8:9:10",
    "--endpoint.rule2.min-trailing-silence=0.5",
    "--endpoint.rule3.min-trailing-silence=1.0",
    "--endpoint.rule4.min-trailing-silence=2.0",
];

/// Weight given to silence frames when silence weighting is enabled.
pub const SILENCE_WEIGHT: f32 = 1e-3;

/// One parsed option: key without the leading dashes, value if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionEntry {
    pub key: String,
    pub value: Option<String>,
    pub line: usize,
}

/// Parse option text into entries, in order.
///
/// `source_name` is used in error messages only.
pub fn parse_options(source_name: &str, text: &str) -> Result<Vec<OptionEntry>, ConfigError> {
    let mut entries = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let malformed = || ConfigError::Malformed {
            source_name: source_name.to_string(),
            line: i + 1,
            text: raw.to_string(),
        };

        let body = line.strip_prefix("--").ok_or_else(malformed)?;

        let (key, value) = match body.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (body, None),
        };

        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(malformed());
        }

        entries.push(OptionEntry {
            key: key.to_string(),
            value,
            line: i + 1,
        });
    }

    Ok(entries)
}

/// Read and parse an option file.
pub fn read_options(path: &Path) -> Result<Vec<OptionEntry>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_options(&path.display().to_string(), &text)
}

fn parse_value<T: FromStr>(key: &str, value: Option<&str>) -> Result<T, ConfigError> {
    let value = value.unwrap_or_default();
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
    match value {
        None | Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Parse a colon-separated integer list such as `1:2:3`.
pub fn parse_phone_list(key: &str, value: &str) -> Result<Vec<u32>, ConfigError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }

    value
        .split(':')
        .map(|s| {
            s.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Search parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DecoderConfig {
    /// Decoding beam; larger is slower and more accurate
    pub beam: f32,
    /// Lattice generation beam
    pub lattice_beam: f32,
    /// Lower bound on active states per frame
    pub min_active: usize,
    /// Upper bound on active states per frame
    pub max_active: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam: 16.0,
            lattice_beam: 10.0,
            min_active: 200,
            max_active: i32::MAX as usize,
        }
    }
}

/// Acoustic scorer evaluation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodableConfig {
    /// Scale applied to acoustic log-likelihoods during search
    pub acoustic_scale: f32,
    /// Feature frames per decoder frame
    pub frame_subsampling_factor: usize,
    /// Feature frames evaluated per scorer call
    pub frames_per_chunk: usize,
    /// Left context at utterance start, -1 for the model default
    pub extra_left_context_initial: i32,
}

impl Default for DecodableConfig {
    fn default() -> Self {
        Self {
            acoustic_scale: 0.1,
            frame_subsampling_factor: 1,
            frames_per_chunk: 20,
            extra_left_context_initial: -1,
        }
    }
}

/// MFCC front-end parameters read from `mfcc.conf`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureConfig {
    pub sample_frequency: f32,
    /// Window length in milliseconds
    pub frame_length_ms: f32,
    /// Window shift in milliseconds
    pub frame_shift_ms: f32,
    pub num_mel_bins: usize,
    pub num_ceps: usize,
    pub low_freq: f32,
    pub high_freq: f32,
    pub use_energy: bool,
    pub dither: f32,
    pub snip_edges: bool,
    pub allow_downsample: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_frequency: 16000.0,
            frame_length_ms: 25.0,
            frame_shift_ms: 10.0,
            num_mel_bins: 23,
            num_ceps: 13,
            low_freq: 20.0,
            high_freq: 0.0,
            use_energy: true,
            dither: 1.0,
            snip_edges: true,
            allow_downsample: false,
        }
    }
}

impl FeatureConfig {
    /// Window length in samples at `sample_rate`.
    pub fn window_samples(&self, sample_rate: f32) -> usize {
        (sample_rate * self.frame_length_ms / 1000.0).round() as usize
    }

    /// Window shift in samples at `sample_rate`.
    pub fn shift_samples(&self, sample_rate: f32) -> usize {
        (sample_rate * self.frame_shift_ms / 1000.0).round() as usize
    }

    /// Apply one `mfcc.conf` option. Returns `false` for unrecognized keys.
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
        match key {
            "sample-frequency" => self.sample_frequency = parse_value(key, value)?,
            "frame-length" => self.frame_length_ms = parse_value(key, value)?,
            "frame-shift" => self.frame_shift_ms = parse_value(key, value)?,
            "num-mel-bins" => self.num_mel_bins = parse_value(key, value)?,
            "num-ceps" => self.num_ceps = parse_value(key, value)?,
            "low-freq" => self.low_freq = parse_value(key, value)?,
            "high-freq" => self.high_freq = parse_value(key, value)?,
            "use-energy" => self.use_energy = parse_flag(key, value)?,
            "dither" => self.dither = parse_value(key, value)?,
            "snip-edges" => self.snip_edges = parse_flag(key, value)?,
            "allow-downsample" => self.allow_downsample = parse_flag(key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Apply every entry of an option file, warning about unknown keys.
    pub fn apply(&mut self, entries: &[OptionEntry]) -> Result<(), ConfigError> {
        for entry in entries {
            if !self.set(&entry.key, entry.value.as_deref())? {
                tracing::warn!(key = %entry.key, line = entry.line, "ignoring unknown feature option");
            }
        }
        Ok(())
    }
}

/// Decoding configuration resolved from a model directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelConfig {
    pub decoder: DecoderConfig,
    pub decodable: DecodableConfig,
    pub endpoint: EndpointConfig,
}

impl ModelConfig {
    /// Configuration for a flat layout: built-in defaults.
    pub fn flat_defaults() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let entries = parse_options("built-in defaults", &FLAT_LAYOUT_DEFAULTS.join("\n"))?;
        config.apply(&entries)?;
        Ok(config)
    }

    /// Apply one option. Returns `false` for unrecognized keys.
    pub fn set(&mut self, key: &str, value: Option<&str>) -> Result<bool, ConfigError> {
        match key {
            "beam" => self.decoder.beam = parse_value(key, value)?,
            "lattice-beam" => self.decoder.lattice_beam = parse_value(key, value)?,
            "min-active" => self.decoder.min_active = parse_value(key, value)?,
            "max-active" => self.decoder.max_active = parse_value(key, value)?,
            "acoustic-scale" => self.decodable.acoustic_scale = parse_value(key, value)?,
            "frame-subsampling-factor" => {
                let factor: usize = parse_value(key, value)?;
                if factor == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: "0".to_string(),
                    });
                }
                self.decodable.frame_subsampling_factor = factor;
            }
            "frames-per-chunk" => self.decodable.frames_per_chunk = parse_value(key, value)?,
            "extra-left-context-initial" => {
                self.decodable.extra_left_context_initial = parse_value(key, value)?
            }
            "endpoint.silence-phones" => {
                self.endpoint.silence_phones =
                    parse_phone_list(key, value.unwrap_or_default())?
            }
            _ => match key.strip_prefix("endpoint.rule") {
                Some(rest) => self.set_rule(key, rest, value)?,
                None => return Ok(false),
            },
        }
        Ok(true)
    }

    fn set_rule(&mut self, key: &str, rest: &str, value: Option<&str>) -> Result<(), ConfigError> {
        let malformed = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.unwrap_or_default().to_string(),
        };

        let (index, field) = rest.split_once('.').ok_or_else(malformed)?;
        let index: usize = index.parse().map_err(|_| malformed())?;

        if !(1..=EndpointConfig::NUM_RULES).contains(&index) {
            return Err(ConfigError::InvalidRule(index));
        }

        let rule: &mut EndpointRule = &mut self.endpoint.rules[index - 1];

        match field {
            "must-contain-nonsilence" => rule.must_contain_nonsilence = parse_flag(key, value)?,
            "min-trailing-silence" => rule.min_trailing_silence = parse_value(key, value)?,
            "max-relative-cost" => rule.max_relative_cost = parse_value(key, value)?,
            "min-utterance-length" => rule.min_utterance_length = parse_value(key, value)?,
            _ => return Err(malformed()),
        }

        Ok(())
    }

    /// Apply every entry in order, warning about unknown keys.
    pub fn apply(&mut self, entries: &[OptionEntry]) -> Result<(), ConfigError> {
        for entry in entries {
            if !self.set(&entry.key, entry.value.as_deref())? {
                tracing::warn!(key = %entry.key, line = entry.line, "ignoring unknown decoding option");
            }
        }
        Ok(())
    }

    /// Apply caller overrides given as `(key, value)` pairs, with or without leading dashes.
    pub fn apply_overrides<I, K, V>(&mut self, overrides: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in overrides {
            let key = key.as_ref().trim_start_matches('-');
            if !self.set(key, Some(value.as_ref()))? {
                tracing::warn!(key, "ignoring unknown override");
            }
        }
        Ok(())
    }

    /// Seconds per decoder frame for a given feature frame shift.
    pub fn decoder_frame_shift(&self, features: &FeatureConfig) -> f32 {
        features.frame_shift_ms / 1000.0 * self.decodable.frame_subsampling_factor as f32
    }
}
