//! Error types for kaldo-asr organized by processing stage.

use serde::{Serialize, Serializer};
use std::path::PathBuf;
use thiserror::Error;

/// Recognition error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Model loading stage error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Audio loading stage error
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Decoding stage error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Stream lifecycle error
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Model loading errors. All of them abort model construction.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Required model file not found
    #[error("model file not found: {0}")]
    MissingFile(String),

    /// Neither the combined graph nor the two-part graph is present
    #[error("no decoding graph in {location}: expected HCLG.fst or HCLr.fst + Gr.fst")]
    NoGraph { location: String },

    /// No graph carries output symbols and no words.txt could be read
    #[error("could not resolve a word symbol table in {location}")]
    NoSymbolTable { location: String },

    /// Malformed text symbol table
    #[error("invalid symbol table {path:?} at line {line}: {reason}")]
    InvalidSymbolTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Malformed OpenFst binary
    #[error("invalid fst {path:?}: {reason}")]
    InvalidFst { path: PathBuf, reason: String },

    /// Malformed integer table (disambiguation symbols, word boundaries)
    #[error("invalid table {path:?} at line {line}: {reason}")]
    InvalidTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// IO error while reading a model file
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Hugging Face Hub error
    #[error(transparent)]
    Hub(#[from] hf_hub::api::sync::ApiError),
}

/// Configuration errors (option files, overrides, chunking).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Option line that is not `--key=value` or `--flag`
    #[error("malformed option in {source_name} at line {line}: {text:?}")]
    Malformed {
        source_name: String,
        line: usize,
        text: String,
    },

    /// Option value that cannot be parsed into the expected type
    #[error("invalid value for --{key}: {value:?}")]
    InvalidValue { key: String, value: String },

    /// Endpoint rule index outside 1..=5
    #[error("invalid endpoint rule index {0} (expected 1..=5)")]
    InvalidRule(usize),

    /// Invalid processing block size
    #[error("invalid chunk size: {0} samples (minimum 1)")]
    InvalidChunkSize(usize),

    /// IO error while reading a config file
    #[error("failed to read config {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Audio loading and validation errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample rate validation failed
    #[error("invalid sample rate: expected {expected}Hz, got {got}Hz")]
    InvalidSampleRate { expected: u32, got: u32 },

    /// Channel count validation failed
    #[error("invalid channel count: expected mono or stereo, got {0} channels")]
    InvalidChannels(u16),

    /// IO error during audio loading
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WAV file format error
    #[error(transparent)]
    Hound(#[from] hound::Error),
}

/// Decoding errors. These indicate caller or engine bugs, not bad audio.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Decoder asked for feature frames the pipeline has not produced
    #[error("feature frame {frame} requested but only {ready} are ready")]
    FramesUnavailable { frame: usize, ready: usize },

    /// Lattice contains a cycle and cannot be topologically sorted
    #[error("lattice is cyclic")]
    CyclicLattice,

    /// Lattice arc refers to a state that was never added
    #[error("lattice state {state} does not exist ({num_states} states)")]
    InvalidState { state: usize, num_states: usize },

    /// Engine-specific failure
    #[error("engine error: {0}")]
    Engine(String),
}

/// Stream lifecycle errors.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Audio arrived after the end-of-stream signal
    #[error("stream already finished; call reset() before feeding more audio")]
    Finished,
}

/// Non-fatal conditions reported alongside an utterance result.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeWarning {
    /// Lattice had no successful path, e.g. the utterance was all silence
    #[error("empty lattice")]
    EmptyLattice,

    /// Utterance was finalized before any frame was decoded
    #[error("no frames decoded")]
    NoFramesDecoded,
}

impl Serialize for DecodeWarning {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result type alias for kaldo-asr operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// hound::Error → AudioError → Error
impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::Audio(AudioError::Hound(e))
    }
}

// std::io::Error → AudioError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Audio(AudioError::Io(e))
    }
}

// ApiError → ModelError → Error
impl From<hf_hub::api::sync::ApiError> for Error {
    fn from(e: hf_hub::api::sync::ApiError) -> Self {
        Error::Model(ModelError::Hub(e))
    }
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }
}
