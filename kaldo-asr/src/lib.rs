//! kaldo-asr: streaming decode orchestration for lattice-based ASR.
//!
//! This crate sits between a caller feeding waveform chunks and a decoding
//! engine. It owns the stateful part of streaming recognition: feeding
//! features to the search, retroactively down-weighting silence, deciding
//! when an utterance ends, and turning the utterance's lattice into timed,
//! confidence-scored words while keeping stream time continuous.
//!
//! # Architecture
//!
//! The engine is reached only through the traits in [`engine`]:
//!
//! - [`engine::FeaturePipeline`]: waveform to feature frames, with frame weights
//! - [`engine::IncrementalDecoder`]: streaming search, trace-back and lattices
//! - [`engine::Engine`]: builds both from a loaded [`model::Model`]
//!
//! [`recognizer::Recognizer`] drives them block by block, with
//! [`silence`], [`endpoint`] and [`finalize`] doing the per-block work.
//! [`engine::energy`] is a small reference engine.
//!
//! # Quick Start
//!
//! ```ignore
//! use kaldo_asr::audio::read_audio_mono;
//! use kaldo_asr::engine::energy::EnergyEngine;
//! use kaldo_asr::model::Model;
//! use kaldo_asr::recognizer::Recognizer;
//! use std::sync::Arc;
//!
//! let model = Arc::new(Model::from_dir("model")?);
//! let (audio, sample_rate) = read_audio_mono("audio.wav")?;
//!
//! let mut recognizer = Recognizer::new(model, EnergyEngine::default(), sample_rate as f32)?;
//! for result in recognizer.accept_waveform(&audio)? {
//!     println!("{}", result.text);
//! }
//! println!("{}", recognizer.final_result()?.text);
//! ```

pub mod audio;
pub mod chunk;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod finalize;
pub mod fst;
pub mod lattice;
pub mod logging;
pub mod mbr;
pub mod model;
pub mod recognizer;
pub mod silence;
pub mod symbols;
pub mod types;
pub mod word_boundary;
