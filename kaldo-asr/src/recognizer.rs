//! Streaming recognizer: the per-block driver tying the engine, silence
//! weighting, endpointing and finalization together.
//!
//! Audio arrives in caller-sized pieces but is processed in fixed blocks of
//! [`ChunkConfig::samples`]. For each block:
//!
//! 1. samples go into the feature pipeline
//! 2. silence weight corrections from the current best path are applied
//! 3. the decoder advances over every newly ready frame
//! 4. endpoint rules are checked; on a hit the utterance is finalized and
//!    decoding restarts at the new frame offset
//!
//! The feature pipeline lives for the whole stream, so no extracted frame is
//! ever discarded at an utterance boundary.

use crate::chunk::ChunkConfig;
use crate::engine::{Engine, FeaturePipeline, IncrementalDecoder};
use crate::error::{Result, StreamError};
use crate::finalize::{Finalizer, FinalizerConfig};
use crate::model::Model;
use crate::silence::SilenceWeighting;
use crate::types::{PartialResult, UtteranceResult};
use std::sync::Arc;

/// Per-recognizer settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RecognizerConfig {
    pub chunk: ChunkConfig,
    pub finalizer: FinalizerConfig,
}

/// Mutable state of one stream.
struct StreamState<E: Engine> {
    /// Decoder frames in all finalized utterances
    frame_offset: usize,
    pipeline: E::Pipeline,
    decoder: E::Decoder,
    weighting: SilenceWeighting,
}

impl<E: Engine> StreamState<E> {
    fn new(engine: &E, model: &Model, sample_rate: f32) -> Result<Self> {
        let pipeline = engine.feature_pipeline(model, sample_rate)?;
        let mut decoder = engine.decoder(model)?;
        decoder.init_decoding(0);

        let weighting = SilenceWeighting::new(
            model.silence_weighting().clone(),
            decoder.frame_subsampling_factor(),
        );

        Ok(Self {
            frame_offset: 0,
            pipeline,
            decoder,
            weighting,
        })
    }

    /// First feature frame of the current utterance.
    fn first_feature_frame(&self) -> usize {
        self.frame_offset * self.decoder.frame_subsampling_factor()
    }
}

/// Streaming speech recognizer over a shared model.
pub struct Recognizer<E: Engine> {
    model: Arc<Model>,
    engine: E,
    sample_rate: f32,
    config: RecognizerConfig,
    finalizer: Finalizer,
    state: StreamState<E>,
    /// Samples short of a full block
    buffer: Vec<f32>,
    finished: bool,
    /// Seconds per decoder frame
    frame_shift: f32,
}

impl<E: Engine> Recognizer<E> {
    pub fn new(model: Arc<Model>, engine: E, sample_rate: f32) -> Result<Self> {
        Self::with_config(model, engine, sample_rate, RecognizerConfig::default())
    }

    pub fn with_config(
        model: Arc<Model>,
        engine: E,
        sample_rate: f32,
        config: RecognizerConfig,
    ) -> Result<Self> {
        let config = RecognizerConfig {
            chunk: ChunkConfig::new(config.chunk.samples)?,
            ..config
        };
        let state = StreamState::new(&engine, &model, sample_rate)?;
        let frame_shift = model.decoder_frame_shift();

        tracing::debug!(
            sample_rate,
            chunk_samples = config.chunk.samples,
            chunk_secs = config.chunk.duration_secs(sample_rate),
            frame_shift,
            "recognizer created"
        );

        Ok(Self {
            finalizer: Finalizer::new(config.finalizer),
            model,
            engine,
            sample_rate,
            config,
            state,
            buffer: Vec::new(),
            finished: false,
            frame_shift,
        })
    }

    /// Feed samples. Returns every utterance finalized by an endpoint while
    /// processing them, in order.
    pub fn accept_waveform(&mut self, samples: &[f32]) -> Result<Vec<UtteranceResult>> {
        if self.finished {
            return Err(StreamError::Finished.into());
        }

        let size = self.config.chunk.samples;
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(samples);

        let mut results = Vec::new();
        let mut blocks = buffer.chunks_exact(size);
        for block in blocks.by_ref() {
            if let Some(result) = self.process_block(block)? {
                results.push(result);
            }
        }

        self.buffer = blocks.remainder().to_vec();
        Ok(results)
    }

    fn process_block(&mut self, block: &[f32]) -> Result<Option<UtteranceResult>> {
        self.state.pipeline.accept_waveform(block);
        self.update_silence_weights();
        self.state.decoder.advance_decoding(&self.state.pipeline)?;

        let endpoint = &self.model.config().endpoint;
        if self.state.decoder.endpoint_detected(endpoint, self.frame_shift) {
            tracing::debug!(
                frame_offset = self.state.frame_offset,
                frames = self.state.decoder.num_frames_decoded(),
                "endpoint detected"
            );
            return self.finalize_utterance().map(Some);
        }

        Ok(None)
    }

    fn update_silence_weights(&mut self) {
        let state = &mut self.state;
        let first = state.first_feature_frame();
        let ready = state.pipeline.num_frames_ready();

        if !state.weighting.active() || !state.pipeline.supports_frame_weights() || ready <= first {
            return;
        }

        state.weighting.compute_current_traceback(&state.decoder);
        let deltas = state.weighting.delta_weights(ready - first);
        if !deltas.is_empty() {
            state.pipeline.update_frame_weights(first, &deltas);
        }
    }

    fn finalize_utterance(&mut self) -> Result<UtteranceResult> {
        let state = &mut self.state;
        let result = self.finalizer.finalize(
            &mut state.decoder,
            &state.pipeline,
            &self.model,
            state.frame_offset,
        )?;

        state.frame_offset += state.decoder.num_frames_decoded();
        state.decoder.init_decoding(state.frame_offset);
        let first = state.first_feature_frame();
        state.pipeline.discard_before(first);
        state.weighting = SilenceWeighting::new(
            self.model.silence_weighting().clone(),
            state.decoder.frame_subsampling_factor(),
        );

        tracing::info!(
            frame_offset = state.frame_offset,
            words = result.result.len(),
            "utterance complete"
        );

        Ok(result)
    }

    /// Words on the current best path, without finalizing.
    pub fn partial_result(&self) -> PartialResult {
        let symbols = self.model.symbols();
        let mut words: Vec<String> = self
            .state
            .decoder
            .traceback()
            .filter(|entry| entry.word != 0)
            .map(|entry| match symbols.get(i64::from(entry.word)) {
                Some(word) => word.to_string(),
                None => entry.word.to_string(),
            })
            .collect();
        words.reverse();

        PartialResult {
            partial: words.join(" "),
        }
    }

    /// Flush buffered audio, end the stream and finalize the last utterance.
    pub fn final_result(&mut self) -> Result<UtteranceResult> {
        if self.finished {
            return Err(StreamError::Finished.into());
        }

        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            self.state.pipeline.accept_waveform(&rest);
        }
        self.state.pipeline.input_finished();
        self.update_silence_weights();
        self.finished = true;

        self.finalize_utterance()
    }

    /// Drop the current stream and start a new one at frame 0.
    pub fn reset(&mut self) -> Result<()> {
        self.state = StreamState::new(&self.engine, &self.model, self.sample_rate)?;
        self.buffer.clear();
        self.finished = false;
        tracing::debug!("recognizer reset");
        Ok(())
    }

    /// Decoder frames in all finalized utterances of this stream.
    pub fn frame_offset(&self) -> usize {
        self.state.frame_offset
    }

    /// Decoder frames decoded so far in the current utterance.
    pub fn num_frames_decoded(&self) -> usize {
        self.state.decoder.num_frames_decoded()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Feature pipeline of the stream, for inspection.
    pub fn pipeline(&self) -> &E::Pipeline {
        &self.state.pipeline
    }
}
