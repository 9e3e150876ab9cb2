//! Contracts between the streaming layer and a decoding engine.
//!
//! The recognizer drives three collaborators without knowing how they work:
//!
//! - [`FeaturePipeline`]: turns waveform samples into a growing sequence of
//!   feature frames and accepts per-frame weight overrides
//! - [`IncrementalDecoder`]: consumes ready frames, exposes its best-path
//!   trace-back and produces a lattice on demand
//! - [`Engine`]: builds both from a loaded [`Model`]
//!
//! [`energy`] provides a small reference engine implementing these traits.

pub mod energy;

use crate::endpoint::{EndpointConfig, EndpointInput};
use crate::error::Result;
use crate::lattice::Lattice;
use crate::model::Model;

/// One frame of the decoder's current best path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    /// Decoder frame, relative to the utterance start
    pub frame: usize,
    /// Identity of the search token on this frame; equal tokens mean an
    /// unchanged path prefix
    pub token: usize,
    /// Phone being decoded on this frame
    pub phone: u32,
    /// Word label emitted on this frame, 0 if none
    pub word: u32,
}

/// Weight override for one feature frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameWeight {
    /// Feature frame, relative to the utterance's first feature frame
    pub frame: usize,
    /// Weight in `[0, 1]`
    pub weight: f32,
}

/// Waveform-to-feature front end.
///
/// Frames are append-only; weights may be revised after the fact.
pub trait FeaturePipeline {
    /// Append samples (16-bit-equivalent floats at the construction rate).
    fn accept_waveform(&mut self, samples: &[f32]);

    /// Signal that no more samples will arrive.
    fn input_finished(&mut self);

    /// Whether [`input_finished`](Self::input_finished) was called.
    fn is_finished(&self) -> bool;

    /// Number of feature frames computed so far.
    fn num_frames_ready(&self) -> usize;

    /// Whether the pipeline keeps weighted adaptation statistics (i-vectors).
    fn supports_frame_weights(&self) -> bool;

    /// Override frame weights; `first_frame` is the absolute index that
    /// `FrameWeight::frame == 0` refers to.
    fn update_frame_weights(&mut self, first_frame: usize, weights: &[FrameWeight]);

    /// Release frames below `frame`; no later utterance will read them.
    /// Frame indices and [`num_frames_ready`](Self::num_frames_ready) are
    /// unaffected.
    fn discard_before(&mut self, _frame: usize) {}
}

/// Streaming search over a feature pipeline.
pub trait IncrementalDecoder {
    type Pipeline: FeaturePipeline;

    /// Reset for a new utterance starting at decoder frame `frame_offset`.
    fn init_decoding(&mut self, frame_offset: usize);

    /// Consume every frame made ready since the last call.
    fn advance_decoding(&mut self, pipeline: &Self::Pipeline) -> Result<()>;

    /// Flush internal state so a complete lattice can be extracted.
    fn finalize_decoding(&mut self, pipeline: &Self::Pipeline) -> Result<()>;

    /// Decoder frames decoded in the current utterance.
    fn num_frames_decoded(&self) -> usize;

    /// Feature frames per decoder frame.
    fn frame_subsampling_factor(&self) -> usize;

    /// Current best path, newest frame first.
    fn traceback(&self) -> impl Iterator<Item = TraceEntry> + '_;

    /// Cost of the best final state relative to the best state overall.
    fn final_relative_cost(&self) -> f32;

    /// Lattice of the current utterance.
    fn lattice(&self, use_final_probs: bool) -> Result<Lattice>;

    /// Whether the endpoint rules fire on the current state.
    ///
    /// `frame_shift` is seconds per decoder frame.
    fn endpoint_detected(&self, config: &EndpointConfig, frame_shift: f32) -> bool {
        let num_frames_decoded = self.num_frames_decoded();
        if num_frames_decoded == 0 {
            return false;
        }

        config.detect(&EndpointInput {
            num_frames_decoded,
            trailing_silence_frames: config.trailing_silence_frames(self.traceback()),
            frame_shift,
            relative_cost: self.final_relative_cost(),
        })
    }
}

/// Factory for the per-stream engine objects.
pub trait Engine {
    type Pipeline: FeaturePipeline;
    type Decoder: IncrementalDecoder<Pipeline = Self::Pipeline>;

    /// New feature pipeline for audio at `sample_rate`.
    fn feature_pipeline(&self, model: &Model, sample_rate: f32) -> Result<Self::Pipeline>;

    /// New decoder positioned at frame 0.
    fn decoder(&self, model: &Model) -> Result<Self::Decoder>;
}
