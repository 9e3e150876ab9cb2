//! Turning a finished utterance's lattice into timed, scored words.

use crate::engine::IncrementalDecoder;
use crate::error::{DecodeWarning, Result};
use crate::lattice::Lattice;
use crate::mbr::MinimumBayesRisk;
use crate::model::Model;
use crate::types::{UtteranceResult, WordResult};

/// Graph cost scale applied before MBR.
pub const DEFAULT_GRAPH_SCALE: f32 = 9.0;
/// Acoustic cost scale applied before MBR.
pub const DEFAULT_ACOUSTIC_SCALE: f32 = 10.0;
/// Seconds per decoder frame used for output times.
pub const DEFAULT_FRAME_DURATION: f32 = 0.03;

/// Lattice post-processing constants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinalizerConfig {
    pub graph_scale: f32,
    pub acoustic_scale: f32,
    pub frame_duration: f32,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            graph_scale: DEFAULT_GRAPH_SCALE,
            acoustic_scale: DEFAULT_ACOUSTIC_SCALE,
            frame_duration: DEFAULT_FRAME_DURATION,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Finalizer {
    pub config: FinalizerConfig,
}

impl Finalizer {
    pub fn new(config: FinalizerConfig) -> Self {
        Self { config }
    }

    /// Flush the decoder and extract the utterance result.
    ///
    /// `frame_offset` is the stream frame the utterance started at. Does not
    /// reset the decoder.
    pub fn finalize<D: IncrementalDecoder>(
        &self,
        decoder: &mut D,
        pipeline: &D::Pipeline,
        model: &Model,
        frame_offset: usize,
    ) -> Result<UtteranceResult> {
        decoder.finalize_decoding(pipeline)?;

        if decoder.num_frames_decoded() == 0 {
            tracing::debug!(frame_offset, "finalizing utterance with no frames");
            return Ok(UtteranceResult::empty(DecodeWarning::NoFramesDecoded));
        }

        let lattice = decoder.lattice(true)?;
        self.words_from_lattice(lattice, model, frame_offset)
    }

    /// Rescale, align and MBR-decode a lattice into words.
    pub fn words_from_lattice(
        &self,
        mut lattice: Lattice,
        model: &Model,
        frame_offset: usize,
    ) -> Result<UtteranceResult> {
        if lattice.is_empty() {
            tracing::warn!(frame_offset, "empty lattice, utterance has no result");
            return Ok(UtteranceResult::empty(DecodeWarning::EmptyLattice));
        }

        lattice.scale(self.config.graph_scale, self.config.acoustic_scale);

        let lattice = match model.word_boundary() {
            Some(table) => lattice.word_align(table),
            None => lattice,
        };

        let hypotheses = MinimumBayesRisk::new(&lattice)?.into_one_best();
        let symbols = model.symbols();
        let seconds = |frame: usize| (frame_offset + frame) as f32 * self.config.frame_duration;

        let words = hypotheses
            .into_iter()
            .map(|hyp| {
                let word = match symbols.get(i64::from(hyp.word)) {
                    Some(word) => word.to_string(),
                    None => {
                        tracing::warn!(label = hyp.word, "word label missing from symbol table");
                        hyp.word.to_string()
                    }
                };

                WordResult {
                    word,
                    start: seconds(hyp.start),
                    end: seconds(hyp.end),
                    conf: hyp.confidence,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            frame_offset,
            words = words.len(),
            aligned = lattice.is_word_aligned(),
            "utterance finalized"
        );

        Ok(UtteranceResult::new(words))
    }
}
