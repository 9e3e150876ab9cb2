//! Retroactive down-weighting of silence frames.
//!
//! Adaptation statistics (i-vectors, online CMVN) are better estimated from
//! speech only. Rather than re-extract features, the recognizer reads the
//! decoder's partial best path, classifies each decoded frame, and sends the
//! feature pipeline weight corrections for the frames whose class changed.
//!
//! Work per call is proportional to the part of the best path that changed
//! since the previous call plus the newly decoded frames, never to the whole
//! utterance.

use crate::config::SILENCE_WEIGHT;
use crate::endpoint::EndpointConfig;
use crate::engine::{FrameWeight, IncrementalDecoder, TraceEntry};

/// Silence weighting parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SilenceWeightingConfig {
    /// Weight given to silence frames; 1.0 disables weighting
    pub silence_weight: f32,
    /// Phone ids treated as silence
    pub silence_phones: Vec<u32>,
    /// Runs of one phone longer than this many decoder frames are treated as
    /// silence; 0 or less disables the check
    pub max_state_duration: i32,
}

impl Default for SilenceWeightingConfig {
    fn default() -> Self {
        Self {
            silence_weight: 1.0,
            silence_phones: Vec::new(),
            max_state_duration: -1,
        }
    }
}

impl SilenceWeightingConfig {
    /// Weighting used with a model's endpoint configuration.
    pub fn from_endpoint(endpoint: &EndpointConfig) -> Self {
        Self {
            silence_weight: SILENCE_WEIGHT,
            silence_phones: endpoint.silence_phones.clone(),
            ..Self::default()
        }
    }

    /// Whether weighting changes anything.
    pub fn active(&self) -> bool {
        self.silence_weight != 1.0 && (!self.silence_phones.is_empty() || self.max_state_duration > 0)
    }
}

#[derive(Clone, Copy, Debug)]
struct FrameInfo {
    token: Option<usize>,
    phone: u32,
}

/// Per-utterance silence weighting state.
#[derive(Debug)]
pub struct SilenceWeighting {
    config: SilenceWeightingConfig,
    frame_subsampling_factor: usize,
    /// Best-path info per decoder frame
    frames: Vec<FrameInfo>,
    /// Last weight sent per feature frame
    sent: Vec<Option<f32>>,
    /// First decoder frame whose weight may need resending
    dirty_from: usize,
}

impl SilenceWeighting {
    pub fn new(config: SilenceWeightingConfig, frame_subsampling_factor: usize) -> Self {
        Self {
            config,
            frame_subsampling_factor: frame_subsampling_factor.max(1),
            frames: Vec::new(),
            sent: Vec::new(),
            dirty_from: 0,
        }
    }

    pub fn active(&self) -> bool {
        self.config.active()
    }

    /// Refresh the stored best path from the decoder.
    pub fn compute_current_traceback<D: IncrementalDecoder>(&mut self, decoder: &D) {
        self.update_traceback(decoder.num_frames_decoded(), decoder.traceback());
    }

    /// Refresh from a newest-to-oldest trace-back covering `num_frames` frames.
    ///
    /// Stops at the first frame whose token matches the stored one.
    pub fn update_traceback<I>(&mut self, num_frames: usize, traceback: I)
    where
        I: IntoIterator<Item = TraceEntry>,
    {
        let unset = FrameInfo {
            token: None,
            phone: 0,
        };
        if num_frames < self.frames.len() {
            self.frames.truncate(num_frames);
            self.dirty_from = self.dirty_from.min(num_frames);
        }
        self.frames.resize(num_frames, unset);

        let mut visited = 0;
        for entry in traceback {
            let Some(info) = self.frames.get_mut(entry.frame) else {
                continue;
            };
            if info.token == Some(entry.token) {
                break;
            }
            info.token = Some(entry.token);
            info.phone = entry.phone;
            self.dirty_from = self.dirty_from.min(entry.frame);
            visited += 1;
        }

        if self.config.max_state_duration > 0 {
            // A changed frame can lengthen the run it belongs to
            let phone = self.frames.get(self.dirty_from).map(|f| f.phone);
            while self.dirty_from > 0 && Some(self.frames[self.dirty_from - 1].phone) == phone {
                self.dirty_from -= 1;
            }
        }

        tracing::trace!(num_frames, visited, dirty_from = self.dirty_from, "silence traceback");
    }

    fn is_silence(&self, phone: u32) -> bool {
        self.config.silence_phones.contains(&phone)
    }

    /// Weights of decoder frames `from..`, by phone class and run length.
    fn frame_weights(&self, from: usize) -> Vec<f32> {
        let max_duration = usize::try_from(self.config.max_state_duration).unwrap_or(0);
        let mut weights = Vec::with_capacity(self.frames.len().saturating_sub(from));

        let mut run_start = from;
        while run_start < self.frames.len() {
            let phone = self.frames[run_start].phone;
            let run_end = (run_start..self.frames.len())
                .find(|&i| self.frames[i].phone != phone)
                .unwrap_or(self.frames.len());

            let too_long = max_duration > 0 && run_end - run_start > max_duration;
            let weight = if self.is_silence(phone) || too_long {
                self.config.silence_weight
            } else {
                1.0
            };
            weights.extend(std::iter::repeat_n(weight, run_end - run_start));
            run_start = run_end;
        }

        weights
    }

    /// Feature-frame weights that changed since the previous call.
    ///
    /// `num_frames_ready` counts feature frames of the current utterance.
    /// Frames are relative to the utterance's first feature frame.
    pub fn delta_weights(&mut self, num_frames_ready: usize) -> Vec<FrameWeight> {
        if !self.active() {
            return Vec::new();
        }

        let fs = self.frame_subsampling_factor;
        let from = self.dirty_from.min(self.frames.len());
        let weights = self.frame_weights(from);

        if self.sent.len() < num_frames_ready {
            self.sent.resize(num_frames_ready, None);
        }

        let mut deltas = Vec::new();
        let mut complete_until = from;

        for (i, weight) in weights.into_iter().enumerate() {
            let frame = from + i;
            let features = frame * fs..((frame + 1) * fs).min(num_frames_ready);

            for f in features.clone() {
                if self.sent[f] != Some(weight) {
                    self.sent[f] = Some(weight);
                    deltas.push(FrameWeight { frame: f, weight });
                }
            }

            if features.len() == fs && complete_until == frame {
                complete_until = frame + 1;
            }
        }

        self.dirty_from = complete_until;
        deltas
    }
}
