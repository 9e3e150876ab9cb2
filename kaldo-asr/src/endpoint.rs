//! Utterance endpoint detection from trailing silence.
//!
//! A pure decision over the configured rules and the decoder's progress: it
//! says *when* to finalize, never whether decoding succeeded.

use crate::engine::TraceEntry;

/// A single endpointing rule.
///
/// Fires when trailing silence reaches `min_trailing_silence` and every
/// auxiliary condition holds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndpointRule {
    /// Require at least one non-silence frame in the utterance
    pub must_contain_nonsilence: bool,
    /// Minimum trailing silence in seconds
    pub min_trailing_silence: f32,
    /// Maximum relative cost of the best final state (infinity disables)
    pub max_relative_cost: f32,
    /// Minimum total utterance length in seconds
    pub min_utterance_length: f32,
}

impl EndpointRule {
    pub const fn new(
        must_contain_nonsilence: bool,
        min_trailing_silence: f32,
        max_relative_cost: f32,
        min_utterance_length: f32,
    ) -> Self {
        Self {
            must_contain_nonsilence,
            min_trailing_silence,
            max_relative_cost,
            min_utterance_length,
        }
    }

    /// Whether this rule fires for the given observation.
    pub fn activated(&self, input: &EndpointInput) -> bool {
        let utterance_length = input.utterance_length();
        let trailing_silence = input.trailing_silence();
        let contains_nonsilence = utterance_length > trailing_silence;

        (contains_nonsilence || !self.must_contain_nonsilence)
            && trailing_silence >= self.min_trailing_silence
            && input.relative_cost <= self.max_relative_cost
            && utterance_length >= self.min_utterance_length
    }
}

/// Endpointing configuration: silence phones plus the ordered rule set.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointConfig {
    /// Phone ids treated as silence
    pub silence_phones: Vec<u32>,
    pub rules: [EndpointRule; EndpointConfig::NUM_RULES],
}

impl EndpointConfig {
    pub const NUM_RULES: usize = 5;

    /// Times out after 5s of silence, even if nothing was decoded.
    pub const RULE1: EndpointRule = EndpointRule::new(false, 5.0, f32::INFINITY, 0.0);
    /// 0.5s of silence after speech, if the final state is reasonably good.
    pub const RULE2: EndpointRule = EndpointRule::new(true, 0.5, 2.0, 0.0);
    /// 1s of silence after speech, if the final state is not too bad.
    pub const RULE3: EndpointRule = EndpointRule::new(true, 1.0, 8.0, 0.0);
    /// 2s of silence after speech, regardless of the final state.
    pub const RULE4: EndpointRule = EndpointRule::new(true, 2.0, f32::INFINITY, 0.0);
    /// Utterance reached 20s.
    pub const RULE5: EndpointRule = EndpointRule::new(false, 0.0, f32::INFINITY, 20.0);

    /// Whether any rule fires. Rules are evaluated in order; the first match wins.
    pub fn detect(&self, input: &EndpointInput) -> bool {
        match self.rules.iter().position(|rule| rule.activated(input)) {
            Some(i) => {
                tracing::debug!(
                    rule = i + 1,
                    trailing_silence = input.trailing_silence(),
                    utterance_length = input.utterance_length(),
                    relative_cost = input.relative_cost,
                    "endpoint rule fired"
                );
                true
            }
            None => false,
        }
    }

    /// Whether `phone` belongs to the silence set.
    pub fn is_silence(&self, phone: u32) -> bool {
        self.silence_phones.contains(&phone)
    }

    /// Count trailing silence frames on a newest-to-oldest trace-back.
    pub fn trailing_silence_frames<I>(&self, traceback: I) -> usize
    where
        I: IntoIterator<Item = TraceEntry>,
    {
        if self.silence_phones.is_empty() {
            return 0;
        }

        traceback
            .into_iter()
            .take_while(|entry| self.is_silence(entry.phone))
            .count()
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            silence_phones: Vec::new(),
            rules: [Self::RULE1, Self::RULE2, Self::RULE3, Self::RULE4, Self::RULE5],
        }
    }
}

/// Decoder progress observed at one endpoint check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndpointInput {
    pub num_frames_decoded: usize,
    pub trailing_silence_frames: usize,
    /// Seconds per decoder frame
    pub frame_shift: f32,
    /// Cost of the best final state relative to the best state
    pub relative_cost: f32,
}

impl EndpointInput {
    /// Total decoded length in seconds.
    pub fn utterance_length(&self) -> f32 {
        self.num_frames_decoded as f32 * self.frame_shift
    }

    /// Trailing silence in seconds.
    pub fn trailing_silence(&self) -> f32 {
        self.trailing_silence_frames as f32 * self.frame_shift
    }
}
