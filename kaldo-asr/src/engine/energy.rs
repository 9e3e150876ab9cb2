//! Reference engine: log-energy features and a two-state silence/speech
//! decoder.
//!
//! This is not a speech recognizer. It exists so the streaming layer can be
//! driven end to end without a neural scorer: every run of frames louder than
//! a threshold becomes one word. The decoder is still a real incremental
//! Viterbi search with beam pruning, backpointers and lattice generation, so
//! it exercises the same contracts a production engine would.

use crate::config::{DecodableConfig, DecoderConfig};
use crate::engine::{Engine, FeaturePipeline, FrameWeight, IncrementalDecoder, TraceEntry};
use crate::error::{AudioError, DecodeError, Result};
use crate::lattice::{Lattice, LatticeArc, LatticeWeight, StateId};
use crate::logging::{self, Severity};
use crate::model::Model;
use std::collections::HashMap;
use std::ops::Range;

/// Parameters of the reference engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyConfig {
    /// Log mean-square level (16-bit sample scale) separating silence from speech
    pub threshold: f32,
    /// Steepness of the acoustic cost around the threshold
    pub slope: f32,
    /// Graph cost of entering speech from silence
    pub speech_entry_cost: f32,
    /// Final cost of ending an utterance inside speech
    pub speech_final_cost: f32,
    pub silence_phone: u32,
    pub speech_phone: u32,
    /// Word emitted for each speech run; must be in the model's symbol table
    pub word: String,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            // RMS of 100
            threshold: 9.21,
            slope: 1.0,
            speech_entry_cost: 5.0,
            speech_final_cost: 1.0,
            silence_phone: 1,
            speech_phone: 11,
            word: "[unk]".to_string(),
        }
    }
}

/// `ln(1 + e^x)` without overflow.
fn softplus(x: f32) -> f32 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Factory for [`EnergyFeatures`] and [`EnergyDecoder`].
#[derive(Clone, Debug, Default)]
pub struct EnergyEngine {
    pub config: EnergyConfig,
}

impl EnergyEngine {
    pub fn new(config: EnergyConfig) -> Self {
        Self { config }
    }
}

impl Engine for EnergyEngine {
    type Pipeline = EnergyFeatures;
    type Decoder = EnergyDecoder;

    fn feature_pipeline(&self, model: &Model, sample_rate: f32) -> Result<EnergyFeatures> {
        let features = model.features();

        if sample_rate < features.sample_frequency
            || (sample_rate > features.sample_frequency && !features.allow_downsample)
        {
            return Err(AudioError::InvalidSampleRate {
                expected: features.sample_frequency as u32,
                got: sample_rate as u32,
            }
            .into());
        }

        let window = features.window_samples(sample_rate);
        let shift = features.shift_samples(sample_rate);

        if !features.snip_edges {
            logging::emit(
                Severity::Warning,
                "EnergyFeatures",
                "snip-edges=false is not supported, using snip-edges=true",
            );
        }

        Ok(EnergyFeatures::new(window, shift, model.ivector().is_some()))
    }

    fn decoder(&self, model: &Model) -> Result<EnergyDecoder> {
        let label = model
            .symbols()
            .find(&self.config.word)
            .and_then(|label| u32::try_from(label).ok())
            .filter(|&label| label != 0)
            .ok_or_else(|| {
                DecodeError::Engine(format!(
                    "word {:?} is not in the symbol table",
                    self.config.word
                ))
            })?;

        let config = model.config();
        Ok(EnergyDecoder::new(
            self.config.clone(),
            label,
            config.decoder.clone(),
            config.decodable.clone(),
        ))
    }
}

/// Streaming log-energy front end.
///
/// Frames use Kaldi's snip-edges framing: frame `i` covers samples
/// `i * shift .. i * shift + window`.
#[derive(Clone, Debug)]
pub struct EnergyFeatures {
    window: usize,
    shift: usize,
    /// Samples from the start of the next frame onwards
    pending: Vec<f32>,
    /// Samples still to drop before the next frame starts (`shift > window`)
    skip: usize,
    /// Absolute index of `energies[0]`
    base: usize,
    energies: Vec<f32>,
    weights: Vec<f32>,
    finished: bool,
    adaptive: bool,
    weight_sum: f64,
    weighted_energy_sum: f64,
}

impl EnergyFeatures {
    /// `adaptive` enables weighted adaptation statistics.
    pub fn new(window: usize, shift: usize, adaptive: bool) -> Self {
        Self {
            window: window.max(1),
            shift: shift.max(1),
            pending: Vec::new(),
            skip: 0,
            base: 0,
            energies: Vec::new(),
            weights: Vec::new(),
            finished: false,
            adaptive,
            weight_sum: 0.0,
            weighted_energy_sum: 0.0,
        }
    }

    /// Log energy of a feature frame.
    pub fn log_energy(&self, frame: usize) -> Option<f32> {
        self.energies.get(frame.checked_sub(self.base)?).copied()
    }

    /// Current weight of a feature frame.
    pub fn weight(&self, frame: usize) -> Option<f32> {
        self.weights.get(frame.checked_sub(self.base)?).copied()
    }

    /// Frames currently held in memory.
    pub fn num_frames_stored(&self) -> usize {
        self.energies.len()
    }

    /// Weighted mean log energy over all frames, the adaptation statistic.
    pub fn adaptation_mean(&self) -> Option<f32> {
        (self.adaptive && self.weight_sum > 0.0)
            .then(|| (self.weighted_energy_sum / self.weight_sum) as f32)
    }
}

impl FeaturePipeline for EnergyFeatures {
    fn accept_waveform(&mut self, samples: &[f32]) {
        if self.finished {
            return;
        }

        let dropped = self.skip.min(samples.len());
        self.skip -= dropped;
        self.pending.extend_from_slice(&samples[dropped..]);

        let mut start = 0;
        while start + self.window <= self.pending.len() {
            let frame = &self.pending[start..start + self.window];
            let mean_square = frame.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>()
                / self.window as f64;
            let energy = mean_square.ln_1p() as f32;

            self.energies.push(energy);
            self.weights.push(1.0);
            self.weight_sum += 1.0;
            self.weighted_energy_sum += f64::from(energy);

            start += self.shift;
        }
        if start > self.pending.len() {
            self.skip = start - self.pending.len();
            self.pending.clear();
        } else {
            self.pending.drain(..start);
        }
    }

    fn input_finished(&mut self) {
        self.finished = true;
        self.pending.clear();
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn num_frames_ready(&self) -> usize {
        self.base + self.energies.len()
    }

    fn supports_frame_weights(&self) -> bool {
        self.adaptive
    }

    fn update_frame_weights(&mut self, first_frame: usize, weights: &[FrameWeight]) {
        for fw in weights {
            let Some(frame) = (first_frame + fw.frame).checked_sub(self.base) else {
                continue;
            };
            let Some(old) = self.weights.get_mut(frame) else {
                continue;
            };
            let delta = f64::from(fw.weight - *old);
            *old = fw.weight;
            self.weight_sum += delta;
            self.weighted_energy_sum += delta * f64::from(self.energies[frame]);
        }
    }

    fn discard_before(&mut self, frame: usize) {
        let count = frame.saturating_sub(self.base).min(self.energies.len());
        self.energies.drain(..count);
        self.weights.drain(..count);
        self.base += count;
    }
}

const SILENCE: usize = 0;
const SPEECH: usize = 1;
const NUM_STATES: usize = 2;

#[derive(Clone, Copy, Debug)]
struct Token {
    state: usize,
    /// Best scaled cost from the utterance start
    cost: f32,
    back: Option<usize>,
    /// Frames consumed when this token was created
    frame: usize,
}

/// Two-state Viterbi decoder with lattice output.
#[derive(Clone, Debug)]
pub struct EnergyDecoder {
    config: EnergyConfig,
    word: u32,
    search: DecoderConfig,
    decodable: DecodableConfig,
    frame_offset: usize,
    /// Every token of the utterance; index 0 is the start token
    tokens: Vec<Token>,
    /// Tokens alive after each number of consumed frames
    frames: Vec<Range<usize>>,
    /// Unscaled `[silence, speech]` acoustic costs per decoded frame
    acoustic: Vec<[f32; NUM_STATES]>,
}

impl EnergyDecoder {
    pub fn new(
        config: EnergyConfig,
        word: u32,
        search: DecoderConfig,
        decodable: DecodableConfig,
    ) -> Self {
        let mut decoder = Self {
            config,
            word,
            search,
            decodable,
            frame_offset: 0,
            tokens: Vec::new(),
            frames: Vec::new(),
            acoustic: Vec::new(),
        };
        decoder.init_decoding(0);
        decoder
    }

    /// Decoder frame the current utterance started at.
    pub fn frame_offset(&self) -> usize {
        self.frame_offset
    }

    fn fs(&self) -> usize {
        self.decodable.frame_subsampling_factor.max(1)
    }

    fn first_feature_frame(&self) -> usize {
        self.frame_offset * self.fs()
    }

    fn phone(&self, state: usize) -> u32 {
        match state {
            SPEECH => self.config.speech_phone,
            _ => self.config.silence_phone,
        }
    }

    fn graph_cost(&self, from: usize, to: usize) -> f32 {
        if from == SILENCE && to == SPEECH {
            self.config.speech_entry_cost
        } else {
            0.0
        }
    }

    fn word_label(&self, from: usize, to: usize) -> u32 {
        if from == SILENCE && to == SPEECH {
            self.word
        } else {
            0
        }
    }

    fn final_cost(&self, state: usize) -> f32 {
        match state {
            SPEECH => self.config.speech_final_cost,
            _ => 0.0,
        }
    }

    /// Search cost of moving from `from` into `to` on decoder frame `frame`.
    fn arc_cost(&self, from: usize, to: usize, frame: usize) -> f32 {
        self.graph_cost(from, to) + self.acoustic[frame][to] * self.decodable.acoustic_scale
    }

    /// Decoder frames the pipeline can currently supply.
    fn decodable_frames(&self, pipeline: &EnergyFeatures) -> usize {
        let ready = pipeline
            .num_frames_ready()
            .saturating_sub(self.first_feature_frame());

        if pipeline.is_finished() {
            ready.div_ceil(self.fs())
        } else {
            ready / self.fs()
        }
    }

    fn decode_frame(&mut self, pipeline: &EnergyFeatures) -> Result<()> {
        let t = self.acoustic.len();
        let ready = pipeline.num_frames_ready();
        let first = self.first_feature_frame() + t * self.fs();
        let features = first..(first + self.fs()).min(ready);

        if features.is_empty() {
            return Err(DecodeError::FramesUnavailable {
                frame: first,
                ready,
            }
            .into());
        }

        let mut sum = 0.0;
        for f in features.clone() {
            sum += pipeline
                .log_energy(f)
                .ok_or(DecodeError::FramesUnavailable { frame: f, ready })?;
        }
        let energy = sum / features.len() as f32;

        let d = (energy - self.config.threshold) * self.config.slope;
        self.acoustic.push([softplus(d), softplus(-d)]);

        let prev = self.frames[t].clone();
        let mut candidates: Vec<Token> = Vec::with_capacity(NUM_STATES);

        for to in [SILENCE, SPEECH] {
            let best = prev
                .clone()
                .map(|p| (p, self.tokens[p].cost + self.arc_cost(self.tokens[p].state, to, t)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((p, cost)) = best {
                candidates.push(Token {
                    state: to,
                    cost,
                    back: Some(p),
                    frame: t + 1,
                });
            }
        }

        candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        let best = candidates.first().map_or(f32::INFINITY, |tok| tok.cost);
        let within_beam = candidates
            .iter()
            .take_while(|tok| tok.cost <= best + self.search.beam)
            .count();
        let keep = within_beam
            .max(self.search.min_active.min(candidates.len()))
            .min(self.search.max_active.max(1));
        candidates.truncate(keep);

        let start = self.tokens.len();
        self.tokens.extend(candidates);
        self.frames.push(start..self.tokens.len());

        Ok(())
    }

    /// Best token after the last decoded frame, with its final cost added
    /// when `with_final` is set.
    fn best_token(&self, with_final: bool) -> Option<(usize, f32)> {
        self.frames
            .last()?
            .clone()
            .map(|i| {
                let tok = &self.tokens[i];
                let extra = if with_final { self.final_cost(tok.state) } else { 0.0 };
                (i, tok.cost + extra)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn trace_entry(&self, index: usize) -> TraceEntry {
        let tok = &self.tokens[index];
        let from = tok.back.map_or(SILENCE, |b| self.tokens[b].state);

        TraceEntry {
            frame: tok.frame - 1,
            token: index,
            phone: self.phone(tok.state),
            word: self.word_label(from, tok.state),
        }
    }
}

impl IncrementalDecoder for EnergyDecoder {
    type Pipeline = EnergyFeatures;

    fn init_decoding(&mut self, frame_offset: usize) {
        self.frame_offset = frame_offset;
        self.tokens.clear();
        self.tokens.push(Token {
            state: SILENCE,
            cost: 0.0,
            back: None,
            frame: 0,
        });
        self.frames.clear();
        self.frames.push(0..1);
        self.acoustic.clear();
    }

    fn advance_decoding(&mut self, pipeline: &EnergyFeatures) -> Result<()> {
        let target = self.decodable_frames(pipeline);
        while self.acoustic.len() < target {
            self.decode_frame(pipeline)?;
        }
        Ok(())
    }

    fn finalize_decoding(&mut self, pipeline: &EnergyFeatures) -> Result<()> {
        self.advance_decoding(pipeline)?;
        tracing::debug!(
            frame_offset = self.frame_offset,
            frames = self.acoustic.len(),
            tokens = self.tokens.len(),
            "decoding finalized"
        );
        Ok(())
    }

    fn num_frames_decoded(&self) -> usize {
        self.acoustic.len()
    }

    fn frame_subsampling_factor(&self) -> usize {
        self.fs()
    }

    fn traceback(&self) -> impl Iterator<Item = TraceEntry> + '_ {
        let best = if self.acoustic.is_empty() {
            None
        } else {
            self.best_token(false).map(|(i, _)| i)
        };

        std::iter::successors(best, |&i| self.tokens[i].back)
            .take_while(|&i| self.tokens[i].frame > 0)
            .map(|i| self.trace_entry(i))
    }

    fn final_relative_cost(&self) -> f32 {
        match (self.best_token(false), self.best_token(true)) {
            (Some((_, best)), Some((_, best_final))) => best_final - best,
            _ => f32::INFINITY,
        }
    }

    fn lattice(&self, use_final_probs: bool) -> Result<Lattice> {
        let num_frames = self.acoustic.len();
        let final_of = |state: usize| {
            if use_final_probs {
                self.final_cost(state)
            } else {
                0.0
            }
        };

        // Best cost from each token to the end
        let mut beta = vec![f32::INFINITY; self.tokens.len()];
        for q in self.frames[num_frames].clone() {
            beta[q] = final_of(self.tokens[q].state);
        }
        for t in (0..num_frames).rev() {
            for q in self.frames[t + 1].clone() {
                for p in self.frames[t].clone() {
                    let w = self.arc_cost(self.tokens[p].state, self.tokens[q].state, t);
                    beta[p] = beta[p].min(w + beta[q]);
                }
            }
        }

        let cutoff = beta[0] + self.search.lattice_beam;
        let mut lattice = Lattice::new();
        let mut states: HashMap<usize, StateId> = HashMap::new();
        let mut state_of = |lattice: &mut Lattice, token: usize| {
            *states.entry(token).or_insert_with(|| lattice.add_state())
        };

        let start = state_of(&mut lattice, 0);
        lattice.set_start(start);

        for t in 0..num_frames {
            for p in self.frames[t].clone() {
                for q in self.frames[t + 1].clone() {
                    let (from, to) = (self.tokens[p].state, self.tokens[q].state);
                    let w = self.arc_cost(from, to, t);
                    if self.tokens[p].cost + w + beta[q] > cutoff {
                        continue;
                    }

                    let weight = LatticeWeight::new(self.graph_cost(from, to), self.acoustic[t][to]);
                    let arc = LatticeArc::new(
                        self.phone(to),
                        self.word_label(from, to),
                        weight,
                        state_of(&mut lattice, q),
                    );
                    let source = state_of(&mut lattice, p);
                    lattice.add_arc(source, arc)?;
                }
            }
        }

        for q in self.frames[num_frames].clone() {
            if self.tokens[q].cost + beta[q] <= cutoff
                && let Some(&s) = states.get(&q)
            {
                lattice.set_final(s, LatticeWeight::new(final_of(self.tokens[q].state), 0.0));
            }
        }

        tracing::trace!(
            states = lattice.num_states(),
            arcs = lattice.num_arcs(),
            frames = num_frames,
            "lattice generated"
        );

        Ok(lattice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointConfig;
    use crate::mbr::MinimumBayesRisk;

    const WORD: u32 = 7;

    fn decoder(fs: usize) -> EnergyDecoder {
        let decodable = DecodableConfig {
            acoustic_scale: 1.0,
            frame_subsampling_factor: fs,
            ..DecodableConfig::default()
        };
        EnergyDecoder::new(EnergyConfig::default(), WORD, DecoderConfig::default(), decodable)
    }

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (i as f32 * 0.3).sin())
            .collect()
    }

    #[test]
    fn framing_matches_snip_edges() {
        let mut features = EnergyFeatures::new(400, 160, false);
        features.accept_waveform(&vec![0.0; 32000]);

        assert_eq!(features.num_frames_ready(), 198);
        assert_eq!(features.log_energy(0), Some(0.0));
    }

    #[test]
    fn framing_is_independent_of_chunking() {
        let audio = tone(9000, 1000.0);

        let mut whole = EnergyFeatures::new(400, 160, false);
        whole.accept_waveform(&audio);

        let mut pieces = EnergyFeatures::new(400, 160, false);
        for chunk in audio.chunks(333) {
            pieces.accept_waveform(chunk);
        }

        assert_eq!(whole.num_frames_ready(), pieces.num_frames_ready());
        for f in 0..whole.num_frames_ready() {
            let (a, b) = (whole.log_energy(f).unwrap(), pieces.log_energy(f).unwrap());
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn weights_shift_adaptation_mean() {
        let mut features = EnergyFeatures::new(400, 160, true);
        features.accept_waveform(&vec![0.0; 800]);
        features.accept_waveform(&tone(800, 3000.0));
        let before = features.adaptation_mean().unwrap();

        let silent: Vec<FrameWeight> = (0..2)
            .map(|frame| FrameWeight { frame, weight: 0.001 })
            .collect();
        features.update_frame_weights(0, &silent);

        assert!(features.adaptation_mean().unwrap() > before);
        assert!((features.weight(0).unwrap() - 0.001).abs() < 1e-6);
    }

    #[test]
    fn non_adaptive_pipeline_has_no_statistic() {
        let mut features = EnergyFeatures::new(400, 160, false);
        features.accept_waveform(&tone(800, 3000.0));
        assert!(features.adaptation_mean().is_none());
        assert!(!features.supports_frame_weights());
    }

    #[test]
    fn framing_with_gaps_is_independent_of_chunking() {
        let audio = tone(5000, 1000.0);

        let mut whole = EnergyFeatures::new(100, 300, false);
        whole.accept_waveform(&audio);

        let mut pieces = EnergyFeatures::new(100, 300, false);
        for chunk in audio.chunks(7) {
            pieces.accept_waveform(chunk);
        }

        // Frames start every 300 samples up to 4800
        assert_eq!(whole.num_frames_ready(), 17);
        assert_eq!(pieces.num_frames_ready(), 17);
        for f in 0..17 {
            let (a, b) = (whole.log_energy(f).unwrap(), pieces.log_energy(f).unwrap());
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn discarded_frames_keep_indices() {
        let mut features = EnergyFeatures::new(400, 160, true);
        features.accept_waveform(&vec![0.0; 32000]);
        let mean = features.adaptation_mean();

        features.discard_before(50);

        assert_eq!(features.num_frames_ready(), 198);
        assert_eq!(features.num_frames_stored(), 148);
        assert_eq!(features.log_energy(49), None);
        assert_eq!(features.log_energy(50), Some(0.0));
        assert_eq!(features.adaptation_mean(), mean);

        features.update_frame_weights(
            40,
            &[
                FrameWeight { frame: 5, weight: 0.5 },
                FrameWeight { frame: 12, weight: 0.5 },
            ],
        );
        assert_eq!(features.weight(45), None);
        assert!((features.weight(52).unwrap() - 0.5).abs() < 1e-6);

        features.accept_waveform(&vec![0.0; 160]);
        assert_eq!(features.num_frames_ready(), 199);
        assert_eq!(features.log_energy(198), Some(0.0));

        // Going backwards is a no-op
        features.discard_before(10);
        assert_eq!(features.num_frames_stored(), 149);
    }

    #[test]
    fn decodes_floor_then_ceil() {
        let mut features = EnergyFeatures::new(400, 160, false);
        let mut dec = decoder(3);

        features.accept_waveform(&vec![0.0; 32000]);
        dec.advance_decoding(&features).unwrap();
        assert_eq!(dec.num_frames_decoded(), 66);

        let mut features = EnergyFeatures::new(400, 160, false);
        let mut dec = decoder(3);
        features.accept_waveform(&vec![0.0; 32000 - 160]);
        dec.advance_decoding(&features).unwrap();
        assert_eq!(dec.num_frames_decoded(), 65);

        features.input_finished();
        dec.finalize_decoding(&features).unwrap();
        assert_eq!(dec.num_frames_decoded(), 66);
    }

    #[test]
    fn silence_traceback_is_all_silence() {
        let mut features = EnergyFeatures::new(400, 160, false);
        let mut dec = decoder(1);
        features.accept_waveform(&vec![0.0; 4000]);
        dec.advance_decoding(&features).unwrap();

        let trace: Vec<_> = dec.traceback().collect();
        assert_eq!(trace.len(), dec.num_frames_decoded());
        assert!(trace.iter().all(|e| e.phone == 1 && e.word == 0));
        assert_eq!(trace[0].frame, dec.num_frames_decoded() - 1);

        let config = EndpointConfig {
            silence_phones: vec![1],
            ..EndpointConfig::default()
        };
        assert_eq!(config.trailing_silence_frames(dec.traceback()), trace.len());
    }

    #[test]
    fn speech_burst_emits_one_word() {
        let mut audio = vec![0.0; 3200];
        audio.extend(tone(4800, 3000.0));
        audio.extend(vec![0.0; 3200]);

        let mut features = EnergyFeatures::new(400, 160, false);
        let mut dec = decoder(1);
        features.accept_waveform(&audio);
        features.input_finished();
        dec.finalize_decoding(&features).unwrap();

        let words: Vec<_> = dec.traceback().filter(|e| e.word != 0).collect();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, WORD);

        let lattice = dec.lattice(true).unwrap();
        assert!(!lattice.is_empty());

        let best = MinimumBayesRisk::new(&lattice).unwrap().into_one_best();
        assert_eq!(best.len(), 1);
        assert!(best[0].start >= 18 && best[0].start <= 22);
        assert!(best[0].confidence > 0.9);
    }

    #[test]
    fn init_decoding_resets_utterance() {
        let mut features = EnergyFeatures::new(400, 160, false);
        let mut dec = decoder(3);
        features.accept_waveform(&vec![0.0; 16000]);
        dec.advance_decoding(&features).unwrap();
        let decoded = dec.num_frames_decoded();

        dec.init_decoding(decoded);
        assert_eq!(dec.num_frames_decoded(), 0);
        assert_eq!(dec.traceback().count(), 0);

        // Remaining ready frames belong to the new utterance
        features.accept_waveform(&vec![0.0; 16000]);
        dec.advance_decoding(&features).unwrap();
        assert_eq!(decoded + dec.num_frames_decoded(), 198 / 3);
    }

    #[test]
    fn empty_utterance_lattice_has_no_words() {
        let dec = decoder(3);
        let lattice = dec.lattice(true).unwrap();

        assert!(!lattice.is_empty());
        assert!(MinimumBayesRisk::new(&lattice).unwrap().one_best().is_empty());
        assert!(dec.final_relative_cost().abs() < 1e-6);
    }

    #[test]
    fn softplus_is_stable() {
        assert!((softplus(0.0) - 2f32.ln()).abs() < 1e-6);
        assert!((softplus(100.0) - 100.0).abs() < 1e-6);
        assert!(softplus(-100.0) >= 0.0);
    }
}
