//! Risk-minimizing one-best extraction with word timings and confidences.
//!
//! Arc posteriors come from a forward-backward pass over the (already scaled)
//! lattice costs. The hypothesis is the maximum a-posteriori path; each of its
//! words gets a time span read off the path and a confidence equal to the
//! posterior mass of lattice arcs carrying the same word within the word's
//! time slot.

use crate::error::DecodeError;
use crate::lattice::{Label, Lattice, LatticeArc, StateId};
use crate::word_boundary::PhoneBoundary;
use std::collections::HashMap;

/// One word of the best hypothesis.
#[derive(Clone, Debug, PartialEq)]
pub struct WordHypothesis {
    pub word: Label,
    /// First decoder frame of the word, relative to the utterance
    pub start: usize,
    /// One past the last decoder frame
    pub end: usize,
    /// Posterior confidence in `[0, 1]`
    pub confidence: f32,
}

/// Result of MBR decoding a lattice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MinimumBayesRisk {
    one_best: Vec<WordHypothesis>,
}

/// `-log(exp(-a) + exp(-b))`
fn cost_add(a: f64, b: f64) -> f64 {
    if a == f64::INFINITY {
        return b;
    }
    if b == f64::INFINITY {
        return a;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    lo - (-(hi - lo)).exp().ln_1p()
}

impl MinimumBayesRisk {
    /// Decode `lattice`. An empty lattice, or one with no path to a final
    /// state, yields an empty hypothesis.
    pub fn new(lattice: &Lattice) -> Result<Self, DecodeError> {
        let order = lattice.topo_order()?;
        let Some(&start) = order.first() else {
            return Ok(Self::default());
        };

        let n = lattice.num_states();
        let times = lattice.state_times(&order);

        let mut alpha = vec![f64::INFINITY; n];
        let mut best = vec![f64::INFINITY; n];
        let mut back: Vec<Option<(StateId, usize)>> = vec![None; n];
        alpha[start] = 0.0;
        best[start] = 0.0;

        for &s in &order {
            for (i, arc) in lattice.arcs(s).iter().enumerate() {
                let w = f64::from(arc.weight.cost());
                alpha[arc.next] = cost_add(alpha[arc.next], alpha[s] + w);
                if best[s] + w < best[arc.next] {
                    best[arc.next] = best[s] + w;
                    back[arc.next] = Some((s, i));
                }
            }
        }

        let mut beta = vec![f64::INFINITY; n];
        let mut total = f64::INFINITY;
        let mut best_final: Option<(StateId, f64)> = None;

        for &s in order.iter().rev() {
            if let Some(w) = lattice.final_weight(s) {
                let w = f64::from(w.cost());
                beta[s] = w;
                total = cost_add(total, alpha[s] + w);
                if best[s] + w < best_final.map_or(f64::INFINITY, |(_, c)| c) {
                    best_final = Some((s, best[s] + w));
                }
            }
            for arc in lattice.arcs(s) {
                beta[s] = cost_add(beta[s], f64::from(arc.weight.cost()) + beta[arc.next]);
            }
        }

        let Some((mut state, _)) = best_final.filter(|_| total.is_finite()) else {
            return Ok(Self::default());
        };

        // Posterior mass of word arcs, by word, keyed by start frame
        let mut word_mass: HashMap<Label, Vec<(usize, f64)>> = HashMap::new();
        for &s in &order {
            for arc in lattice.arcs(s).iter().filter(|a| a.word != 0) {
                let cost = alpha[s] + f64::from(arc.weight.cost()) + beta[arc.next] - total;
                word_mass
                    .entry(arc.word)
                    .or_default()
                    .push((times[s], (-cost).exp()));
            }
        }

        let mut path = Vec::new();
        while let Some((prev, i)) = back[state] {
            path.push(lattice.arcs(prev)[i]);
            state = prev;
        }
        path.reverse();

        let mut one_best = word_spans(&path);

        let mut slot_start = 0;
        for hyp in &mut one_best {
            let mass: f64 = word_mass
                .get(&hyp.word)
                .into_iter()
                .flatten()
                .filter(|(t, _)| (slot_start..hyp.end.max(slot_start + 1)).contains(t))
                .map(|(_, p)| p)
                .sum();
            hyp.confidence = mass.clamp(0.0, 1.0) as f32;
            slot_start = hyp.end;
        }

        tracing::trace!(
            states = n,
            words = one_best.len(),
            total_cost = total,
            "mbr decoded lattice"
        );

        Ok(Self { one_best })
    }

    pub fn one_best(&self) -> &[WordHypothesis] {
        &self.one_best
    }

    pub fn into_one_best(self) -> Vec<WordHypothesis> {
        self.one_best
    }
}

/// Read word spans off a path of arcs.
///
/// A word opens on its labelled arc, or earlier at a `Begin`/`Singleton`
/// frame preceding the label. It extends over following frames until a
/// non-word frame, an `End`/`Singleton` frame closes it, or the next word
/// opens. Without boundary information a word lasts until the next label.
fn word_spans(path: &[LatticeArc]) -> Vec<WordHypothesis> {
    let mut words: Vec<WordHypothesis> = Vec::new();
    let mut open = false;
    let mut pending_start: Option<usize> = None;
    let mut t = 0;

    for arc in path {
        let frame = usize::from(arc.consumes_frame());

        if arc.word != 0 {
            let start = match arc.boundary {
                Some(PhoneBoundary::Begin | PhoneBoundary::Singleton) => t,
                _ => pending_start.unwrap_or(t),
            };
            pending_start = None;
            words.push(WordHypothesis {
                word: arc.word,
                start,
                end: t + frame,
                confidence: 0.0,
            });
            open = !matches!(
                arc.boundary,
                Some(PhoneBoundary::End | PhoneBoundary::Singleton)
            );
        } else if arc.consumes_frame() {
            match arc.boundary {
                None | Some(PhoneBoundary::Internal) => {
                    if open && let Some(word) = words.last_mut() {
                        word.end = t + 1;
                    }
                }
                Some(PhoneBoundary::End) => {
                    if open && let Some(word) = words.last_mut() {
                        word.end = t + 1;
                    }
                    open = false;
                }
                Some(PhoneBoundary::Begin | PhoneBoundary::Singleton) => {
                    open = false;
                    pending_start = Some(t);
                }
                Some(PhoneBoundary::Nonword) => {
                    open = false;
                    pending_start = None;
                }
            }
        }

        t += frame;
    }

    words
}
