//! Frame-synchronous word lattices.
//!
//! Every arc either consumes one decoder frame (`phone != 0`) or is an
//! epsilon arc. Word labels sit on arcs; the weight is kept as a
//! `(graph, acoustic)` cost pair so the two can be rescaled independently.

use crate::error::DecodeError;
use crate::word_boundary::{PhoneBoundary, WordBoundaryTable};
use std::collections::VecDeque;
use std::ops::Add;

pub type StateId = usize;

/// Word or phone label; 0 is epsilon.
pub type Label = u32;

/// Cost pair in the negated-log domain.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatticeWeight {
    pub graph: f32,
    pub acoustic: f32,
}

impl LatticeWeight {
    /// Neutral weight
    pub const ONE: Self = Self {
        graph: 0.0,
        acoustic: 0.0,
    };

    pub const fn new(graph: f32, acoustic: f32) -> Self {
        Self { graph, acoustic }
    }

    /// Combined cost.
    pub fn cost(self) -> f32 {
        self.graph + self.acoustic
    }

    /// Multiply each component by its scale.
    pub fn scaled(self, graph_scale: f32, acoustic_scale: f32) -> Self {
        Self {
            graph: self.graph * graph_scale,
            acoustic: self.acoustic * acoustic_scale,
        }
    }
}

impl Add for LatticeWeight {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            graph: self.graph + rhs.graph,
            acoustic: self.acoustic + rhs.acoustic,
        }
    }
}

/// Lattice arc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatticeArc {
    /// Phone decoded on this arc's frame, 0 for an epsilon arc
    pub phone: Label,
    /// Word label, 0 if none
    pub word: Label,
    pub weight: LatticeWeight,
    pub next: StateId,
    /// Word-boundary role of `phone`; `None` until the lattice is word-aligned
    pub boundary: Option<PhoneBoundary>,
}

impl LatticeArc {
    pub fn new(phone: Label, word: Label, weight: LatticeWeight, next: StateId) -> Self {
        Self {
            phone,
            word,
            weight,
            next,
            boundary: None,
        }
    }

    /// Whether the arc consumes a decoder frame.
    pub fn consumes_frame(&self) -> bool {
        self.phone != 0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct State {
    arcs: Vec<LatticeArc>,
    final_weight: Option<LatticeWeight>,
}

/// Acyclic weighted automaton over decoder frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lattice {
    states: Vec<State>,
    start: Option<StateId>,
    word_aligned: bool,
}

impl Lattice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    pub fn set_start(&mut self, state: StateId) {
        self.start = Some(state);
    }

    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    pub fn set_final(&mut self, state: StateId, weight: LatticeWeight) {
        self.states[state].final_weight = Some(weight);
    }

    pub fn final_weight(&self, state: StateId) -> Option<LatticeWeight> {
        self.states[state].final_weight
    }

    /// Add an arc leaving `from`. Both ends must already exist.
    pub fn add_arc(&mut self, from: StateId, arc: LatticeArc) -> Result<(), DecodeError> {
        let num_states = self.states.len();
        if let Some(state) = [from, arc.next].into_iter().find(|&s| s >= num_states) {
            return Err(DecodeError::InvalidState { state, num_states });
        }

        self.states[from].arcs.push(arc);
        Ok(())
    }

    pub fn arcs(&self, state: StateId) -> &[LatticeArc] {
        &self.states[state].arcs
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(|s| s.arcs.len()).sum()
    }

    /// No start state, or no final state at all.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() || self.states.iter().all(|s| s.final_weight.is_none())
    }

    /// Whether [`word_align`](Self::word_align) produced this lattice.
    pub fn is_word_aligned(&self) -> bool {
        self.word_aligned
    }

    /// Scale graph and acoustic costs of every arc and final weight.
    pub fn scale(&mut self, graph_scale: f32, acoustic_scale: f32) {
        for state in &mut self.states {
            for arc in &mut state.arcs {
                arc.weight = arc.weight.scaled(graph_scale, acoustic_scale);
            }
            if let Some(weight) = state.final_weight.as_mut() {
                *weight = weight.scaled(graph_scale, acoustic_scale);
            }
        }
    }

    /// Annotate each frame arc with its phone's word-boundary role.
    ///
    /// Phones absent from the table stay unannotated and are treated as part
    /// of whatever word surrounds them.
    pub fn word_align(mut self, table: &WordBoundaryTable) -> Self {
        for state in &mut self.states {
            for arc in &mut state.arcs {
                if arc.consumes_frame() {
                    arc.boundary = table.get(arc.phone);
                }
            }
        }
        self.word_aligned = true;
        self
    }

    /// States reachable from the start, in topological order.
    pub fn topo_order(&self) -> Result<Vec<StateId>, DecodeError> {
        let Some(start) = self.start else {
            return Ok(Vec::new());
        };

        let reachable = self.reachable(start);
        let mut in_degree = vec![0usize; self.states.len()];

        for s in (0..self.states.len()).filter(|&s| reachable[s]) {
            for arc in &self.states[s].arcs {
                in_degree[arc.next] += 1;
            }
        }

        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some(s) = queue.pop_front() {
            order.push(s);
            for arc in &self.states[s].arcs {
                in_degree[arc.next] -= 1;
                if in_degree[arc.next] == 0 {
                    queue.push_back(arc.next);
                }
            }
        }

        if order.len() != reachable.iter().filter(|&&r| r).count() {
            return Err(DecodeError::CyclicLattice);
        }

        Ok(order)
    }

    /// Frame index of every state, given a topological order.
    ///
    /// Unreachable states keep time 0.
    pub fn state_times(&self, order: &[StateId]) -> Vec<usize> {
        let mut times = vec![0usize; self.states.len()];

        for &s in order {
            for arc in &self.states[s].arcs {
                let t = times[s] + usize::from(arc.consumes_frame());
                times[arc.next] = times[arc.next].max(t);
            }
        }

        times
    }

    fn reachable(&self, start: StateId) -> Vec<bool> {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![start];
        seen[start] = true;

        while let Some(s) = stack.pop() {
            for arc in &self.states[s].arcs {
                if !seen[arc.next] {
                    seen[arc.next] = true;
                    stack.push(arc.next);
                }
            }
        }

        seen
    }
}
