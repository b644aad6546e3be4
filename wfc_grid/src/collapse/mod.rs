//! # Constraint-solving core
//!
//! The solver collapses a grid of cells, each starting with every pattern
//! possible, into a grid holding exactly one pattern per cell. Every step
//! observes the undecided cell with the lowest entropy, fixes it to a
//! pattern drawn from the input frequencies, and propagates the
//! consequences through per-direction compatibility constraints until the
//! wave is quiescent again.
//!
//! The solver knows nothing about pixels or tiles; the model front-ends in
//! [`crate::model`] translate their inputs into pattern weights and
//! compatibility lists, run a solver per attempt and decode the resulting
//! pattern grid.

mod error;
mod propagator;
mod wave;

pub use error::CollapseError;
pub use propagator::AdjacencyLists;

pub(crate) use error::CollapseErrorKind;

use rand::Rng;

use crate::grid::Grid2D;

use self::propagator::Propagator;
use self::wave::{CellPick, Wave};

/// A single collapse run over a `height` x `width` wave.
///
/// The solver is built once per attempt and discarded afterwards; retrying
/// a failed problem means constructing a fresh instance with a new seed.
/// Pre-run constraints (such as pinning a ground pattern) go through
/// [`Solver::ban`] followed by [`Solver::propagate`] so the support
/// counters stay coherent.
pub struct Solver {
    /// Pattern frequencies, normalised to sum 1.
    weights: Vec<f64>,
    wave: Wave,
    propagator: Propagator,
}

enum Observation {
    Continue,
    Success,
    Failure(usize),
}

impl Solver {
    /// Builds a solver from pattern weights and compatibility lists.
    ///
    /// Patterns that lack any compatible neighbour in some direction can
    /// never be part of a consistent output; they are eliminated from every
    /// cell up front, and the first [`Solver::propagate`] pushes the
    /// consequences.
    pub fn new(
        height: usize,
        width: usize,
        periodic: bool,
        weights: Vec<f64>,
        adjacency: AdjacencyLists,
    ) -> Self {
        let num_patterns = adjacency.len();
        debug_assert_eq!(num_patterns, weights.len());

        let total: f64 = weights.iter().sum();
        let weights: Vec<f64> = weights.into_iter().map(|w| w / total).collect();

        let wave = Wave::new(height, width, &weights);
        let propagator = Propagator::new(height, width, periodic, adjacency);

        let mut solver = Self {
            weights,
            wave,
            propagator,
        };

        for pattern in 0..num_patterns {
            let unsupported = crate::grid::GridDir::ALL
                .iter()
                .any(|dir| solver.propagator.adjacency()[pattern][dir.opposite()].is_empty());
            if unsupported {
                for y in 0..height {
                    for x in 0..width {
                        solver.ban(y, x, pattern);
                    }
                }
            }
        }

        solver
    }

    /// Removes `pattern` from cell `(y, x)`, queuing the elimination for
    /// propagation. No-op when the pattern is already gone.
    pub fn ban(&mut self, y: usize, x: usize, pattern: usize) {
        if self.wave.get_at(y, x, pattern) {
            self.propagator.ban(y, x, pattern);
            self.wave.remove(y * self.wave.width() + x, pattern);
        }
    }

    /// Pushes all queued eliminations through the wave until quiescence.
    pub fn propagate(&mut self) {
        self.propagator.propagate(&mut self.wave);
    }

    /// Position of the first cell that ran out of patterns, if any.
    pub fn contradiction(&self) -> Option<(usize, usize)> {
        let width = self.wave.width();
        self.wave
            .contradiction()
            .map(|cell| (cell / width, cell % width))
    }

    /// Runs the observe/propagate loop to completion.
    ///
    /// Returns the pattern id left in each cell, or the position of the
    /// first contradicting cell.
    pub fn run<R: Rng>(mut self, rng: &mut R) -> Result<Grid2D<usize>, CollapseError> {
        self.propagate();

        loop {
            match self.observe(rng) {
                Observation::Failure(cell) => {
                    let width = self.wave.width();
                    return Err(CollapseError::new(
                        (cell / width, cell % width),
                        CollapseErrorKind::Contradiction,
                    ));
                }
                Observation::Success => return Ok(self.decode()),
                Observation::Continue => self.propagate(),
            }
        }
    }

    /// Fixes the lowest-entropy cell to a pattern drawn from the input
    /// frequencies, eliminating every other pattern there.
    fn observe<R: Rng>(&mut self, rng: &mut R) -> Observation {
        let cell = match self.wave.pick_cell(rng) {
            CellPick::Contradiction(cell) => return Observation::Failure(cell),
            CellPick::Collapsed => return Observation::Success,
            CellPick::Cell(cell) => cell,
        };

        let num_patterns = self.wave.num_patterns();
        let total: f64 = (0..num_patterns)
            .filter(|p| self.wave.get(cell, *p))
            .map(|p| self.weights[p])
            .sum();
        let mut remaining = rng.gen_range(0.0..total);

        // Floating-point leftovers fall through to the last possible pattern.
        let mut chosen = num_patterns - 1;
        for pattern in 0..num_patterns {
            if !self.wave.get(cell, pattern) {
                continue;
            }
            chosen = pattern;
            remaining -= self.weights[pattern];
            if remaining <= 0.0 {
                break;
            }
        }

        let (y, x) = (cell / self.wave.width(), cell % self.wave.width());
        for pattern in 0..num_patterns {
            if pattern != chosen && self.wave.get(cell, pattern) {
                self.propagator.ban(y, x, pattern);
                self.wave.remove(cell, pattern);
            }
        }

        Observation::Continue
    }

    fn decode(&self) -> Grid2D<usize> {
        let mut output = Grid2D::init(self.wave.height(), self.wave.width(), 0usize);
        for y in 0..self.wave.height() {
            for x in 0..self.wave.width() {
                for pattern in 0..self.wave.num_patterns() {
                    if self.wave.get_at(y, x, pattern) {
                        output[(y, x)] = pattern;
                    }
                }
            }
        }
        output
    }
}
