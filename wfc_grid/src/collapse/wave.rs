use rand::Rng;

/// Outcome of scanning the wave for the next cell to collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellPick {
    /// Some cell has no patterns left; the flat index of the first such cell.
    Contradiction(usize),
    /// Every cell holds exactly one pattern.
    Collapsed,
    /// Flat index of the undecided cell with the lowest entropy.
    Cell(usize),
}

/// Memoised values needed to keep every cell's Shannon entropy current in
/// constant time per elimination.
struct EntropyMemo {
    /// Per cell, the sum of `w * ln w` over the patterns still possible.
    plogp_sum: Vec<f64>,
    /// Per cell, the sum of `w` over the patterns still possible.
    sum: Vec<f64>,
    log_sum: Vec<f64>,
    /// Number of patterns still possible in the cell.
    count: Vec<usize>,
    entropy: Vec<f64>,
}

/// Pattern possibilities for every cell, with entropy memoisation.
///
/// The only write path is [`Wave::remove`]; recomputing the entropy of a
/// cell from scratch on every observation would dominate the runtime, so
/// the five per-cell scalars are updated incrementally instead.
pub(crate) struct Wave {
    /// Normalised pattern frequencies.
    weights: Vec<f64>,
    /// Precomputed `w * ln w` per pattern.
    plogp: Vec<f64>,
    /// Upper bound for the tie-breaking noise, half the smallest `|w ln w|`.
    noise_bound: f64,
    memo: EntropyMemo,
    /// First cell that ran out of patterns, if any.
    contradiction: Option<usize>,
    num_patterns: usize,
    height: usize,
    width: usize,
    /// `bits[cell * num_patterns + pattern]` tells whether the pattern can
    /// still be placed in the cell.
    bits: Vec<bool>,
}

impl Wave {
    /// Builds a wave with every pattern possible in every cell. `weights`
    /// must be normalised to sum 1.
    pub(crate) fn new(height: usize, width: usize, weights: &[f64]) -> Self {
        let num_patterns = weights.len();
        let size = height * width;

        let plogp: Vec<f64> = weights.iter().map(|w| w * w.ln()).collect();
        let noise_bound = plogp
            .iter()
            .fold(f64::INFINITY, |bound, p| bound.min(p.abs() / 2.0));

        let base_plogp: f64 = plogp.iter().sum();
        let base_sum: f64 = weights.iter().sum();
        let base_log_sum = base_sum.ln();
        let base_entropy = base_log_sum - base_plogp / base_sum;

        Self {
            weights: weights.to_vec(),
            plogp,
            noise_bound,
            memo: EntropyMemo {
                plogp_sum: vec![base_plogp; size],
                sum: vec![base_sum; size],
                log_sum: vec![base_log_sum; size],
                count: vec![num_patterns; size],
                entropy: vec![base_entropy; size],
            },
            contradiction: None,
            num_patterns,
            height,
            width,
            bits: vec![true; size * num_patterns],
        }
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn len(&self) -> usize {
        self.height * self.width
    }

    pub(crate) fn num_patterns(&self) -> usize {
        self.num_patterns
    }

    /// Whether `pattern` can still be placed in the cell with flat index
    /// `cell`.
    #[inline]
    pub(crate) fn get(&self, cell: usize, pattern: usize) -> bool {
        self.bits[cell * self.num_patterns + pattern]
    }

    /// Whether `pattern` can still be placed in cell `(y, x)`.
    #[inline]
    pub(crate) fn get_at(&self, y: usize, x: usize, pattern: usize) -> bool {
        self.get(y * self.width + x, pattern)
    }

    /// Number of patterns still possible in the cell.
    pub(crate) fn count(&self, cell: usize) -> usize {
        self.memo.count[cell]
    }

    pub(crate) fn contradiction(&self) -> Option<usize> {
        self.contradiction
    }

    /// Marks `pattern` impossible in the cell, updating the entropy
    /// memoisation. No-op when the pattern is already gone.
    pub(crate) fn remove(&mut self, cell: usize, pattern: usize) {
        let bit = &mut self.bits[cell * self.num_patterns + pattern];
        if !*bit {
            return;
        }
        *bit = false;

        let memo = &mut self.memo;
        memo.plogp_sum[cell] -= self.plogp[pattern];
        memo.sum[cell] -= self.weights[pattern];
        memo.log_sum[cell] = memo.sum[cell].ln();
        memo.count[cell] -= 1;
        memo.entropy[cell] = memo.log_sum[cell] - memo.plogp_sum[cell] / memo.sum[cell];

        if memo.count[cell] == 0 && self.contradiction.is_none() {
            self.contradiction = Some(cell);
        }
    }

    /// Scans for the undecided cell with the lowest entropy.
    ///
    /// A uniform noise term bounded by half the smallest `|w ln w|` breaks
    /// ties between equal-entropy cells without ever reordering cells whose
    /// entropies genuinely differ. Cells already decided (one pattern left)
    /// are skipped.
    pub(crate) fn pick_cell<R: Rng>(&self, rng: &mut R) -> CellPick {
        if let Some(cell) = self.contradiction {
            return CellPick::Contradiction(cell);
        }

        let mut min = f64::INFINITY;
        let mut argmin = None;

        for cell in 0..self.len() {
            if self.count(cell) == 1 {
                continue;
            }
            let entropy = self.memo.entropy[cell];
            // Cheap pre-check before spending a random draw on the noise.
            if entropy <= min {
                let noise = if self.noise_bound > 0.0 {
                    rng.gen_range(0.0..self.noise_bound)
                } else {
                    0.0
                };
                if entropy + noise < min {
                    min = entropy + noise;
                    argmin = Some(cell);
                }
            }
        }

        match argmin {
            Some(cell) => CellPick::Cell(cell),
            None => CellPick::Collapsed,
        }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    use super::{CellPick, Wave};

    fn normalised(weights: &[f64]) -> Vec<f64> {
        let sum: f64 = weights.iter().sum();
        weights.iter().map(|w| w / sum).collect()
    }

    #[test]
    fn memoisation_matches_formulas() {
        let weights = normalised(&[1.0, 2.0, 1.0]);
        let mut wave = Wave::new(1, 2, &weights);
        wave.remove(0, 1);

        let expected_sum = weights[0] + weights[2];
        let expected_plogp =
            weights[0] * weights[0].ln() + weights[2] * weights[2].ln();
        assert!((wave.memo.sum[0] - expected_sum).abs() < 1e-12);
        assert!((wave.memo.plogp_sum[0] - expected_plogp).abs() < 1e-12);
        assert!(
            (wave.memo.entropy[0] - (expected_sum.ln() - expected_plogp / expected_sum)).abs()
                < 1e-12
        );
        assert_eq!(2, wave.count(0));
        assert_eq!(3, wave.count(1));
    }

    #[test]
    fn repeated_removal_is_noop() {
        let weights = normalised(&[1.0, 1.0]);
        let mut wave = Wave::new(1, 1, &weights);
        wave.remove(0, 0);
        let entropy = wave.memo.entropy[0];
        wave.remove(0, 0);
        assert_eq!(entropy, wave.memo.entropy[0]);
        assert_eq!(1, wave.count(0));
    }

    #[test]
    fn decided_cells_are_never_picked() {
        let weights = normalised(&[1.0, 2.0]);
        let mut wave = Wave::new(1, 3, &weights);
        wave.remove(0, 0);
        wave.remove(2, 1);

        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(CellPick::Cell(1), wave.pick_cell(&mut rng));
        }
    }

    #[test]
    fn all_decided_reports_collapsed() {
        let weights = normalised(&[1.0, 2.0]);
        let mut wave = Wave::new(1, 2, &weights);
        wave.remove(0, 0);
        wave.remove(1, 1);

        let mut rng = ChaChaRng::seed_from_u64(7);
        assert_eq!(CellPick::Collapsed, wave.pick_cell(&mut rng));
    }

    #[test]
    fn emptied_cell_reports_contradiction() {
        let weights = normalised(&[1.0, 2.0]);
        let mut wave = Wave::new(1, 2, &weights);
        wave.remove(1, 0);
        wave.remove(1, 1);

        let mut rng = ChaChaRng::seed_from_u64(7);
        assert_eq!(CellPick::Contradiction(1), wave.pick_cell(&mut rng));
        assert_eq!(Some(1), wave.contradiction());
    }

    #[test]
    fn single_pattern_wave_collapses_immediately() {
        let wave = Wave::new(4, 4, &[1.0]);
        let mut rng = ChaChaRng::seed_from_u64(7);
        assert_eq!(CellPick::Collapsed, wave.pick_cell(&mut rng));
    }
}
