use crate::grid::{DirectionTable, Grid3D, GridDir};

use super::wave::Wave;

/// Compatibility lists: `adjacency[pattern][direction]` holds every pattern
/// that may sit in the neighbouring cell in that direction.
pub type AdjacencyLists = Vec<DirectionTable<Vec<usize>>>;

/// Arc-consistency engine over the wave.
///
/// For every `(cell, pattern, direction)` it maintains the number of
/// patterns still possible in the neighbouring cell that support the
/// pattern here. A pattern is eliminated from a cell exactly when one of
/// its four counters reaches zero; the elimination is queued on a LIFO
/// worklist and pushed outwards until quiescence.
pub(crate) struct Propagator {
    height: usize,
    width: usize,
    /// Whether wave and output are toric.
    periodic: bool,
    adjacency: AdjacencyLists,
    /// `support[(y, x, pattern)][direction]` counts the supporting patterns
    /// in the neighbour. Counters are signed: a pattern already eliminated
    /// keeps getting decremented below zero, which is harmless and cheaper
    /// than a membership check.
    support: Grid3D<[i32; 4]>,
    /// Eliminations not yet pushed to the neighbours.
    worklist: Vec<(usize, usize, usize)>,
}

impl Propagator {
    pub(crate) fn new(
        height: usize,
        width: usize,
        periodic: bool,
        adjacency: AdjacencyLists,
    ) -> Self {
        let num_patterns = adjacency.len();

        let mut support = Grid3D::init(height, width, num_patterns, [0i32; 4]);
        for y in 0..height {
            for x in 0..width {
                for pattern in 0..num_patterns {
                    let counters = &mut support[(y, x, pattern)];
                    for dir in GridDir::ALL {
                        counters[dir as usize] =
                            adjacency[pattern][dir.opposite()].len() as i32;
                    }
                }
            }
        }

        Self {
            height,
            width,
            periodic,
            adjacency,
            support,
            worklist: Vec::new(),
        }
    }

    pub(crate) fn adjacency(&self) -> &AdjacencyLists {
        &self.adjacency
    }

    #[cfg(test)]
    pub(crate) fn support(&self, y: usize, x: usize, pattern: usize) -> &[i32; 4] {
        &self.support[(y, x, pattern)]
    }

    /// Queues the elimination of `pattern` from cell `(y, x)`.
    ///
    /// The cell's counters are zeroed so a repeated elimination of the same
    /// pattern cannot re-enter propagation.
    pub(crate) fn ban(&mut self, y: usize, x: usize, pattern: usize) {
        self.support[(y, x, pattern)] = [0; 4];
        self.worklist.push((y, x, pattern));
    }

    /// Drains the worklist, eliminating patterns from the wave until every
    /// remaining possibility is supported in all four directions.
    ///
    /// The wave may turn impossible while draining; the whole worklist is
    /// still consumed and the flag is left for the caller to inspect.
    pub(crate) fn propagate(&mut self, wave: &mut Wave) {
        let Propagator {
            height,
            width,
            periodic,
            adjacency,
            support,
            worklist,
        } = self;

        while let Some((y1, x1, pattern)) = worklist.pop() {
            for dir in GridDir::ALL {
                let Some((y2, x2)) = dir.step(y1, x1, *height, *width, *periodic) else {
                    continue;
                };

                for &enabled in &adjacency[pattern][dir] {
                    let counters = &mut support[(y2, x2, enabled)];
                    counters[dir as usize] -= 1;

                    if counters[dir as usize] == 0 {
                        *counters = [0; 4];
                        worklist.push((y2, x2, enabled));
                        wave.remove(y2 * *width + x2, enabled);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::grid::{DirectionTable, GridDir};

    use super::super::wave::Wave;
    use super::{AdjacencyLists, Propagator};

    /// Two patterns that may only sit next to themselves, in any direction.
    fn exclusive_pair() -> AdjacencyLists {
        (0..2)
            .map(|p| DirectionTable::new_array([vec![p], vec![p], vec![p], vec![p]]))
            .collect()
    }

    /// 0 may neighbour anything, 1 only pattern 0.
    fn asymmetric_pair() -> AdjacencyLists {
        vec![
            DirectionTable::new_array([vec![0, 1], vec![0, 1], vec![0, 1], vec![0, 1]]),
            DirectionTable::new_array([vec![0], vec![0], vec![0], vec![0]]),
        ]
    }

    fn arc_consistent(propagator: &Propagator, wave: &Wave) -> bool {
        for y in 0..wave.height() {
            for x in 0..wave.width() {
                for pattern in 0..wave.num_patterns() {
                    if !wave.get_at(y, x, pattern) {
                        continue;
                    }
                    for dir in GridDir::ALL {
                        let Some((ny, nx)) =
                            dir.step(y, x, wave.height(), wave.width(), false)
                        else {
                            continue;
                        };
                        let supported = (0..wave.num_patterns()).any(|q| {
                            wave.get_at(ny, nx, q)
                                && propagator.adjacency()[q][dir.opposite()].contains(&pattern)
                        });
                        if !supported {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    #[test]
    fn initial_support_counts_match_adjacency_sizes() {
        let adjacency = asymmetric_pair();
        let propagator = Propagator::new(2, 3, false, adjacency.clone());

        for y in 0..2 {
            for x in 0..3 {
                for pattern in 0..2 {
                    for dir in GridDir::ALL {
                        assert_eq!(
                            adjacency[pattern][dir.opposite()].len() as i32,
                            propagator.support(y, x, pattern)[dir as usize]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn elimination_cascades_across_the_row() {
        let weights = [0.5, 0.5];
        let mut wave = Wave::new(1, 4, &weights);
        let mut propagator = Propagator::new(1, 4, false, exclusive_pair());

        propagator.ban(0, 0, 1);
        wave.remove(0, 1);
        propagator.propagate(&mut wave);

        for cell in 0..4 {
            assert!(wave.get(cell, 0));
            assert!(!wave.get(cell, 1));
        }
        assert_eq!(None, wave.contradiction());
        assert!(arc_consistent(&propagator, &wave));
    }

    #[test]
    fn quiescence_is_arc_consistent() {
        let weights = [0.5, 0.5];
        let mut wave = Wave::new(3, 3, &weights);
        let mut propagator = Propagator::new(3, 3, false, asymmetric_pair());

        propagator.ban(1, 1, 0);
        wave.remove(4, 0);
        propagator.propagate(&mut wave);

        // Pattern 1 survives only where a neighbouring 0 supports it; the
        // centre itself forces 1, so its neighbours must have dropped 1.
        assert!(wave.get_at(1, 1, 1));
        assert!(!wave.get_at(0, 1, 1));
        assert!(!wave.get_at(1, 0, 1));
        assert!(arc_consistent(&propagator, &wave));
    }

    #[test]
    fn repeated_ban_does_not_reenter_propagation() {
        let weights = [0.5, 0.5];
        let mut wave = Wave::new(1, 2, &weights);
        let mut propagator = Propagator::new(1, 2, false, exclusive_pair());

        propagator.ban(0, 0, 1);
        wave.remove(0, 1);
        propagator.propagate(&mut wave);
        propagator.ban(0, 0, 1);
        propagator.propagate(&mut wave);

        assert!(wave.get(1, 0));
        assert!(!wave.get(1, 1));
        assert_eq!(None, wave.contradiction());
    }

    #[test]
    fn periodic_propagation_wraps() {
        let weights = [0.5, 0.5];
        let mut wave = Wave::new(1, 3, &weights);
        let mut propagator = Propagator::new(1, 3, true, exclusive_pair());

        propagator.ban(0, 0, 1);
        wave.remove(0, 1);
        propagator.propagate(&mut wave);

        assert!(!wave.get(2, 1), "wrap-around neighbour kept a dead pattern");
    }
}
