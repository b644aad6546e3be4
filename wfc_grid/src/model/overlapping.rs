use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;

use crate::collapse::{AdjacencyLists, CollapseError, Solver};
use crate::grid::{DirectionTable, Grid2D, GridDir};

use super::ModelError;

/// Options of the overlapping model.
#[derive(Debug, Clone, Copy)]
pub struct OverlappingOptions {
    /// True if the input wraps on both axes.
    pub periodic_input: bool,
    /// True if the output wraps on both axes.
    pub periodic_output: bool,
    /// Output height in pixels.
    pub out_height: usize,
    /// Output width in pixels.
    pub out_width: usize,
    /// How many of the eight pattern orientations are admitted (1..=8).
    pub symmetry: usize,
    /// Pin the input's bottom-middle pattern to the output's bottom row.
    pub ground: bool,
    /// Pattern edge length N.
    pub pattern_size: usize,
}

impl OverlappingOptions {
    /// Height of the wave: every cell anchors a full pattern, so the
    /// non-toric output loses `N - 1` rows.
    pub fn wave_height(&self) -> usize {
        if self.periodic_output {
            self.out_height
        } else {
            self.out_height - self.pattern_size + 1
        }
    }

    pub fn wave_width(&self) -> usize {
        if self.periodic_output {
            self.out_width
        } else {
            self.out_width - self.pattern_size + 1
        }
    }
}

/// Synthesises an output locally consistent with a single example image.
///
/// Construction extracts the N x N pattern set and the overlap
/// compatibilities once; [`Overlapping::collapse`] then runs a fresh solver
/// per attempt, so a failed attempt is retried by calling it again with
/// another seed.
pub struct Overlapping<T> {
    options: OverlappingOptions,
    patterns: Vec<Grid2D<T>>,
    weights: Vec<f64>,
    adjacency: AdjacencyLists,
    ground_pattern: Option<usize>,
}

impl<T> Overlapping<T>
where
    T: Clone + Eq + Hash,
{
    pub fn new(input: &Grid2D<T>, options: OverlappingOptions) -> Result<Self, ModelError> {
        if options.symmetry == 0 || options.symmetry > 8 {
            return Err(ModelError::new_bad_symmetry_count(options.symmetry));
        }
        if !options.periodic_output
            && (options.out_height < options.pattern_size
                || options.out_width < options.pattern_size)
        {
            return Err(ModelError::new_output_too_small(
                options.out_height,
                options.out_width,
            ));
        }

        let (patterns, weights, interned) = extract_patterns(input, &options)?;
        let adjacency = overlap_adjacency(&patterns);

        let ground_pattern = if options.ground {
            let window = input.sub_toric(
                input.height() - 1,
                input.width() / 2,
                options.pattern_size,
                options.pattern_size,
            );
            match interned.get(&window).copied() {
                Some(id) => Some(id),
                None => return Err(ModelError::new_no_ground_pattern()),
            }
        } else {
            None
        };

        Ok(Self {
            options,
            patterns,
            weights,
            adjacency,
            ground_pattern,
        })
    }

    /// The interned patterns, in id order.
    pub fn patterns(&self) -> &[Grid2D<T>] {
        &self.patterns
    }

    /// Runs one solver attempt and decodes the result into pixels.
    pub fn collapse<R: Rng>(&self, rng: &mut R) -> Result<Grid2D<T>, CollapseError> {
        let mut solver = Solver::new(
            self.options.wave_height(),
            self.options.wave_width(),
            self.options.periodic_output,
            self.weights.clone(),
            self.adjacency.clone(),
        );

        if let Some(ground) = self.ground_pattern {
            self.pin_ground(&mut solver, ground)?;
        }

        let output = solver.run(rng)?;
        Ok(self.decode(&output))
    }

    /// Restricts the bottom wave row to the ground pattern and removes the
    /// ground pattern everywhere else, propagating once before the run.
    fn pin_ground(&self, solver: &mut Solver, ground: usize) -> Result<(), CollapseError> {
        let (wave_height, wave_width) = (self.options.wave_height(), self.options.wave_width());

        for x in 0..wave_width {
            for pattern in 0..self.patterns.len() {
                if pattern != ground {
                    solver.ban(wave_height - 1, x, pattern);
                }
            }
        }
        for y in 0..wave_height - 1 {
            for x in 0..wave_width {
                solver.ban(y, x, ground);
            }
        }
        solver.propagate();

        match solver.contradiction() {
            Some(pos) => Err(CollapseError::new(pos, crate::collapse::CollapseErrorKind::Init)),
            None => Ok(()),
        }
    }

    /// Places every wave cell's pattern top-left pixel; in the non-toric
    /// case the trailing rows and columns come from the border patterns'
    /// remaining pixels.
    fn decode(&self, output: &Grid2D<usize>) -> Grid2D<T> {
        let options = &self.options;
        let filler = self.patterns[0][(0, 0)].clone();
        let mut image = Grid2D::init(options.out_height, options.out_width, filler);

        for y in 0..options.wave_height() {
            for x in 0..options.wave_width() {
                image[(y, x)] = self.patterns[output[(y, x)]][(0, 0)].clone();
            }
        }
        if options.periodic_output {
            return image;
        }

        let last_row = options.wave_height() - 1;
        let last_col = options.wave_width() - 1;
        for y in 0..options.wave_height() {
            let pattern = &self.patterns[output[(y, last_col)]];
            for dx in 1..options.pattern_size {
                image[(y, last_col + dx)] = pattern[(0, dx)].clone();
            }
        }
        for x in 0..options.wave_width() {
            let pattern = &self.patterns[output[(last_row, x)]];
            for dy in 1..options.pattern_size {
                image[(last_row + dy, x)] = pattern[(dy, 0)].clone();
            }
        }
        let corner = &self.patterns[output[(last_row, last_col)]];
        for dy in 1..options.pattern_size {
            for dx in 1..options.pattern_size {
                image[(last_row + dy, last_col + dx)] = corner[(dy, dx)].clone();
            }
        }

        image
    }
}

type Interned<T> = HashMap<Grid2D<T>, usize>;

/// Extracts every N x N window (with the admitted orientations) and interns
/// distinct patterns; a pattern's weight is its number of occurrences.
fn extract_patterns<T>(
    input: &Grid2D<T>,
    options: &OverlappingOptions,
) -> Result<(Vec<Grid2D<T>>, Vec<f64>, Interned<T>), ModelError>
where
    T: Clone + Eq + Hash,
{
    let n = options.pattern_size;
    if n == 0 || (!options.periodic_input && (input.height() < n || input.width() < n)) {
        return Err(ModelError::new_no_patterns());
    }

    let max_y = if options.periodic_input {
        input.height()
    } else {
        input.height() - n + 1
    };
    let max_x = if options.periodic_input {
        input.width()
    } else {
        input.width() - n + 1
    };

    let mut interned: Interned<T> = HashMap::new();
    let mut patterns = Vec::new();
    let mut weights: Vec<f64> = Vec::new();

    for y in 0..max_y {
        for x in 0..max_x {
            let base = input.sub_toric(y, x, n, n);
            for variant in orientations(base).into_iter().take(options.symmetry) {
                match interned.get(&variant).copied() {
                    Some(id) => weights[id] += 1.0,
                    None => {
                        interned.insert(variant.clone(), patterns.len());
                        patterns.push(variant);
                        weights.push(1.0);
                    }
                }
            }
        }
    }

    if patterns.is_empty() {
        return Err(ModelError::new_no_patterns());
    }
    Ok((patterns, weights, interned))
}

/// The eight orientations of a window in the fixed admission order:
/// identity, reflection, then each further rotation followed by its
/// reflection.
fn orientations<T: Clone>(base: Grid2D<T>) -> [Grid2D<T>; 8] {
    let r1 = base.rotated();
    let r2 = r1.rotated();
    let r3 = r2.rotated();
    [
        base.clone(),
        base.reflected(),
        r1.clone(),
        r1.reflected(),
        r2.clone(),
        r2.reflected(),
        r3.clone(),
        r3.reflected(),
    ]
}

/// Two patterns are compatible in a direction when every pixel of their
/// overlap region agrees.
fn overlap_compatible<T: PartialEq>(a: &Grid2D<T>, b: &Grid2D<T>, dy: isize, dx: isize) -> bool {
    let x_min = dx.max(0);
    let x_max = if dx < 0 {
        dx + b.width() as isize
    } else {
        a.width() as isize
    };
    let y_min = dy.max(0);
    let y_max = if dy < 0 {
        dy + b.height() as isize
    } else {
        a.height() as isize
    };

    for y in y_min..y_max {
        for x in x_min..x_max {
            if a[(y as usize, x as usize)] != b[((y - dy) as usize, (x - dx) as usize)] {
                return false;
            }
        }
    }
    true
}

fn overlap_adjacency<T: PartialEq>(patterns: &[Grid2D<T>]) -> AdjacencyLists {
    patterns
        .iter()
        .map(|pattern| {
            let list = |dir: GridDir| {
                patterns
                    .iter()
                    .enumerate()
                    .filter_map(|(other_id, other)| {
                        overlap_compatible(pattern, other, dir.dy(), dir.dx()).then_some(other_id)
                    })
                    .collect::<Vec<usize>>()
            };
            DirectionTable::new_array([
                list(GridDir::Up),
                list(GridDir::Left),
                list(GridDir::Right),
                list(GridDir::Down),
            ])
        })
        .collect()
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    use crate::grid::{Grid2D, GridDir};

    use super::{overlap_compatible, Overlapping, OverlappingOptions};

    fn options(out: usize) -> OverlappingOptions {
        OverlappingOptions {
            periodic_input: true,
            periodic_output: true,
            out_height: out,
            out_width: out,
            symmetry: 8,
            ground: false,
            pattern_size: 2,
        }
    }

    fn checkerboard(size: usize) -> Grid2D<u8> {
        let mut data = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                data.push(((y + x) % 2) as u8);
            }
        }
        Grid2D::from_vec(data, size)
    }

    #[test]
    fn solid_input_yields_one_pattern_of_full_weight() {
        let input = Grid2D::init(4, 4, 5u8);
        let mut opts = options(8);
        opts.symmetry = 1;
        let model = Overlapping::new(&input, opts).unwrap();

        assert_eq!(1, model.patterns().len());
        assert_eq!(vec![16.0], model.weights, "one occurrence per window");
    }

    #[test]
    fn solid_input_collapses_to_solid_output() {
        let input = Grid2D::init(4, 4, 5u8);
        let model = Overlapping::new(&input, options(8)).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(0);
        let output = model.collapse(&mut rng).unwrap();
        assert_eq!(8, output.height());
        assert_eq!(8, output.width());
        assert!(output.iter().all(|pixel| *pixel == 5));
    }

    #[test]
    fn checkerboard_collapses_to_a_checkerboard() {
        let mut opts = options(4);
        opts.symmetry = 1;
        let model = Overlapping::new(&checkerboard(2), opts).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(3);
        let output = model.collapse(&mut rng).unwrap();

        let phase = output[(0, 0)];
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!((phase + (y + x) as u8) % 2, output[(y, x)]);
            }
        }
    }

    #[test]
    fn ground_row_is_pinned() {
        // Sky band on top, ground filling the rest; the bottom-middle
        // window anchors the ground pattern.
        let input = Grid2D::from_vec(vec![1u8, 1, 1, 2, 2, 2, 2, 2, 2], 3);
        let opts = OverlappingOptions {
            periodic_input: true,
            periodic_output: true,
            out_height: 4,
            out_width: 4,
            symmetry: 1,
            ground: true,
            pattern_size: 2,
        };
        let model = Overlapping::new(&input, opts).unwrap();

        let mut rng = ChaChaRng::seed_from_u64(1);
        let output = model.collapse(&mut rng).unwrap();

        for x in 0..4 {
            assert_eq!(2, output[(3, x)], "bottom row repeats the input's bottom row");
            assert_eq!(1, output[(0, x)], "the wrapped sky sits right above the ground");
        }

        let rerun = {
            let mut rng = ChaChaRng::seed_from_u64(1);
            model.collapse(&mut rng).unwrap()
        };
        assert_eq!(output, rerun);
    }

    #[test]
    fn ground_without_matching_pattern_is_rejected() {
        // Non-periodic input: windows anchored on the bottom row are never
        // extracted, so the wrapped bottom-middle window matches nothing.
        let input = Grid2D::from_vec(vec![1u8, 2, 1, 2, 1, 2, 1, 2, 1], 3);
        let opts = OverlappingOptions {
            periodic_input: false,
            periodic_output: true,
            out_height: 4,
            out_width: 4,
            symmetry: 1,
            ground: true,
            pattern_size: 2,
        };
        assert!(Overlapping::new(&input, opts).is_err());
    }

    #[test]
    fn overlap_regions_compare_pixelwise() {
        let a = Grid2D::from_vec(vec![1u8, 2, 3, 4], 2);
        let b = Grid2D::from_vec(vec![3u8, 4, 9, 9], 2);
        // b shifted one row down from a: a's bottom row must equal b's top.
        assert!(overlap_compatible(&a, &b, 1, 0));
        assert!(!overlap_compatible(&b, &a, 1, 0));
        assert!(overlap_compatible(&a, &b, GridDir::Down.dy(), GridDir::Down.dx()));
    }

    #[test]
    fn identical_seeds_are_reproducible() {
        let model = Overlapping::new(&checkerboard(2), options(6)).unwrap();

        let run = |seed: u64| {
            let mut rng = ChaChaRng::seed_from_u64(seed);
            model.collapse(&mut rng).unwrap()
        };
        assert_eq!(run(99), run(99));
    }
}
