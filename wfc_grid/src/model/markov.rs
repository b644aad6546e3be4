use rand::Rng;

use crate::collapse::CollapseError;
use crate::grid::{Grid2D, GridDir};
use crate::tile::Tile;

use super::{find_oriented_tile, ModelError, NeighborRule, Tiling, TilingOptions};

/// Tiling model whose adjacency list is inferred from example images
/// instead of being supplied.
///
/// Every example must be an exact mosaic of the given tiles; a window that
/// matches no oriented tile makes the tile set incomplete for the example
/// and fails construction.
pub struct Markov<T> {
    inner: Tiling<T>,
    neighbors: Vec<NeighborRule>,
}

impl<T> Markov<T>
where
    T: Clone + PartialEq,
{
    pub fn new(
        tiles: Vec<Tile<T>>,
        samples: &[Grid2D<T>],
        options: TilingOptions,
    ) -> Result<Self, ModelError> {
        let tile_size = super::tiling::validate_tiles(&tiles)?;
        let neighbors = infer_neighbors(&tiles, samples, tile_size)?;
        let inner = Tiling::new(tiles, &neighbors, options)?;

        Ok(Self { inner, neighbors })
    }

    /// The de-duplicated left-of rules observed in the examples.
    pub fn neighbors(&self) -> &[NeighborRule] {
        &self.neighbors
    }

    pub fn tiles(&self) -> &[Tile<T>] {
        self.inner.tiles()
    }

    pub fn collapse<R: Rng>(&self, rng: &mut R) -> Result<Grid2D<T>, CollapseError> {
        self.inner.collapse(rng)
    }

    /// Lists the left-of rules actually used by a generated output.
    pub fn observed_neighbors(&self, output: &Grid2D<T>) -> Result<Vec<NeighborRule>, ModelError> {
        self.inner.observed_neighbors(output)
    }
}

/// Number of scene rotations that turn an observed neighbour direction into
/// the left-of (east) form the declarations use.
fn turns_to_east(dir: GridDir) -> usize {
    match dir {
        GridDir::Right => 0,
        GridDir::Down => 1,
        GridDir::Left => 2,
        GridDir::Up => 3,
    }
}

/// Walks every example in tile-sized strides, matches each window against
/// the oriented tiles and records the four axial neighbourhoods, rotated
/// into left-of form.
pub(super) fn infer_neighbors<T>(
    tiles: &[Tile<T>],
    samples: &[Grid2D<T>],
    tile_size: usize,
) -> Result<Vec<NeighborRule>, ModelError>
where
    T: Clone + PartialEq,
{
    let mut rules: Vec<NeighborRule> = Vec::new();

    for sample in samples {
        if sample.height() % tile_size != 0 || sample.width() % tile_size != 0 {
            return Err(ModelError::new_sample_not_aligned(
                sample.height(),
                sample.width(),
                tile_size,
            ));
        }

        for y in (0..sample.height()).step_by(tile_size) {
            for x in (0..sample.width()).step_by(tile_size) {
                let window = sample.sub(y, x, tile_size, tile_size);
                let observed = find_oriented_tile(&window, tiles)
                    .ok_or_else(|| ModelError::new_unknown_sample((y, x)))?;

                for dir in GridDir::ALL {
                    let ny = y as isize + dir.dy() * tile_size as isize;
                    let nx = x as isize + dir.dx() * tile_size as isize;
                    if ny < 0
                        || nx < 0
                        || ny as usize + tile_size > sample.height()
                        || nx as usize + tile_size > sample.width()
                    {
                        continue;
                    }

                    let neighbour_window =
                        sample.sub(ny as usize, nx as usize, tile_size, tile_size);
                    if let Some(neighbour) = find_oriented_tile(&neighbour_window, tiles) {
                        let rule = rotate_into_rule(tiles, observed, neighbour, dir);
                        if !rules.contains(&rule) {
                            rules.push(rule);
                        }
                    }
                }
            }
        }
    }

    Ok(rules)
}

/// Rewrites an observed `(tile, neighbour)` pair into left-of form by
/// rotating both sides until the neighbour sits to the east.
fn rotate_into_rule<T>(
    tiles: &[Tile<T>],
    observed: (usize, usize),
    neighbour: (usize, usize),
    dir: GridDir,
) -> NeighborRule {
    let turns = turns_to_east(dir);
    let left_orientation = tiles[observed.0].symmetry.rotated_orientation(observed.1, turns);
    let right_orientation = tiles[neighbour.0]
        .symmetry
        .rotated_orientation(neighbour.1, turns);
    NeighborRule::new(observed.0, left_orientation, neighbour.0, right_orientation)
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    use crate::grid::{Grid2D, GridDir};
    use crate::tile::{Symmetry, Tile};

    use super::super::{NeighborRule, TilingOptions};
    use super::{infer_neighbors, turns_to_east, Markov};

    fn options(out: usize) -> TilingOptions {
        TilingOptions {
            periodic_output: false,
            out_height: out,
            out_width: out,
        }
    }

    #[test]
    fn single_tile_sample_infers_one_rule() {
        let tiles = vec![Tile::new(Grid2D::init(1, 1, 4u8), Symmetry::X, 1.0, "a")];
        let sample = Grid2D::init(2, 2, 4u8);

        let rules = infer_neighbors(&tiles, &[sample], 1).unwrap();
        assert_eq!(vec![NeighborRule::new(0, 0, 0, 0)], rules);
    }

    #[test]
    fn inferred_rules_reproduce_the_sample_texture() {
        let tiles = vec![Tile::new(Grid2D::init(1, 1, 4u8), Symmetry::X, 1.0, "a")];
        let sample = Grid2D::init(2, 2, 4u8);
        let model = Markov::new(tiles, &[sample], options(3)).unwrap();

        assert_eq!(1, model.neighbors().len());
        let mut rng = ChaChaRng::seed_from_u64(2);
        let output = model.collapse(&mut rng).unwrap();
        assert!(output.iter().all(|pixel| *pixel == 4));
    }

    #[test]
    fn unknown_window_is_a_hard_error() {
        let tiles = vec![Tile::new(Grid2D::init(1, 1, 4u8), Symmetry::X, 1.0, "a")];
        let sample = Grid2D::from_vec(vec![4u8, 9, 4, 4], 2);

        assert!(infer_neighbors(&tiles, &[sample], 1).is_err());
    }

    #[test]
    fn misaligned_sample_is_rejected() {
        let tiles = vec![Tile::new(Grid2D::init(2, 2, 4u8), Symmetry::X, 1.0, "a")];
        let sample = Grid2D::init(3, 4, 4u8);

        assert!(infer_neighbors(&tiles, &[sample], 2).is_err());
    }

    #[test]
    fn vertical_pairs_are_rotated_into_left_of_form() {
        // Two distinct L tiles stacked vertically; the rule must come out
        // in east orientation with both sides rotated once.
        let top = Tile::new(Grid2D::from_vec(vec![1u8], 1), Symmetry::L, 1.0, "top");
        let bottom = Tile::new(Grid2D::from_vec(vec![2u8], 1), Symmetry::L, 1.0, "bottom");
        let sample = Grid2D::from_vec(vec![1u8, 2], 1);

        let rules = infer_neighbors(&[top, bottom], &[sample], 1).unwrap();
        assert!(rules.contains(&NeighborRule::new(0, 1, 1, 1)));
    }

    #[test]
    fn observed_directions_map_to_expected_turn_counts() {
        assert_eq!(0, turns_to_east(GridDir::Right));
        assert_eq!(1, turns_to_east(GridDir::Down));
        assert_eq!(2, turns_to_east(GridDir::Left));
        assert_eq!(3, turns_to_east(GridDir::Up));
    }
}
