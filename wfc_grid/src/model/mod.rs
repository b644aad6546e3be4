//! Model front-ends translating concrete inputs into solver problems.
//!
//! The three models share no trait surface with the solver: each extracts
//! pattern weights and compatibility lists its own way, runs a fresh
//! [`Solver`](crate::collapse::Solver) per attempt and decodes the pattern
//! grid back into its own output. What they do share are the free functions
//! below over the tile symmetry tables.

mod markov;
mod overlapping;
mod tiling;

pub use markov::Markov;
pub use overlapping::{Overlapping, OverlappingOptions};
pub use tiling::{Tiling, TilingOptions};

use std::fmt::Display;

use crate::collapse::AdjacencyLists;
use crate::grid::{DirectionTable, Grid2D, GridDir};
use crate::tile::Tile;

/// A neighbourhood declaration: the left tile, in its orientation, may sit
/// immediately to the left of the right tile in its orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborRule {
    pub left: (usize, usize),
    pub right: (usize, usize),
}

impl NeighborRule {
    pub fn new(left_tile: usize, left_orientation: usize, right_tile: usize, right_orientation: usize) -> Self {
        Self {
            left: (left_tile, left_orientation),
            right: (right_tile, right_orientation),
        }
    }
}

/// Mapping between `(tile, orientation)` pairs and the flat oriented-tile
/// ids the solver works with.
pub(crate) struct OrientedIds {
    /// Oriented id to `(tile, orientation)`.
    pub to_tile: Vec<(usize, usize)>,
    /// `[tile][orientation]` to oriented id.
    pub from_tile: Vec<Vec<usize>>,
}

pub(crate) fn oriented_ids<T>(tiles: &[Tile<T>]) -> OrientedIds {
    let mut to_tile = Vec::new();
    let mut from_tile = Vec::with_capacity(tiles.len());

    for (tile_index, tile) in tiles.iter().enumerate() {
        let mut ids = Vec::with_capacity(tile.data.len());
        for orientation in 0..tile.data.len() {
            ids.push(to_tile.len());
            to_tile.push((tile_index, orientation));
        }
        from_tile.push(ids);
    }

    OrientedIds { to_tile, from_tile }
}

/// Splits every tile's weight evenly among its orientations.
pub(crate) fn oriented_weights<T>(tiles: &[Tile<T>]) -> Vec<f64> {
    let mut weights = Vec::new();
    for tile in tiles {
        for _ in 0..tile.data.len() {
            weights.push(tile.weight / tile.data.len() as f64);
        }
    }
    weights
}

/// Direction in which the right-hand tile of a left-of declaration ends up
/// after each of the eight symmetry actions.
const ACTION_DIRECTIONS: [GridDir; 8] = [
    GridDir::Right,
    GridDir::Up,
    GridDir::Left,
    GridDir::Down,
    GridDir::Left,
    GridDir::Down,
    GridDir::Right,
    GridDir::Up,
];

/// Expands the neighbourhood declarations through all eight symmetry
/// actions into per-direction compatibility lists over oriented-tile ids.
///
/// The expansion is materialised as a dense bitmap first and compacted
/// afterwards; every pair is also registered in reverse under the opposite
/// direction, keeping the lists symmetric.
pub(crate) fn adjacency_from_neighbors<T>(
    tiles: &[Tile<T>],
    ids: &OrientedIds,
    neighbors: &[NeighborRule],
) -> AdjacencyLists {
    let oriented_count = ids.to_tile.len();
    let mut dense: Vec<DirectionTable<Vec<bool>>> = vec![
        DirectionTable::new_array([
            vec![false; oriented_count],
            vec![false; oriented_count],
            vec![false; oriented_count],
            vec![false; oriented_count],
        ]);
        oriented_count
    ];

    for rule in neighbors {
        let (left_tile, left_orientation) = rule.left;
        let (right_tile, right_orientation) = rule.right;
        let left_actions = tiles[left_tile].symmetry.action_map();
        let right_actions = tiles[right_tile].symmetry.action_map();

        for (action, direction) in ACTION_DIRECTIONS.iter().enumerate() {
            let left_id = ids.from_tile[left_tile][left_actions[action][left_orientation]];
            let right_id = ids.from_tile[right_tile][right_actions[action][right_orientation]];
            dense[left_id][*direction][right_id] = true;
            dense[right_id][direction.opposite()][left_id] = true;
        }
    }

    dense
        .iter()
        .map(|table| {
            let compact = |dir: GridDir| {
                table[dir]
                    .iter()
                    .enumerate()
                    .filter_map(|(id, set)| set.then_some(id))
                    .collect::<Vec<usize>>()
            };
            DirectionTable::new_array([
                compact(GridDir::Up),
                compact(GridDir::Left),
                compact(GridDir::Right),
                compact(GridDir::Down),
            ])
        })
        .collect()
}

/// Finds the tile and orientation whose pixel data equals `window`.
pub(crate) fn find_oriented_tile<T: PartialEq>(
    window: &Grid2D<T>,
    tiles: &[Tile<T>],
) -> Option<(usize, usize)> {
    for (tile_index, tile) in tiles.iter().enumerate() {
        for (orientation, data) in tile.data.iter().enumerate() {
            if data == window {
                return Some((tile_index, orientation));
            }
        }
    }
    None
}

/// Error raised while building a model from its inputs.
#[derive(Debug)]
pub struct ModelError {
    kind: ModelErrorKind,
}

impl ModelError {
    pub(crate) fn new_orientation_count(tile: String, expected: usize, actual: usize) -> Self {
        Self {
            kind: ModelErrorKind::OrientationCount {
                tile,
                expected,
                actual,
            },
        }
    }

    pub(crate) fn new_invalid_orientation(tile: String, orientation: usize) -> Self {
        Self {
            kind: ModelErrorKind::InvalidOrientation { tile, orientation },
        }
    }

    pub(crate) fn new_empty_tile_set() -> Self {
        Self {
            kind: ModelErrorKind::EmptyTileSet,
        }
    }

    pub(crate) fn new_tile_size(tile: String) -> Self {
        Self {
            kind: ModelErrorKind::TileSize { tile },
        }
    }

    pub(crate) fn new_no_patterns() -> Self {
        Self {
            kind: ModelErrorKind::NoPatterns,
        }
    }

    pub(crate) fn new_no_ground_pattern() -> Self {
        Self {
            kind: ModelErrorKind::NoGroundPattern,
        }
    }

    pub(crate) fn new_bad_symmetry_count(symmetry: usize) -> Self {
        Self {
            kind: ModelErrorKind::BadSymmetryCount(symmetry),
        }
    }

    pub(crate) fn new_output_too_small(height: usize, width: usize) -> Self {
        Self {
            kind: ModelErrorKind::OutputTooSmall { height, width },
        }
    }

    pub(crate) fn new_sample_not_aligned(height: usize, width: usize, tile_size: usize) -> Self {
        Self {
            kind: ModelErrorKind::SampleNotAligned {
                height,
                width,
                tile_size,
            },
        }
    }

    pub(crate) fn new_unknown_sample(pos: (usize, usize)) -> Self {
        Self {
            kind: ModelErrorKind::UnknownSample(pos),
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ModelErrorKind::OrientationCount {
                tile,
                expected,
                actual,
            } => write!(
                f,
                "tile `{tile}` needs {expected} orientations for its symmetry class, got {actual}"
            ),
            ModelErrorKind::InvalidOrientation { tile, orientation } => write!(
                f,
                "orientation {orientation} does not exist for tile `{tile}`"
            ),
            ModelErrorKind::EmptyTileSet => write!(f, "the tile set is empty"),
            ModelErrorKind::TileSize { tile } => write!(
                f,
                "tile `{tile}` is not square or disagrees with the other tiles' size"
            ),
            ModelErrorKind::NoPatterns => {
                write!(f, "no patterns could be extracted from the input")
            }
            ModelErrorKind::NoGroundPattern => write!(
                f,
                "the bottom-middle window of the input was never interned as a pattern"
            ),
            ModelErrorKind::BadSymmetryCount(symmetry) => write!(
                f,
                "symmetry count must lie within 1..=8, got {symmetry}"
            ),
            ModelErrorKind::OutputTooSmall { height, width } => write!(
                f,
                "output size {width}x{height} cannot fit a single pattern"
            ),
            ModelErrorKind::SampleNotAligned {
                height,
                width,
                tile_size,
            } => write!(
                f,
                "sample size {width}x{height} is not a multiple of the tile size {tile_size}"
            ),
            ModelErrorKind::UnknownSample((y, x)) => write!(
                f,
                "the window at position ({y}, {x}) matches no tile in any orientation"
            ),
        }
    }
}

impl std::error::Error for ModelError {}

#[derive(Debug)]
enum ModelErrorKind {
    OrientationCount {
        tile: String,
        expected: usize,
        actual: usize,
    },
    InvalidOrientation {
        tile: String,
        orientation: usize,
    },
    EmptyTileSet,
    TileSize {
        tile: String,
    },
    NoPatterns,
    NoGroundPattern,
    BadSymmetryCount(usize),
    OutputTooSmall {
        height: usize,
        width: usize,
    },
    SampleNotAligned {
        height: usize,
        width: usize,
        tile_size: usize,
    },
    UnknownSample((usize, usize)),
}

#[cfg(test)]
mod test {
    use crate::grid::{Grid2D, GridDir};
    use crate::tile::{Symmetry, Tile};

    use super::{adjacency_from_neighbors, oriented_ids, oriented_weights, NeighborRule};

    fn tiles() -> Vec<Tile<u8>> {
        vec![
            Tile::new(Grid2D::init(1, 1, 0u8), Symmetry::X, 2.0, "blank"),
            Tile::new(Grid2D::from_vec(vec![1u8], 1), Symmetry::L, 1.0, "corner"),
        ]
    }

    #[test]
    fn oriented_id_flattening() {
        let ids = oriented_ids(&tiles());
        assert_eq!(5, ids.to_tile.len());
        assert_eq!((0, 0), ids.to_tile[0]);
        assert_eq!((1, 2), ids.to_tile[3]);
        assert_eq!(3, ids.from_tile[1][2]);
    }

    #[test]
    fn weights_are_split_per_orientation() {
        let weights = oriented_weights(&tiles());
        assert_eq!(vec![2.0, 0.25, 0.25, 0.25, 0.25], weights);
    }

    #[test]
    fn expansion_is_symmetric_under_opposite_directions() {
        let tiles = tiles();
        let ids = oriented_ids(&tiles);
        let adjacency =
            adjacency_from_neighbors(&tiles, &ids, &[NeighborRule::new(0, 0, 1, 0)]);

        for (pattern, table) in adjacency.iter().enumerate() {
            for dir in GridDir::ALL {
                for other in &table[dir] {
                    assert!(
                        adjacency[*other][dir.opposite()].contains(&pattern),
                        "pattern {pattern} lists {other} in {dir:?} but not vice versa"
                    );
                }
            }
        }
    }

    #[test]
    fn self_neighbouring_x_tile_enables_all_directions() {
        let tiles = vec![Tile::new(Grid2D::init(1, 1, 0u8), Symmetry::X, 1.0, "blank")];
        let ids = oriented_ids(&tiles);
        let adjacency =
            adjacency_from_neighbors(&tiles, &ids, &[NeighborRule::new(0, 0, 0, 0)]);

        for dir in GridDir::ALL {
            assert_eq!(vec![0], adjacency[0][dir]);
        }
    }
}
