use rand::Rng;

use crate::collapse::{AdjacencyLists, CollapseError, Solver};
use crate::grid::Grid2D;
use crate::tile::Tile;

use super::{
    adjacency_from_neighbors, oriented_ids, oriented_weights, ModelError, NeighborRule,
    OrientedIds,
};

/// Options of the tiling model. Output dimensions are measured in tiles.
#[derive(Debug, Clone, Copy)]
pub struct TilingOptions {
    pub periodic_output: bool,
    pub out_height: usize,
    pub out_width: usize,
}

/// Assembles an output from an explicit tile set and a left-of adjacency
/// list.
///
/// Every `(tile, orientation)` pair becomes one oriented-tile id, the
/// pattern currency of the solver; a tile's weight is split evenly among
/// its orientations.
pub struct Tiling<T> {
    tiles: Vec<Tile<T>>,
    ids: OrientedIds,
    weights: Vec<f64>,
    adjacency: AdjacencyLists,
    options: TilingOptions,
    tile_size: usize,
}

impl<T> Tiling<T>
where
    T: Clone + PartialEq,
{
    pub fn new(
        tiles: Vec<Tile<T>>,
        neighbors: &[NeighborRule],
        options: TilingOptions,
    ) -> Result<Self, ModelError> {
        let tile_size = validate_tiles(&tiles)?;

        for rule in neighbors {
            for (tile, orientation) in [rule.left, rule.right] {
                if orientation >= tiles[tile].data.len() {
                    return Err(ModelError::new_invalid_orientation(
                        tiles[tile].name.clone(),
                        orientation,
                    ));
                }
            }
        }

        let ids = oriented_ids(&tiles);
        let weights = oriented_weights(&tiles);
        let adjacency = adjacency_from_neighbors(&tiles, &ids, neighbors);

        Ok(Self {
            tiles,
            ids,
            weights,
            adjacency,
            options,
            tile_size,
        })
    }

    pub fn tiles(&self) -> &[Tile<T>] {
        &self.tiles
    }

    /// Edge length of every tile's pixel data.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Runs one solver attempt and renders the oriented tiles into pixels.
    pub fn collapse<R: Rng>(&self, rng: &mut R) -> Result<Grid2D<T>, CollapseError> {
        let solver = Solver::new(
            self.options.out_height,
            self.options.out_width,
            self.options.periodic_output,
            self.weights.clone(),
            self.adjacency.clone(),
        );

        let output = solver.run(rng)?;
        Ok(self.decode(&output))
    }

    /// Lists the de-duplicated left-of rules actually used by a generated
    /// output, walking it the same way neighbour inference walks example
    /// images. A window matching no tile means the output was not produced
    /// by this tile set.
    pub fn observed_neighbors(&self, output: &Grid2D<T>) -> Result<Vec<NeighborRule>, ModelError> {
        super::markov::infer_neighbors(&self.tiles, std::slice::from_ref(output), self.tile_size)
    }

    /// Replicates each cell's oriented tile at `(i * size + y, j * size + x)`.
    fn decode(&self, output: &Grid2D<usize>) -> Grid2D<T> {
        let size = self.tile_size;
        let filler = self.tiles[0].data[0][(0, 0)].clone();
        let mut image = Grid2D::init(output.height() * size, output.width() * size, filler);

        for i in 0..output.height() {
            for j in 0..output.width() {
                let (tile, orientation) = self.ids.to_tile[output[(i, j)]];
                let data = &self.tiles[tile].data[orientation];
                for y in 0..size {
                    for x in 0..size {
                        image[(i * size + y, j * size + x)] = data[(y, x)].clone();
                    }
                }
            }
        }
        image
    }
}

/// Checks that the tile set is non-empty and every orientation grid is
/// square with one shared edge length; returns that length.
pub(super) fn validate_tiles<T>(tiles: &[Tile<T>]) -> Result<usize, ModelError> {
    let first = tiles.first().ok_or_else(ModelError::new_empty_tile_set)?;
    let size = first.data[0].height();
    if size == 0 {
        return Err(ModelError::new_tile_size(first.name.clone()));
    }

    for tile in tiles {
        for data in &tile.data {
            if data.height() != size || data.width() != size {
                return Err(ModelError::new_tile_size(tile.name.clone()));
            }
        }
    }
    Ok(size)
}
