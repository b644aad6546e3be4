//! Tiles with symmetry classes and the orientation bookkeeping derived from
//! them.

use crate::grid::Grid2D;
use crate::model::ModelError;

/// Symmetry class of a tile, describing how it behaves under rotation and
/// reflection.
///
/// The class decides how many visually distinct orientations the tile has:
/// a fully symmetric `X` tile has one, line tiles (`I`, `Backslash`) have
/// two, `T` and `L` tiles have four and an asymmetric `P` tile has all
/// eight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symmetry {
    X,
    I,
    Backslash,
    T,
    L,
    P,
}

impl Symmetry {
    /// Parses the single-letter notation used by tile set documents.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "X" => Some(Symmetry::X),
            "I" => Some(Symmetry::I),
            "\\" => Some(Symmetry::Backslash),
            "T" => Some(Symmetry::T),
            "L" => Some(Symmetry::L),
            "P" => Some(Symmetry::P),
            _ => None,
        }
    }

    /// Number of distinct orientations of a tile with this symmetry.
    pub fn orientation_count(self) -> usize {
        match self {
            Symmetry::X => 1,
            Symmetry::I | Symmetry::Backslash => 2,
            Symmetry::T | Symmetry::L => 4,
            Symmetry::P => 8,
        }
    }

    /// Maps an orientation to the orientation obtained by rotating the tile
    /// 90 degrees counter-clockwise.
    pub fn rotation_map(self) -> &'static [usize] {
        match self {
            Symmetry::X => &[0],
            Symmetry::I | Symmetry::Backslash => &[1, 0],
            Symmetry::T | Symmetry::L => &[1, 2, 3, 0],
            Symmetry::P => &[1, 2, 3, 0, 5, 6, 7, 4],
        }
    }

    /// Maps an orientation to the orientation obtained by reflecting the
    /// tile along the x axis.
    pub fn reflection_map(self) -> &'static [usize] {
        match self {
            Symmetry::X => &[0],
            Symmetry::I => &[0, 1],
            Symmetry::Backslash => &[1, 0],
            Symmetry::T => &[0, 3, 2, 1],
            Symmetry::L => &[1, 0, 3, 2],
            Symmetry::P => &[4, 7, 6, 5, 0, 3, 2, 1],
        }
    }

    /// Maps `(action, orientation)` to the resulting orientation.
    ///
    /// Actions 0..=3 are 0, 90, 180 and 270 degree counter-clockwise
    /// rotations; actions 4..=7 are the same rotations preceded by a
    /// reflection on the x axis.
    pub fn action_map(self) -> Vec<Vec<usize>> {
        let rotation = self.rotation_map();
        let reflection = self.reflection_map();
        let count = self.orientation_count();

        let mut actions: Vec<Vec<usize>> = Vec::with_capacity(8);
        actions.push((0..count).collect());
        for action in 1..4 {
            let rotated: Vec<usize> = actions[action - 1].iter().map(|o| rotation[*o]).collect();
            actions.push(rotated);
        }
        actions.push((0..count).map(|o| reflection[o]).collect());
        for action in 5..8 {
            let rotated: Vec<usize> = actions[action - 1].iter().map(|o| rotation[*o]).collect();
            actions.push(rotated);
        }
        actions
    }

    /// Orientation reached from `orientation` after `turns` counter-clockwise
    /// rotations of the whole scene.
    pub fn rotated_orientation(self, orientation: usize, turns: usize) -> usize {
        let rotation = self.rotation_map();
        let mut current = orientation;
        for _ in 0..turns {
            current = rotation[current];
        }
        current
    }
}

/// A tile that can be placed on the board, carrying the pixel data of each
/// of its orientations.
#[derive(Debug, Clone)]
pub struct Tile<T> {
    /// Pixel data per orientation; the length matches
    /// [`Symmetry::orientation_count`].
    pub data: Vec<Grid2D<T>>,
    pub symmetry: Symmetry,
    /// Weight of the tile on the distribution of tiles.
    pub weight: f64,
    pub name: String,
}

impl<T: Clone> Tile<T> {
    /// Creates a tile from its base orientation; the remaining orientations
    /// are generated from the symmetry class.
    ///
    /// Orientation `k < 4` is the base rotated `k` times counter-clockwise;
    /// orientation `4 + k` is the base reflected and then rotated `k` times.
    pub fn new(base: Grid2D<T>, symmetry: Symmetry, weight: f64, name: impl Into<String>) -> Self {
        let count = symmetry.orientation_count();
        let mut data = Vec::with_capacity(count);

        let mut current = base;
        for _ in 0..count.min(4) {
            data.push(current.clone());
            current = current.rotated();
        }
        if count == 8 {
            let mut current = data[0].reflected();
            for _ in 0..4 {
                data.push(current.clone());
                current = current.rotated();
            }
        }

        Self {
            data,
            symmetry,
            weight,
            name: name.into(),
        }
    }

    /// Creates a tile from pre-rendered orientations. The number of grids
    /// must match the orientation count of the symmetry class.
    pub fn with_orientations(
        data: Vec<Grid2D<T>>,
        symmetry: Symmetry,
        weight: f64,
        name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        if data.len() != symmetry.orientation_count() {
            return Err(ModelError::new_orientation_count(
                name,
                symmetry.orientation_count(),
                data.len(),
            ));
        }
        Ok(Self {
            data,
            symmetry,
            weight,
            name,
        })
    }
}
