//! Problem set and tile set documents.
//!
//! Both are TOML: the problem set lists the problems to run per model, the
//! tile set document (one `data.toml` per tile folder) describes tiles,
//! optional subsets and the left-of neighbour declarations.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProblemSet {
    #[serde(default)]
    pub overlapping: Vec<OverlappingProblem>,
    #[serde(default)]
    pub simpletiled: Vec<TiledProblem>,
    #[serde(default)]
    pub markov: Vec<MarkovProblem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverlappingProblem {
    pub name: String,
    /// Pattern edge length.
    #[serde(default = "default_pattern_size")]
    pub n: usize,
    /// Whether the output wraps on both axes.
    #[serde(default)]
    pub periodic: bool,
    #[serde(default = "default_true")]
    pub periodic_input: bool,
    #[serde(default)]
    pub ground: bool,
    /// Number of admitted pattern orientations, 1..=8.
    #[serde(default = "default_symmetry")]
    pub symmetry: usize,
    /// Number of independent outputs to generate.
    #[serde(default = "default_screenshots")]
    pub screenshots: usize,
    #[serde(default = "default_extent")]
    pub width: usize,
    #[serde(default = "default_extent")]
    pub height: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TiledProblem {
    pub name: String,
    #[serde(default = "default_subset")]
    pub subset: String,
    #[serde(default)]
    pub periodic: bool,
    /// Output width in tiles.
    #[serde(default = "default_extent")]
    pub width: usize,
    /// Output height in tiles.
    #[serde(default = "default_extent")]
    pub height: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarkovProblem {
    pub name: String,
    #[serde(default = "default_subset")]
    pub subset: String,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default = "default_extent")]
    pub width: usize,
    #[serde(default = "default_extent")]
    pub height: usize,
    /// Names of the example images to infer neighbour rules from.
    pub inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TileSetDoc {
    /// Tile edge length in pixels.
    pub size: usize,
    #[serde(default)]
    pub subsets: BTreeMap<String, SubsetDef>,
    pub tiles: Vec<TileDef>,
    #[serde(default)]
    pub neighbors: Vec<NeighborDef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubsetDef {
    pub tiles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TileDef {
    pub name: String,
    /// Single-letter symmetry class.
    #[serde(default = "default_symmetry_letter")]
    pub symmetry: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// One left-of declaration; each side is `"tileName"` or `"tileName O"`
/// with an explicit orientation index.
#[derive(Debug, Deserialize)]
pub(crate) struct NeighborDef {
    pub left: String,
    pub right: String,
}

fn default_pattern_size() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_symmetry() -> usize {
    8
}

fn default_screenshots() -> usize {
    2
}

fn default_extent() -> usize {
    48
}

fn default_subset() -> String {
    "tiles".to_string()
}

fn default_symmetry_letter() -> String {
    "X".to_string()
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod test {
    use super::{ProblemSet, TileSetDoc};

    #[test]
    fn overlapping_defaults_are_applied() {
        let set: ProblemSet = toml::from_str(
            r#"
            [[overlapping]]
            name = "flowers"
            ground = true
            "#,
        )
        .unwrap();

        let problem = &set.overlapping[0];
        assert_eq!(3, problem.n);
        assert!(!problem.periodic);
        assert!(problem.periodic_input);
        assert!(problem.ground);
        assert_eq!(8, problem.symmetry);
        assert_eq!(2, problem.screenshots);
        assert_eq!(48, problem.width);
        assert_eq!(48, problem.height);
    }

    #[test]
    fn empty_document_holds_no_problems() {
        let set: ProblemSet = toml::from_str("").unwrap();
        assert!(set.overlapping.is_empty());
        assert!(set.simpletiled.is_empty());
        assert!(set.markov.is_empty());
    }

    #[test]
    fn tile_set_documents_parse() {
        let doc: TileSetDoc = toml::from_str(
            r#"
            size = 3

            [subsets.corners]
            tiles = ["corner"]

            [[tiles]]
            name = "corner"
            symmetry = "L"

            [[tiles]]
            name = "line"
            symmetry = "I"
            weight = 0.5

            [[neighbors]]
            left = "corner 1"
            right = "line"
            "#,
        )
        .unwrap();

        assert_eq!(3, doc.size);
        assert_eq!(2, doc.tiles.len());
        assert_eq!("L", doc.tiles[0].symmetry);
        assert_eq!(1.0, doc.tiles[0].weight, "weight defaults to 1");
        assert_eq!(0.5, doc.tiles[1].weight);
        assert_eq!(1, doc.subsets.len());
        assert_eq!("corner 1", doc.neighbors[0].left);
    }
}
