//! Loading of tile set folders: the `data.toml` document plus one image
//! per tile (or one image per orientation).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use image::DynamicImage;

use wfc_grid::grid::Grid2D;
use wfc_grid::model::NeighborRule;
use wfc_grid::tile::{Symmetry, Tile};
use wfc_grid::vis::{grid_from_image, VisPixel};

use crate::config::TileSetDoc;

pub(crate) struct LoadedTileSet {
    pub tiles: Vec<Tile<VisPixel>>,
    pub neighbors: Vec<NeighborRule>,
}

/// Reads `<dir>/data.toml` and the referenced tile images, keeping only the
/// tiles of the named subset when the document defines it.
///
/// Neighbour declarations referencing tiles outside the subset are dropped
/// silently; everything else that is malformed fails the whole set.
pub(crate) fn load(dir: &Path, subset: &str) -> Result<LoadedTileSet> {
    let doc_path = dir.join("data.toml");
    let text = fs::read_to_string(&doc_path)
        .with_context(|| format!("reading tile set document {}", doc_path.display()))?;
    let doc: TileSetDoc = toml::from_str(&text)
        .with_context(|| format!("parsing tile set document {}", doc_path.display()))?;

    if doc.size == 0 {
        bail!("tile size is zero in {}", doc_path.display());
    }

    let allowed: Option<HashSet<&str>> = doc
        .subsets
        .get(subset)
        .map(|def| def.tiles.iter().map(String::as_str).collect());

    let mut tiles = Vec::new();
    let mut ids: HashMap<&str, usize> = HashMap::new();
    for def in &doc.tiles {
        if let Some(allowed) = &allowed {
            if !allowed.contains(def.name.as_str()) {
                continue;
            }
        }
        let symmetry = Symmetry::from_letter(&def.symmetry).with_context(|| {
            format!("tile `{}` has unknown symmetry `{}`", def.name, def.symmetry)
        })?;
        ids.insert(def.name.as_str(), tiles.len());
        tiles.push(load_tile(dir, &def.name, symmetry, def.weight, doc.size)?);
    }

    let mut neighbors = Vec::new();
    for def in &doc.neighbors {
        let (left_name, left_orientation) = parse_reference(&def.left)?;
        let (right_name, right_orientation) = parse_reference(&def.right)?;
        let (Some(left), Some(right)) = (ids.get(left_name), ids.get(right_name)) else {
            continue;
        };
        neighbors.push(NeighborRule::new(
            *left,
            left_orientation,
            *right,
            right_orientation,
        ));
    }

    Ok(LoadedTileSet { tiles, neighbors })
}

/// Loads a tile from `<name>.png`, or falls back to one image per
/// orientation named `<name> <k>.png`.
fn load_tile(
    dir: &Path,
    name: &str,
    symmetry: Symmetry,
    weight: f64,
    size: usize,
) -> Result<Tile<VisPixel>> {
    let single = dir.join(format!("{name}.png"));
    match image::open(&single) {
        Ok(image) => Ok(Tile::new(
            sized_grid(image, size, &single)?,
            symmetry,
            weight,
            name,
        )),
        Err(_) => {
            let mut data = Vec::with_capacity(symmetry.orientation_count());
            for orientation in 0..symmetry.orientation_count() {
                let path = dir.join(format!("{name} {orientation}.png"));
                let image = image::open(&path)
                    .with_context(|| format!("reading tile image {}", path.display()))?;
                data.push(sized_grid(image, size, &path)?);
            }
            Ok(Tile::with_orientations(data, symmetry, weight, name)?)
        }
    }
}

fn sized_grid(image: DynamicImage, size: usize, path: &Path) -> Result<Grid2D<VisPixel>> {
    let buffer = image.to_rgb8();
    if buffer.width() as usize != size || buffer.height() as usize != size {
        bail!(
            "tile image {} is {}x{}, expected {size}x{size}",
            path.display(),
            buffer.width(),
            buffer.height()
        );
    }
    Ok(grid_from_image(&buffer))
}

/// Splits `"tileName"` or `"tileName O"` into name and orientation index.
fn parse_reference(reference: &str) -> Result<(&str, usize)> {
    let mut parts = reference.split_whitespace();
    let name = parts
        .next()
        .with_context(|| format!("empty neighbour reference `{reference}`"))?;
    let orientation = match parts.next() {
        Some(index) => index
            .parse()
            .with_context(|| format!("bad orientation in neighbour reference `{reference}`"))?,
        None => 0,
    };
    Ok((name, orientation))
}
