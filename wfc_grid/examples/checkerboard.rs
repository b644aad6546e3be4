//! Generates a checkerboard texture from a 2x2 example and saves it as a
//! PNG next to the manifest.

use image::Rgb;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;

use wfc_grid::grid::Grid2D;
use wfc_grid::model::{Overlapping, OverlappingOptions};
use wfc_grid::vis::image_from_grid;

const OUTPUT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/checkerboard.png");

fn main() {
    let input = Grid2D::from_vec(
        vec![
            Rgb([0u8, 0, 0]),
            Rgb([255, 255, 255]),
            Rgb([255, 255, 255]),
            Rgb([0, 0, 0]),
        ],
        2,
    );

    let options = OverlappingOptions {
        periodic_input: true,
        periodic_output: true,
        out_height: 32,
        out_width: 32,
        symmetry: 1,
        ground: false,
        pattern_size: 2,
    };
    let model = Overlapping::new(&input, options).expect("building the model");

    let mut rng = ChaChaRng::seed_from_u64(2048);
    let output = model.collapse(&mut rng).expect("collapsing the wave");

    image_from_grid(&output)
        .save(OUTPUT)
        .expect("saving the output image");
    println!("wrote {OUTPUT}");
}
