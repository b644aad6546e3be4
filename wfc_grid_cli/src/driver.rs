//! Runs every problem of a problem set, retrying failed attempts with
//! fresh seeds and writing the outputs under a timestamped directory tree.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

use wfc_grid::grid::Grid2D;
use wfc_grid::model::{Markov, Overlapping, OverlappingOptions, Tiling, TilingOptions};
use wfc_grid::vis::{grid_from_image, image_from_grid, VisPixel};

use crate::config::{MarkovProblem, OverlappingProblem, ProblemSet, TiledProblem};
use crate::tileset;
use crate::Args;

/// Attempts per output before a problem is given up on.
const MAX_ATTEMPTS: u32 = 10;

pub(crate) fn run(args: &Args) -> Result<()> {
    let text = fs::read_to_string(&args.config)
        .with_context(|| format!("reading problem set {}", args.config.display()))?;
    let problems: ProblemSet = toml::from_str(&text)
        .with_context(|| format!("parsing problem set {}", args.config.display()))?;

    let out_root = args.out.join(timestamp());
    fs::create_dir_all(&out_root)
        .with_context(|| format!("creating output root {}", out_root.display()))?;

    let mut seeds = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut index = 1usize;
    for problem in &problems.overlapping {
        if let Err(error) = run_overlapping(args, &out_root, index, problem, &mut seeds) {
            log::error!("overlapping problem `{}` failed: {error:#}", problem.name);
        }
        index += 1;
    }
    for problem in &problems.simpletiled {
        if let Err(error) = run_simpletiled(args, &out_root, index, problem, &mut seeds) {
            log::error!("simpletiled problem `{}` failed: {error:#}", problem.name);
        }
        index += 1;
    }
    for problem in &problems.markov {
        if let Err(error) = run_markov(args, &out_root, index, problem, &mut seeds) {
            log::error!("markov problem `{}` failed: {error:#}", problem.name);
        }
        index += 1;
    }

    Ok(())
}

fn timestamp() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("run_{seconds}")
}

/// Per-attempt seeds come from the caller-level generator, in `[0, i32::MAX)`.
fn next_seed(seeds: &mut StdRng) -> u64 {
    seeds.gen_range(0..i32::MAX) as u64
}

fn problem_dir(out_root: &Path, name: &str) -> Result<PathBuf> {
    let dir = out_root.join(name);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating problem directory {}", dir.display()))?;
    Ok(dir)
}

fn save_image(grid: &Grid2D<VisPixel>, path: &Path) -> Result<()> {
    image_from_grid(grid)
        .save(path)
        .with_context(|| format!("writing image {}", path.display()))
}

fn load_image(path: &Path) -> Result<Grid2D<VisPixel>> {
    let image = image::open(path)
        .with_context(|| format!("reading image {}", path.display()))?
        .to_rgb8();
    Ok(grid_from_image(&image))
}

fn run_overlapping(
    args: &Args,
    out_root: &Path,
    index: usize,
    problem: &OverlappingProblem,
    seeds: &mut StdRng,
) -> Result<()> {
    log::info!("started overlapping problem `{}`", problem.name);

    let input = load_image(&args.assets.join(format!("{}.png", problem.name)))?;
    let model = Overlapping::new(
        &input,
        OverlappingOptions {
            periodic_input: problem.periodic_input,
            periodic_output: problem.periodic,
            out_height: problem.height,
            out_width: problem.width,
            symmetry: problem.symmetry,
            ground: problem.ground,
            pattern_size: problem.n,
        },
    )?;

    let dir = problem_dir(out_root, &problem.name)?;
    let kernels_dir = if args.kernels {
        let kernels = dir.join("Kernels");
        fs::create_dir_all(&kernels)
            .with_context(|| format!("creating kernels directory {}", kernels.display()))?;
        Some(kernels)
    } else {
        None
    };

    for shot in 0..problem.screenshots {
        let mut solved = false;
        for attempt in 0..MAX_ATTEMPTS {
            let seed = next_seed(seeds);
            let mut rng = ChaChaRng::seed_from_u64(seed);
            match model.collapse(&mut rng) {
                Ok(output) => {
                    let path =
                        dir.join(format!("Problem_{index}_{}_{shot}.png", problem.name));
                    save_image(&output, &path)?;
                    if let Some(kernels_dir) = &kernels_dir {
                        write_kernels(kernels_dir, index, shot, model.patterns())?;
                    }
                    log::info!(
                        "finished overlapping problem `{}` output {shot} on attempt {attempt}",
                        problem.name
                    );
                    solved = true;
                    break;
                }
                Err(error) => {
                    log::warn!(
                        "overlapping problem `{}` output {shot} attempt {attempt}: {error}",
                        problem.name
                    );
                }
            }
        }
        if !solved {
            log::error!(
                "giving up on overlapping problem `{}` output {shot} after {MAX_ATTEMPTS} attempts",
                problem.name
            );
        }
    }

    Ok(())
}

fn write_kernels(
    dir: &Path,
    index: usize,
    shot: usize,
    patterns: &[Grid2D<VisPixel>],
) -> Result<()> {
    for (id, pattern) in patterns.iter().enumerate() {
        let path = dir.join(format!("Problem_{index}_Run_{shot}_Kernel_{id}.png"));
        save_image(pattern, &path)?;
    }
    Ok(())
}

fn run_simpletiled(
    args: &Args,
    out_root: &Path,
    index: usize,
    problem: &TiledProblem,
    seeds: &mut StdRng,
) -> Result<()> {
    log::info!(
        "started simpletiled problem `{}`, subset `{}`",
        problem.name,
        problem.subset
    );

    let set = tileset::load(&args.assets.join(&problem.name), &problem.subset)?;
    let model = Tiling::new(
        set.tiles,
        &set.neighbors,
        TilingOptions {
            periodic_output: problem.periodic,
            out_height: problem.height,
            out_width: problem.width,
        },
    )?;

    let dir = problem_dir(out_root, &problem.name)?;
    run_attempts(&dir, seeds, &format!("{}_{}", problem.name, problem.subset), index, |rng| {
        model.collapse(rng)
    })
}

fn run_markov(
    args: &Args,
    out_root: &Path,
    index: usize,
    problem: &MarkovProblem,
    seeds: &mut StdRng,
) -> Result<()> {
    log::info!(
        "started markov problem `{}`, subset `{}`",
        problem.name,
        problem.subset
    );

    let assets = args.assets.join(&problem.name);
    let set = tileset::load(&assets, &problem.subset)?;
    let samples = problem
        .inputs
        .iter()
        .map(|input| load_image(&assets.join(format!("{input}.png"))))
        .collect::<Result<Vec<_>>>()?;

    let model = Markov::new(
        set.tiles,
        &samples,
        TilingOptions {
            periodic_output: problem.periodic,
            out_height: problem.height,
            out_width: problem.width,
        },
    )?;
    log::info!(
        "markov problem `{}` inferred {} neighbour rules",
        problem.name,
        model.neighbors().len()
    );

    let dir = problem_dir(out_root, &problem.name)?;
    run_attempts(&dir, seeds, &format!("{}_{}", problem.name, problem.subset), index, |rng| {
        model.collapse(rng)
    })
}

/// Shared retry loop of the tile-based problems: first success is written,
/// persistent failure is logged and swallowed.
fn run_attempts(
    dir: &Path,
    seeds: &mut StdRng,
    stem: &str,
    index: usize,
    mut collapse: impl FnMut(&mut ChaChaRng) -> Result<Grid2D<VisPixel>, wfc_grid::collapse::CollapseError>,
) -> Result<()> {
    for attempt in 0..MAX_ATTEMPTS {
        let seed = next_seed(seeds);
        let mut rng = ChaChaRng::seed_from_u64(seed);
        match collapse(&mut rng) {
            Ok(output) => {
                let path = dir.join(format!("Problem_{index}_{stem}_{attempt}.png"));
                save_image(&output, &path)?;
                log::info!("finished `{stem}` on attempt {attempt}");
                return Ok(());
            }
            Err(error) => log::warn!("`{stem}` attempt {attempt}: {error}"),
        }
    }
    log::error!("giving up on `{stem}` after {MAX_ATTEMPTS} attempts");
    Ok(())
}
