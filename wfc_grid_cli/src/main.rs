mod config;
mod driver;
mod tileset;

use std::path::PathBuf;

use clap::Parser;

/// Generates images by collapsing example-driven constraint problems.
#[derive(Parser, Debug)]
#[command(version)]
pub(crate) struct Args {
    /// Problem set document to run.
    #[arg(long)]
    pub config: PathBuf,

    /// Root directory for generated images.
    #[arg(long, default_value = "out")]
    pub out: PathBuf,

    /// Directory holding input images and tile set folders.
    #[arg(long, default_value = ".")]
    pub assets: PathBuf,

    /// Seed for the per-attempt seed generator; drawn from entropy when
    /// absent.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Additionally dump every extracted overlapping pattern under
    /// `Kernels/`.
    #[arg(long)]
    pub kernels: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(error) = driver::run(&args) {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}
