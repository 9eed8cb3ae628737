//! Levels command - report the quadtree levels a zoom range needs

use anyhow::{anyhow, Context, Result};
use embmap_core::types::points_from_coords;
use embmap_core::{select_levels, Quadtree};
use std::path::PathBuf;

use super::input;
use crate::config::Config;

pub fn execute(config: &Config, input_path: PathBuf) -> Result<()> {
    let input = input::read_points(&input_path)?;
    let params = config.topic_params();

    let tree = Quadtree::from_points(&points_from_coords(&input.xs, &input.ys))
        .context("Failed to build quadtree")?;
    let extent = tree.extent().ok_or_else(|| anyhow!("Input has no points"))?;

    let span = |v: &[f64]| v.iter().fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], &x| [lo.min(x), hi.max(x)]);
    let range = select_levels(params.max_zoom_scale, &params.viewport(), span(&input.xs), span(&input.ys), extent)?;

    println!("tree height: {}", tree.height());
    println!("levels: {}..={}", range.min_level, range.max_level);
    Ok(())
}
