//! Contour command - density grids only

use anyhow::{Context, Result};
use embmap_core::ContourEstimator;
use std::path::PathBuf;

use super::{input, write_json};
use crate::config::Config;

pub fn execute(
    config: &Config,
    input_path: PathBuf,
    out: PathBuf,
    group_names: Option<Vec<String>>,
    time_format: Option<String>,
) -> Result<()> {
    let mut input = input::read_points(&input_path)?;
    input::apply_strata(&mut input, group_names, time_format)?;
    let params = config.contour_params();

    let grid = ContourEstimator::from(&params)
        .estimate_seeded(&input.xs, &input.ys, &input.partitions(), params.random_seed)
        .context("Failed to estimate density")?;
    write_json(&grid, &out, config.output.pretty)
}
