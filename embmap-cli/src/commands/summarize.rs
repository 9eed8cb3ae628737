//! Summarize command - contours and tile topics in one grid file

use anyhow::{Context, Result};
use embmap_core::summary::{generate_grid_summary_with, JsonPointConfig};
use std::path::PathBuf;

use super::{input, level_progress, write_json};
use crate::config::Config;

pub fn execute(
    config: &Config,
    input_path: PathBuf,
    out: PathBuf,
    name: Option<String>,
    group_names: Option<Vec<String>>,
    time_format: Option<String>,
    json_text_key: Option<String>,
    progress: bool,
) -> Result<()> {
    let mut input = input::read_points(&input_path)?;
    input::apply_strata(&mut input, group_names, time_format)?;

    let mut params = config.summary_params();
    if let Some(name) = name {
        params.embedding_name = name;
    }
    params.json_point = json_text_key.map(|key| JsonPointConfig {
        text_key: key,
        group_labels: None,
        image_key: None,
        image_url_prefix: None,
        large_image_key: None,
        large_image_url_prefix: None,
        link_field_keys: None,
    });

    let pb = level_progress(progress);
    let summary = generate_grid_summary_with(&input, &params, |level, tiles| {
        pb.set_message(format!("level {}: {} tiles", level, tiles));
        pb.tick();
    })
    .context("Failed to generate grid summary")?;
    pb.finish_and_clear();

    log::info!(
        "Summary has {} topic levels and a {}x{} grid",
        summary.topic.data.len(),
        summary.contour.grid.len(),
        summary.contour.grid.len()
    );
    write_json(&summary, &out, config.output.pretty)
}
