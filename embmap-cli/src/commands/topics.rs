//! Topics command - multi-level tile topics only

use anyhow::{Context, Result};
use embmap_core::summary::generate_topic_summary_with;
use std::path::PathBuf;

use super::{input, level_progress, write_json};
use crate::config::Config;

pub fn execute(config: &Config, input_path: PathBuf, out: PathBuf, progress: bool) -> Result<()> {
    let input = input::read_points(&input_path)?;
    let params = config.topic_params();

    let pb = level_progress(progress);
    let summary = generate_topic_summary_with(&input.xs, &input.ys, &input.texts, &params, |level, tiles| {
        pb.set_message(format!("level {}: {} tiles", level, tiles));
        pb.tick();
    })
    .context("Failed to extract topics")?;
    pb.finish_and_clear();

    write_json(&summary, &out, config.output.pretty)
}
