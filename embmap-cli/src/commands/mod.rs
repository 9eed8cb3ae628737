//! Command implementations for EmbMap CLI

pub mod input;
pub mod summarize;
pub mod contour;
pub mod topics;
pub mod levels;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::Path;

/// Serialize `value` as JSON to `out`
pub(crate) fn write_json<T: Serialize>(value: &T, out: &Path, pretty: bool) -> Result<()> {
    let file = std::fs::File::create(out)
        .with_context(|| format!("Failed to create output file: {}", out.display()))?;
    let writer = std::io::BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(writer, value)
    } else {
        serde_json::to_writer(writer, value)
    }
    .with_context(|| format!("Failed to write JSON to {}", out.display()))?;
    log::info!("Wrote {}", out.display());
    Ok(())
}

/// Spinner advanced once per extracted level
pub(crate) fn level_progress(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}
