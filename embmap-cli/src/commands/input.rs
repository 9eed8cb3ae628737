//! NDJSON point input shared by all commands

use crate::error::{CliError, CliResult};
use embmap_core::SummaryInput;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PointRecord {
    x: f64,
    y: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    label: Option<usize>,
    #[serde(default)]
    time: Option<String>,
}

/// Read one point per line; blank lines are skipped
pub fn read_points(path: &Path) -> CliResult<SummaryInput> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    parse_points(BufReader::new(file), &path.display().to_string())
}

pub fn parse_points<R: BufRead>(reader: R, name: &str) -> CliResult<SummaryInput> {
    let mut input = SummaryInput::default();
    let mut labels = Vec::new();
    let mut times = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PointRecord = serde_json::from_str(&line)
            .map_err(|e| CliError::parse(name.to_string(), i + 1, e.to_string()))?;
        input.xs.push(record.x);
        input.ys.push(record.y);
        input.texts.push(record.text);
        labels.extend(record.label);
        times.extend(record.time);
    }

    let n = input.xs.len();
    if !labels.is_empty() {
        if labels.len() != n {
            return Err(CliError::validation(format!("{} of {} points have a label", labels.len(), n)));
        }
        input.labels = Some(labels);
    }
    if !times.is_empty() {
        if times.len() != n {
            return Err(CliError::validation(format!("{} of {} points have a time", times.len(), n)));
        }
        input.times = Some(times);
    }

    log::info!("Read {} points from {}", n, name);
    Ok(input)
}

/// Attach command-line group names and time format to the points read.
/// Group names need labelled points; a time format is kept only for timed points.
pub fn apply_strata(
    input: &mut SummaryInput,
    group_names: Option<Vec<String>>,
    time_format: Option<String>,
) -> CliResult<()> {
    if group_names.is_some() && input.labels.is_none() {
        return Err(CliError::validation("--group-names given but no point has a label"));
    }
    if input.labels.is_some() && group_names.is_none() {
        log::warn!("Points carry labels but no --group-names were given; skipping group grids");
    }
    input.group_names = group_names;
    if input.times.is_some() {
        input.time_format = time_format;
    }
    Ok(())
}
