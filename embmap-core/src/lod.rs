/*!
# Level of Detail selection

Maps a range of zoom scales to the quadtree levels whose tiles render close to
an ideal on-screen width. Every zoom scale from 1 to the maximum (step 0.5)
picks its best level; the returned range spans all picks.
*/

use crate::types::Level;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest level considered by the selector
pub const MAX_CANDIDATE_LEVEL: Level = 20;

const ZOOM_STEP: f64 = 0.5;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type LevelResult<T> = Result<T, LevelError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRange {
    pub min_level: Level,
    pub max_level: Level,
}

impl LevelRange {
    pub fn levels(&self) -> impl DoubleEndedIterator<Item = Level> {
        self.min_level..=self.max_level
    }
}

/// Rendering geometry the levels are chosen for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub ideal_tile_width: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1000, height: 1000, ideal_tile_width: 35.0 }
    }
}

/// Level whose tile width at `scale` is closest to the ideal; ties keep the
/// shallower level.
fn best_level(scaled_length: f64, ideal_tile_width: f64) -> Level {
    let mut best = 1;
    let mut best_diff = f64::INFINITY;
    for level in 1..=MAX_CANDIDATE_LEVEL {
        let tile_width = scaled_length / (1u64 << level) as f64;
        let diff = (tile_width - ideal_tile_width).abs();
        if diff < best_diff {
            best_diff = diff;
            best = level;
        }
    }
    best
}

/// Pick the quadtree levels needed to label every zoom scale up to
/// `max_zoom_scale`.
///
/// `x_domain`/`y_domain` are the data ranges and `tree_extent` the covering
/// square of the quadtree as `[[x0, y0], [x1, y1]]`.
pub fn select_levels(
    max_zoom_scale: f64,
    viewport: &Viewport,
    x_domain: [f64; 2],
    y_domain: [f64; 2],
    tree_extent: [[f64; 2]; 2],
) -> LevelResult<LevelRange> {
    if !max_zoom_scale.is_finite() || max_zoom_scale < 1.0 {
        return Err(LevelError::InvalidParameter(format!(
            "max zoom scale must be a finite value >= 1, got {}",
            max_zoom_scale
        )));
    }
    if !viewport.ideal_tile_width.is_finite() || viewport.ideal_tile_width <= 0.0 {
        return Err(LevelError::InvalidParameter(format!(
            "ideal tile width must be positive, got {}",
            viewport.ideal_tile_width
        )));
    }
    let mut coords = x_domain.iter().chain(&y_domain).chain(tree_extent.iter().flatten());
    if coords.any(|v| !v.is_finite()) {
        return Err(LevelError::InvalidParameter("non-finite domain or extent".to_string()));
    }

    let render_length = viewport.width.max(viewport.height) as f64;
    let world_length = (x_domain[1] - x_domain[0]).max(y_domain[1] - y_domain[0]);
    let tree_width = tree_extent[1][0] - tree_extent[0][0];
    // A single-location corpus has no world length; measure it in tree units
    let tree_to_world = if world_length > 0.0 { tree_width / world_length } else { 1.0 };

    let mut range: Option<LevelRange> = None;
    let mut scale = 1.0;
    while scale <= max_zoom_scale {
        let level = best_level(scale * render_length * tree_to_world, viewport.ideal_tile_width);
        range = Some(match range {
            None => LevelRange { min_level: level, max_level: level },
            Some(r) => LevelRange { min_level: r.min_level.min(level), max_level: r.max_level.max(level) },
        });
        scale += ZOOM_STEP;
    }

    // The loop runs at least once because max_zoom_scale >= 1
    let range = range.unwrap_or(LevelRange { min_level: 1, max_level: 1 });
    log::debug!(
        "Selected topic levels {}..={} for zoom up to {}",
        range.min_level,
        range.max_level,
        max_zoom_scale
    );
    Ok(range)
}
