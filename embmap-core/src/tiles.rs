//! Collapsing a quadtree into the tiles of one zoom level.
//!
//! Collapsing is destructive: every node below the target level is merged into
//! its ancestor at the target level. [`collapse`] therefore takes the tree by
//! value and hands back the coarsened tree, which only accepts shallower
//! targets from then on.

use crate::quadtree::{NodeId, Quadtree};
use crate::sparse::CsrMatrix;
use crate::types::{Level, Point, TileBounds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TileError {
    #[error("Tree was already collapsed to level {current}; cannot expand it to level {requested}")]
    AlreadyCoarser { current: Level, requested: Level },

    #[error("Point id {pid} is outside the corpus of {corpus_len} documents")]
    PointOutOfCorpus { pid: usize, corpus_len: usize },
}

pub type TileResult<T> = Result<T, TileError>;

/// One summarization unit: the points owned by a tree node at a given level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub row: usize,
    pub bounds: TileBounds,
    pub point_ids: Vec<usize>,
}

/// Result of collapsing a tree to one level
#[derive(Debug)]
pub struct Collapsed {
    pub tree: Quadtree,
    pub tiles: Vec<Tile>,
}

/// Collapse `tree` so no node is deeper than `target_level` and emit one tile
/// per surviving node.
pub fn collapse(mut tree: Quadtree, target_level: Level) -> TileResult<Collapsed> {
    if let Some(current) = tree.resolution() {
        if target_level > current {
            return Err(TileError::AlreadyCoarser { current, requested: target_level });
        }
    }

    let (Some(root), Some(extent)) = (tree.root(), tree.bounds()) else {
        tree.resolution = Some(target_level);
        return Ok(Collapsed { tree, tiles: Vec::new() });
    };

    let mut tiles = Vec::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        let (level, is_leaf) = {
            let node = tree.node(id);
            (node.level, node.is_leaf())
        };

        if level >= target_level {
            let data = gather_subtree(&tree, id);
            let point_ids = data.iter().map(|&i| tree.point(i).pid).collect();

            let node = tree.node_mut(id);
            node.children = [None; 4];
            node.data = data;
            let bounds = node.bounds;
            tiles.push(Tile { row: tiles.len(), bounds, point_ids });
        } else if is_leaf {
            // The tree stops above the target level here; report the
            // target-level cell so tiles of one level share a size.
            let node = tree.node(id);
            let bounds = truncated_cell(&extent, &node.bounds, tree.point(node.data[0]), target_level);
            let point_ids = node.data.iter().map(|&i| tree.point(i).pid).collect();
            tiles.push(Tile { row: tiles.len(), bounds, point_ids });
        } else {
            let node = tree.node(id);
            stack.extend(node.children.iter().rev().flatten().copied());
        }
    }

    tree.resolution = Some(target_level);
    log::debug!("Collapsed tree to level {} into {} tiles", target_level, tiles.len());
    Ok(Collapsed { tree, tiles })
}

/// Concatenate the leaf data of a subtree in depth-first child order
fn gather_subtree(tree: &Quadtree, id: NodeId) -> Vec<usize> {
    let mut data = Vec::new();
    let mut stack = vec![id];
    while let Some(cur) = stack.pop() {
        let node = tree.node(cur);
        if node.is_leaf() {
            data.extend_from_slice(&node.data);
        } else {
            stack.extend(node.children.iter().rev().flatten().copied());
        }
    }
    data
}

/// Target-level cell holding the representative point, kept inside the
/// leaf's own bounds.
fn truncated_cell(
    extent: &TileBounds,
    leaf: &TileBounds,
    representative: &Point,
    target_level: Level,
) -> TileBounds {
    let step = extent.cell_width(target_level);
    if !(step > 0.0) {
        return *leaf;
    }

    // Leaf bounds are whole multiples of `step`, so the clamp range is never empty
    let corner = |value: f64, origin: f64, lo: f64, hi: f64| -> f64 {
        let start = origin + ((value - origin) / step).floor() * step;
        start.min(hi - step).max(lo)
    };

    let x0 = corner(representative.x, extent.x_min, leaf.x_min, leaf.x_max);
    let y0 = corner(representative.y, extent.y_min, leaf.y_min, leaf.y_max);
    TileBounds::new(x0, y0, x0 + step, y0 + step)
}

/// Tile × document indicator matrix with `max(corpus_len, tiles)` rows.
/// Unused trailing rows still count toward the idf population.
pub fn membership_matrix(tiles: &[Tile], corpus_len: usize) -> TileResult<CsrMatrix> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for tile in tiles {
        for &pid in &tile.point_ids {
            if pid >= corpus_len {
                return Err(TileError::PointOutOfCorpus { pid, corpus_len });
            }
            rows.push(tile.row);
            cols.push(pid);
        }
    }
    let n_rows = corpus_len.max(tiles.len());
    Ok(CsrMatrix::from_triplets(&rows, &cols, None, (n_rows, corpus_len)))
}
