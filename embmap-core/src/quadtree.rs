//! Point quadtree used to partition the embedding.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. The cover and
//! insertion rules follow the d3-quadtree conventions that downstream viewers
//! rely on: the extent is a power-of-two square anchored on the floor of the
//! first corner, splits are half-open (`x >= xm` goes right, `y >= ym` goes to
//! the bottom), leaves hold points, and coincident points share a leaf.

use crate::types::{Level, Point, TileBounds};
use thiserror::Error;

pub type NodeId = usize;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Non-finite coordinate for point {pid}: ({x}, {y})")]
    NonFiniteCoordinate { pid: usize, x: f64, y: f64 },
}

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Debug, Clone)]
pub struct QuadNode {
    pub bounds: TileBounds,
    pub level: Level,
    pub children: [Option<NodeId>; 4],
    /// Indices into the tree's point list; only leaves carry data
    pub data: Vec<usize>,
}

impl QuadNode {
    fn leaf(bounds: TileBounds, level: Level, data: Vec<usize>) -> Self {
        Self { bounds, level, children: [None; 4], data }
    }

    fn internal(bounds: TileBounds, level: Level) -> Self {
        Self { bounds, level, children: [None; 4], data: Vec::new() }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Quadtree {
    points: Vec<Point>,
    nodes: Vec<QuadNode>,
    root: Option<NodeId>,
    extent: Option<TileBounds>,
    /// Deepest level still present after a collapse
    pub(crate) resolution: Option<Level>,
}

impl Quadtree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[Point]) -> TreeResult<Self> {
        let mut tree = Self::new();
        tree.add_all(points)?;
        Ok(tree)
    }

    /// Add points and rebuild the tree over the union of all data
    pub fn add_all(&mut self, points: &[Point]) -> TreeResult<()> {
        for p in points {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(TreeError::NonFiniteCoordinate { pid: p.pid, x: p.x, y: p.y });
            }
        }
        self.points.extend_from_slice(points);
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.resolution = None;
        self.extent = None;

        if self.points.is_empty() {
            return;
        }

        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &self.points {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }

        let extent = cover(cover(None, x0, y0), x1, y1);
        self.extent = extent;

        for idx in 0..self.points.len() {
            self.insert(idx);
        }
        log::debug!(
            "Built quadtree with {} points, {} nodes, height {}",
            self.points.len(),
            self.nodes.len(),
            self.height()
        );
    }

    fn push(&mut self, node: QuadNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn insert(&mut self, idx: usize) {
        let Some(extent) = self.extent else { return };
        let p = self.points[idx];

        let mut node = match self.root {
            Some(root) => root,
            None => {
                let root = self.push(QuadNode::leaf(extent, 0, vec![idx]));
                self.root = Some(root);
                return;
            }
        };

        // Descend through internal nodes
        while !self.nodes[node].is_leaf() {
            let bounds = self.nodes[node].bounds;
            let q = bounds.quadrant_of(p.x, p.y);
            match self.nodes[node].children[q] {
                Some(child) => node = child,
                None => {
                    let level = self.nodes[node].level + 1;
                    let leaf = self.push(QuadNode::leaf(bounds.quadrant(q), level, vec![idx]));
                    self.nodes[node].children[q] = Some(leaf);
                    return;
                }
            }
        }

        let rep = self.points[self.nodes[node].data[0]];
        if (rep.x == p.x && rep.y == p.y) || !splittable(&self.nodes[node].bounds) {
            self.nodes[node].data.push(idx);
            return;
        }

        // Split the occupied leaf until the two points separate
        let existing = std::mem::take(&mut self.nodes[node].data);
        let mut parent = node;
        loop {
            let bounds = self.nodes[parent].bounds;
            let level = self.nodes[parent].level + 1;
            let i = bounds.quadrant_of(p.x, p.y);
            let j = bounds.quadrant_of(rep.x, rep.y);

            if i != j {
                let old = self.push(QuadNode::leaf(bounds.quadrant(j), level, existing));
                let new = self.push(QuadNode::leaf(bounds.quadrant(i), level, vec![idx]));
                self.nodes[parent].children[j] = Some(old);
                self.nodes[parent].children[i] = Some(new);
                return;
            }

            let child_bounds = bounds.quadrant(i);
            if !splittable(&child_bounds) {
                let mut data = existing;
                data.push(idx);
                let leaf = self.push(QuadNode::leaf(child_bounds, level, data));
                self.nodes[parent].children[i] = Some(leaf);
                return;
            }

            let inner = self.push(QuadNode::internal(child_bounds, level));
            self.nodes[parent].children[i] = Some(inner);
            parent = inner;
        }
    }

    /// `[[x0, y0], [x1, y1]]` of the covering square
    pub fn extent(&self) -> Option<[[f64; 2]; 2]> {
        self.extent.map(|b| [[b.x_min, b.y_min], [b.x_max, b.y_max]])
    }

    pub fn bounds(&self) -> Option<TileBounds> {
        self.extent
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &QuadNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut QuadNode {
        &mut self.nodes[id]
    }

    pub fn point(&self, index: usize) -> &Point {
        &self.points[index]
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Level of the deepest reachable leaf; 0 for an empty tree
    pub fn height(&self) -> Level {
        let Some(root) = self.root else { return 0 };
        let mut height = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                height = height.max(node.level);
            } else {
                stack.extend(node.children.iter().flatten().copied());
            }
        }
        height
    }

    /// Deepest level still available, `None` if never collapsed
    pub fn resolution(&self) -> Option<Level> {
        self.resolution
    }
}

/// Grow (or create) a square extent so that it covers `(x, y)` half-open
fn cover(extent: Option<TileBounds>, x: f64, y: f64) -> Option<TileBounds> {
    let Some(b) = extent else {
        let (x0, y0) = (x.floor(), y.floor());
        return Some(TileBounds::new(x0, y0, x0 + 1.0, y0 + 1.0));
    };

    let (mut x0, mut y0, mut x1, mut y1) = (b.x_min, b.y_min, b.x_max, b.y_max);
    let mut z = if x1 - x0 > 0.0 { x1 - x0 } else { 1.0 };

    while x0 > x || x >= x1 || y0 > y || y >= y1 {
        let i = (((y < y0) as u8) << 1) | ((x < x0) as u8);
        z *= 2.0;
        match i {
            0 => {
                x1 = x0 + z;
                y1 = y0 + z;
            }
            1 => {
                x0 = x1 - z;
                y1 = y0 + z;
            }
            2 => {
                x1 = x0 + z;
                y0 = y1 - z;
            }
            _ => {
                x0 = x1 - z;
                y0 = y1 - z;
            }
        }
    }

    Some(TileBounds::new(x0, y0, x1, y1))
}

fn splittable(bounds: &TileBounds) -> bool {
    let (xm, ym) = bounds.center();
    xm > bounds.x_min && xm < bounds.x_max && ym > bounds.y_min && ym < bounds.y_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::points_from_coords;

    fn collect_leaf_data(tree: &Quadtree) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = tree.root().into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = tree.node(id);
            out.extend(node.data.iter().map(|&i| tree.point(i).pid));
            stack.extend(node.children.iter().flatten().copied());
        }
        out.sort_unstable();
        out
    }

    #[test]
    fn test_cover_unit_square_corners() {
        let points = points_from_coords(&[0.0, 1.0, 0.0, 1.0], &[0.0, 0.0, 1.0, 1.0]);
        let tree = Quadtree::from_points(&points).unwrap();
        assert_eq!(tree.extent(), Some([[0.0, 0.0], [2.0, 2.0]]));
        assert_eq!(tree.height(), 1);

        let root = tree.node(tree.root().unwrap());
        for (q, child) in root.children.iter().enumerate() {
            let child = tree.node(child.expect("all quadrants occupied"));
            assert_eq!(child.data.len(), 1);
            assert_eq!(tree.point(child.data[0]).pid, q);
        }
    }

    #[test]
    fn test_cover_expands_toward_negative() {
        let points = points_from_coords(&[-3.5, 0.2], &[0.1, 0.3]);
        let tree = Quadtree::from_points(&points).unwrap();
        let b = tree.bounds().unwrap();
        assert!(b.contains_point(-3.5, 0.1));
        assert!(b.contains_point(0.2, 0.3));
        assert_eq!(b.width(), b.height());
        assert_eq!(b.width().log2().fract(), 0.0);
    }

    #[test]
    fn test_coincident_points_share_leaf() {
        let points = points_from_coords(&[0.5, 0.5, 0.5], &[0.5, 0.5, 0.5]);
        let tree = Quadtree::from_points(&points).unwrap();
        let root = tree.node(tree.root().unwrap());
        assert!(root.is_leaf());
        assert_eq!(root.data.len(), 3);
        assert_eq!(tree.height(), 0);
    }

    #[test]
    fn test_every_point_stored_once() {
        let xs: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 7.0).collect();
        let ys: Vec<f64> = (0..200).map(|i| ((i * 53) % 97) as f64 / 3.0).collect();
        let tree = Quadtree::from_points(&points_from_coords(&xs, &ys)).unwrap();
        assert_eq!(collect_leaf_data(&tree), (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_children_partition_parent_bounds() {
        let xs = [0.1, 0.2, 3.7, 2.2, 1.1, 0.15];
        let ys = [0.1, 2.9, 0.4, 3.3, 1.9, 0.12];
        let tree = Quadtree::from_points(&points_from_coords(&xs, &ys)).unwrap();
        let mut stack = vec![tree.root().unwrap()];
        while let Some(id) = stack.pop() {
            let node = tree.node(id);
            for (q, child) in node.children.iter().enumerate() {
                if let Some(c) = child {
                    assert_eq!(tree.node(*c).bounds, node.bounds.quadrant(q));
                    assert_eq!(tree.node(*c).level, node.level + 1);
                    stack.push(*c);
                }
            }
            for &i in &node.data {
                let p = tree.point(i);
                assert!(node.bounds.contains_point(p.x, p.y));
            }
        }
    }

    #[test]
    fn test_empty_and_invalid_input() {
        let tree = Quadtree::from_points(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.extent(), None);
        assert_eq!(tree.height(), 0);

        let bad = [Point::new(f64::NAN, 0.0, 0)];
        assert!(matches!(
            Quadtree::from_points(&bad),
            Err(TreeError::NonFiniteCoordinate { pid: 0, .. })
        ));
    }

    #[test]
    fn test_add_all_rebuilds_over_union() {
        let mut tree = Quadtree::from_points(&points_from_coords(&[0.2], &[0.2])).unwrap();
        assert_eq!(tree.extent(), Some([[0.0, 0.0], [1.0, 1.0]]));
        tree.add_all(&[Point::new(5.0, 5.0, 1)]).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.bounds().unwrap().contains_point(5.0, 5.0));
        assert_eq!(collect_leaf_data(&tree), vec![0, 1]);
    }
}
