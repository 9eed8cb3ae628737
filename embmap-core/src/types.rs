use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Level = u32;

/// A projected embedding point. `pid` indexes the corpus (and the columns of
/// the document-term matrix).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub pid: usize,
}

impl Point {
    pub fn new(x: f64, y: f64, pid: usize) -> Self {
        Self { x, y, pid }
    }
}

/// Build points from parallel coordinate slices, numbering them in order.
pub fn points_from_coords(xs: &[f64], ys: &[f64]) -> Vec<Point> {
    xs.iter()
        .zip(ys)
        .enumerate()
        .map(|(pid, (&x, &y))| Point::new(x, y, pid))
        .collect()
}

/// Axis-aligned bounds of a tile, serialized as `[x0, y0, x1, y1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl TileBounds {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    /// Half-open containment, matching the quadtree's split rule
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
    }

    /// Child quadrant `index = bottom << 1 | right`
    pub fn quadrant(&self, index: usize) -> TileBounds {
        let (xm, ym) = self.center();
        let (x_min, x_max) = if index & 1 == 1 { (xm, self.x_max) } else { (self.x_min, xm) };
        let (y_min, y_max) = if index & 2 == 2 { (ym, self.y_max) } else { (self.y_min, ym) };
        TileBounds::new(x_min, y_min, x_max, y_max)
    }

    /// Quadrant index a point descends into
    pub fn quadrant_of(&self, x: f64, y: f64) -> usize {
        let (xm, ym) = self.center();
        let right = (x >= xm) as usize;
        let bottom = (y >= ym) as usize;
        (bottom << 1) | right
    }

    /// Width of one cell when these bounds are split into `2^level` cells per axis
    pub fn cell_width(&self, level: Level) -> f64 {
        self.width() * (-f64::from(level)).exp2()
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

impl From<[f64; 4]> for TileBounds {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl Serialize for TileBounds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TileBounds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(TileBounds::from)
    }
}

/// Round to `digits` decimals, ties to even (the convention of the
/// consumers reading these files).
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrants_partition_parent() {
        let b = TileBounds::new(0.0, 0.0, 4.0, 4.0);
        assert_eq!(b.quadrant(0), TileBounds::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(b.quadrant(1), TileBounds::new(2.0, 0.0, 4.0, 2.0));
        assert_eq!(b.quadrant(2), TileBounds::new(0.0, 2.0, 2.0, 4.0));
        assert_eq!(b.quadrant(3), TileBounds::new(2.0, 2.0, 4.0, 4.0));
        assert_eq!(b.quadrant_of(2.0, 1.0), 1);
        assert_eq!(b.quadrant_of(1.9, 2.0), 2);
    }

    #[test]
    fn test_cell_width_beyond_u64_cells() {
        let b = TileBounds::new(-8.0, 0.0, 8.0, 16.0);
        assert_eq!(b.cell_width(0), 16.0);
        assert_eq!(b.cell_width(2), 4.0);
        let expected = 16.0 / 2f64.powi(70);
        assert!((b.cell_width(70) - expected).abs() < expected * 1e-12);
    }

    #[test]
    fn test_round_ties_even() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(1.23456, 4), 1.2346);
        assert_eq!(round_to(-2.5, 0), -2.0);
    }

    #[test]
    fn test_bounds_serialize_as_array() {
        let b = TileBounds::new(0.0, 1.0, 2.0, 3.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[0.0,1.0,2.0,3.0]");
        let back: TileBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
