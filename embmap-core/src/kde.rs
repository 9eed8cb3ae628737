//! Two-dimensional Gaussian kernel density estimation.
//!
//! Samples are binned on a square lattice whose cell side equals the kernel
//! cutoff radius, so a query only visits the 3×3 neighbouring bins.

use std::collections::HashMap;
use std::f64::consts::PI;

/// Kernel contributions beyond this many bandwidths are ignored
pub const CUTOFF_BANDWIDTHS: f64 = 6.0;

/// Silverman's rule of thumb `(n(d+2)/4)^(-1/(d+4))`
pub fn silverman_bandwidth(n: usize, d: usize) -> f64 {
    let (n, d) = (n as f64, d as f64);
    (n * (d + 2.0) / 4.0).powf(-1.0 / (d + 4.0))
}

#[derive(Debug, Clone)]
pub struct GaussianKde {
    bandwidth: f64,
    samples: Vec<[f64; 2]>,
    cell: f64,
    bins: HashMap<(i64, i64), Vec<usize>>,
    norm: f64,
}

impl GaussianKde {
    /// Fit on `samples`; `bandwidth` must be positive and `samples` non-empty
    pub fn fit(samples: Vec<[f64; 2]>, bandwidth: f64) -> Option<Self> {
        if samples.is_empty() || !(bandwidth > 0.0) || !bandwidth.is_finite() {
            return None;
        }

        let cell = bandwidth * CUTOFF_BANDWIDTHS;
        let mut bins: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, s) in samples.iter().enumerate() {
            bins.entry(bin_of(s[0], s[1], cell)).or_default().push(i);
        }

        let norm = 1.0 / (2.0 * PI * bandwidth * bandwidth * samples.len() as f64);
        Some(Self { bandwidth, samples, cell, bins, norm })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Density at `(x, y)`
    pub fn density(&self, x: f64, y: f64) -> f64 {
        let (bx, by) = bin_of(x, y, self.cell);
        let cutoff_sq = self.cell * self.cell;
        let inv_two_h2 = 1.0 / (2.0 * self.bandwidth * self.bandwidth);

        let mut sum = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let Some(members) = self.bins.get(&(bx + dx, by + dy)) else { continue };
                for &i in members {
                    let [sx, sy] = self.samples[i];
                    let d2 = (x - sx).powi(2) + (y - sy).powi(2);
                    if d2 <= cutoff_sq {
                        sum += (-d2 * inv_two_h2).exp();
                    }
                }
            }
        }
        sum * self.norm
    }
}

fn bin_of(x: f64, y: f64, cell: f64) -> (i64, i64) {
    ((x / cell).floor() as i64, (y / cell).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silverman() {
        // n = 1, d = 2: (1 * 4 / 4)^(-1/6) = 1
        assert!((silverman_bandwidth(1, 2) - 1.0).abs() < 1e-12);
        assert!((silverman_bandwidth(64, 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_peak() {
        let kde = GaussianKde::fit(vec![[0.0, 0.0]], 1.0).unwrap();
        assert!((kde.density(0.0, 0.0) - 1.0 / (2.0 * PI)).abs() < 1e-12);
        let expected = (-0.5f64).exp() / (2.0 * PI);
        assert!((kde.density(1.0, 0.0) - expected).abs() < 1e-12);
        assert_eq!(kde.density(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_density_integrates_to_one() {
        let kde = GaussianKde::fit(vec![[0.0, 0.0], [1.0, -1.0], [-0.5, 2.0]], 0.7).unwrap();
        let step = 0.05;
        let mut total = 0.0;
        for i in -200..=200 {
            for j in -200..=200 {
                total += kde.density(i as f64 * step, j as f64 * step) * step * step;
            }
        }
        assert!((total - 1.0).abs() < 1e-3, "integral {}", total);
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        assert!(GaussianKde::fit(Vec::new(), 1.0).is_none());
        assert!(GaussianKde::fit(vec![[0.0, 0.0]], 0.0).is_none());
    }
}
