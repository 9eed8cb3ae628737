//! Density grids for the contour layer.
//!
//! All strata (whole corpus, each group, each time bucket) are evaluated on
//! one shared square domain so their grids line up cell for cell. Group and
//! time partitions may be requested together.

use crate::kde::{silverman_bandwidth, GaussianKde};
use crate::types::round_to;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub type Grid = Vec<Vec<f64>>;

#[derive(Debug, Error)]
pub enum ContourError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Coordinate lengths differ: {xs} x values, {ys} y values")]
    CoordinateMismatch { xs: usize, ys: usize },

    #[error("Number of unique labels ({labels}) must equal the number of group names ({names})")]
    GroupCountMismatch { labels: usize, names: usize },

    #[error("Number of labels ({labels}) must equal the number of points ({points})")]
    LabelCountMismatch { labels: usize, points: usize },

    #[error("Label {label} has no group name ({names} names given)")]
    UnknownGroupLabel { label: usize, names: usize },

    #[error("Number of times ({times}) must equal the number of points ({points})")]
    TimeCountMismatch { times: usize, points: usize },

    #[error("Cannot estimate density of an empty point set{}", stratum_suffix(.stratum))]
    EmptyPointSet { stratum: Option<String> },

    #[error("Non-finite coordinate at index {index}")]
    NonFiniteCoordinate { index: usize },

    #[error("More than one {kind} partition requested")]
    DuplicatePartition { kind: &'static str },
}

pub type ContourResult<T> = Result<T, ContourError>;

fn stratum_suffix(stratum: &Option<String>) -> String {
    stratum.as_ref().map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// One way of splitting the corpus into additional grids
#[derive(Debug, Clone, Copy)]
pub enum Partition<'a> {
    /// `labels[i]` indexes `names`
    ByGroup { labels: &'a [usize], names: &'a [String] },
    /// One grid per distinct time string
    ByTime { times: &'a [String], format: Option<&'a str> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupGrids {
    pub group_grids: BTreeMap<String, Grid>,
    pub group_total_point_sizes: BTreeMap<String, usize>,
    pub group_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeGrids {
    pub time_grids: BTreeMap<String, Grid>,
    pub time_counter: BTreeMap<String, usize>,
    pub time_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContourGrid {
    pub grid: Grid,
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
    pub padded: bool,
    pub sample_size: usize,
    pub total_point_size: usize,
    #[serde(flatten)]
    pub groups: Option<GroupGrids>,
    #[serde(flatten)]
    pub times: Option<TimeGrids>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    pub grid_size: usize,
    pub max_sample: usize,
    pub random_seed: u64,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self { grid_size: 200, max_sample: 100_000, random_seed: 202355 }
    }
}

/// Square, padded evaluation domain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],
}

impl Domain {
    /// Pad the longer axis by 2% on each side and widen the shorter axis to
    /// the same length around its centre.
    pub fn padded_square(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let (x_min, x_max) = min_max(xs)?;
        let (y_min, y_max) = min_max(ys)?;
        let (x_gap, y_gap) = (x_max - x_min, y_max - y_min);

        if x_gap == 0.0 && y_gap == 0.0 {
            return Some(Self {
                x_range: [x_min - 0.5, x_max + 0.5],
                y_range: [y_min - 0.5, y_max + 0.5],
            });
        }

        let domain = if x_gap > y_gap {
            let (x0, x1) = (x_min - x_gap / 50.0, x_max + x_gap / 50.0);
            let extra = (x1 - x0 - y_gap) / 2.0;
            Self { x_range: [x0, x1], y_range: [y_min - extra, y_max + extra] }
        } else {
            let (y0, y1) = (y_min - y_gap / 50.0, y_max + y_gap / 50.0);
            let extra = (y1 - y0 - x_gap) / 2.0;
            Self { x_range: [x_min - extra, x_max + extra], y_range: [y0, y1] }
        };
        Some(domain)
    }

    fn lattice(&self, grid_size: usize) -> (Vec<f64>, Vec<f64>) {
        (linspace(self.x_range, grid_size), linspace(self.y_range, grid_size))
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// `n` evenly spaced values from `range[0]` to `range[1]` inclusive
fn linspace(range: [f64; 2], n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![range[0]],
        _ => {
            let step = (range[1] - range[0]) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { range[1] } else { range[0] + step * i as f64 })
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContourEstimator {
    pub grid_size: usize,
    pub max_sample: usize,
}

impl Default for ContourEstimator {
    fn default() -> Self {
        let params = ContourParams::default();
        Self { grid_size: params.grid_size, max_sample: params.max_sample }
    }
}

impl From<&ContourParams> for ContourEstimator {
    fn from(p: &ContourParams) -> Self {
        Self { grid_size: p.grid_size, max_sample: p.max_sample }
    }
}

struct Stratum {
    grid: Grid,
    sample_size: usize,
    total: usize,
}

impl ContourEstimator {
    pub fn new(grid_size: usize, max_sample: usize) -> Self {
        Self { grid_size, max_sample }
    }

    /// Estimate with a `StdRng` seeded from `seed`
    pub fn estimate_seeded(
        &self,
        xs: &[f64],
        ys: &[f64],
        partitions: &[Partition<'_>],
        seed: u64,
    ) -> ContourResult<ContourGrid> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.estimate(xs, ys, partitions, &mut rng)
    }

    /// Fit the density of all points and of every stratum of each partition,
    /// drawing subsamples from `rng`. At most one partition of each kind.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        xs: &[f64],
        ys: &[f64],
        partitions: &[Partition<'_>],
        rng: &mut R,
    ) -> ContourResult<ContourGrid> {
        self.validate(xs, ys, partitions)?;

        let domain = Domain::padded_square(xs, ys).ok_or(ContourError::EmptyPointSet { stratum: None })?;
        let all: Vec<usize> = (0..xs.len()).collect();

        log::info!(
            "Estimating density of {} points on a {}x{} grid",
            xs.len(),
            self.grid_size,
            self.grid_size
        );
        let main = self.fit_stratum(xs, ys, &all, &domain, rng)?;

        let mut contour = ContourGrid {
            grid: main.grid,
            x_range: domain.x_range,
            y_range: domain.y_range,
            padded: true,
            sample_size: main.sample_size,
            total_point_size: main.total,
            groups: None,
            times: None,
        };

        for partition in partitions {
            match *partition {
                Partition::ByGroup { labels, names } => {
                    contour.groups = Some(self.fit_groups(xs, ys, labels, names, &domain, rng)?);
                }
                Partition::ByTime { times, format } => {
                    contour.times = Some(self.fit_times(xs, ys, times, format, &domain, rng)?);
                }
            }
        }

        Ok(contour)
    }

    fn validate(&self, xs: &[f64], ys: &[f64], partitions: &[Partition<'_>]) -> ContourResult<()> {
        if self.grid_size == 0 {
            return Err(ContourError::InvalidParameter("grid size must be positive".to_string()));
        }
        if self.max_sample == 0 {
            return Err(ContourError::InvalidParameter("max sample must be positive".to_string()));
        }
        if xs.len() != ys.len() {
            return Err(ContourError::CoordinateMismatch { xs: xs.len(), ys: ys.len() });
        }
        if let Some(index) = xs.iter().zip(ys).position(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(ContourError::NonFiniteCoordinate { index });
        }

        let (mut groups, mut times_seen) = (false, false);
        for partition in partitions {
            match *partition {
                Partition::ByGroup { labels, names } => {
                    if std::mem::replace(&mut groups, true) {
                        return Err(ContourError::DuplicatePartition { kind: "group" });
                    }
                    let unique: BTreeSet<usize> = labels.iter().copied().collect();
                    if unique.len() != names.len() {
                        return Err(ContourError::GroupCountMismatch { labels: unique.len(), names: names.len() });
                    }
                    if labels.len() != xs.len() {
                        return Err(ContourError::LabelCountMismatch { labels: labels.len(), points: xs.len() });
                    }
                    if let Some(&label) = unique.iter().find(|&&l| l >= names.len()) {
                        return Err(ContourError::UnknownGroupLabel { label, names: names.len() });
                    }
                }
                Partition::ByTime { times, .. } => {
                    if std::mem::replace(&mut times_seen, true) {
                        return Err(ContourError::DuplicatePartition { kind: "time" });
                    }
                    if times.len() != xs.len() {
                        return Err(ContourError::TimeCountMismatch { times: times.len(), points: xs.len() });
                    }
                }
            }
        }

        if xs.is_empty() {
            return Err(ContourError::EmptyPointSet { stratum: None });
        }
        Ok(())
    }

    fn fit_groups<R: Rng + ?Sized>(
        &self,
        xs: &[f64],
        ys: &[f64],
        labels: &[usize],
        names: &[String],
        domain: &Domain,
        rng: &mut R,
    ) -> ContourResult<GroupGrids> {
        let mut groups = GroupGrids {
            group_grids: BTreeMap::new(),
            group_total_point_sizes: BTreeMap::new(),
            group_names: names.to_vec(),
        };
        for (label, name) in names.iter().enumerate() {
            let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == label).collect();
            if members.is_empty() {
                return Err(ContourError::EmptyPointSet { stratum: Some(name.clone()) });
            }
            log::debug!("Group '{}': {} points", name, members.len());
            let stratum = self.fit_stratum(xs, ys, &members, domain, rng)?;
            groups.group_grids.insert(name.clone(), stratum.grid);
            groups.group_total_point_sizes.insert(name.clone(), stratum.total);
        }
        Ok(groups)
    }

    fn fit_times<R: Rng + ?Sized>(
        &self,
        xs: &[f64],
        ys: &[f64],
        times: &[String],
        format: Option<&str>,
        domain: &Domain,
        rng: &mut R,
    ) -> ContourResult<TimeGrids> {
        let mut buckets: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, t) in times.iter().enumerate() {
            buckets.entry(t.as_str()).or_default().push(i);
        }
        let mut grids = TimeGrids {
            time_grids: BTreeMap::new(),
            time_counter: BTreeMap::new(),
            time_format: format.map(str::to_string),
        };
        for (time, members) in buckets {
            log::debug!("Time '{}': {} points", time, members.len());
            let stratum = self.fit_stratum(xs, ys, &members, domain, rng)?;
            grids.time_grids.insert(time.to_string(), stratum.grid);
            grids.time_counter.insert(time.to_string(), stratum.total);
        }
        Ok(grids)
    }

    fn fit_stratum<R: Rng + ?Sized>(
        &self,
        xs: &[f64],
        ys: &[f64],
        members: &[usize],
        domain: &Domain,
        rng: &mut R,
    ) -> ContourResult<Stratum> {
        let total = members.len();
        let sample_size = self.max_sample.min(total);
        let bandwidth = silverman_bandwidth(sample_size, 2);

        let samples: Vec<[f64; 2]> = if total > sample_size {
            let mut picked = rand::seq::index::sample(rng, total, sample_size).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|k| [xs[members[k]], ys[members[k]]]).collect()
        } else {
            members.iter().map(|&i| [xs[i], ys[i]]).collect()
        };

        let kde = GaussianKde::fit(samples, bandwidth).ok_or(ContourError::EmptyPointSet { stratum: None })?;
        let (grid_xs, grid_ys) = domain.lattice(self.grid_size);

        let grid: Grid = grid_ys
            .par_iter()
            .map(|&y| grid_xs.iter().map(|&x| round_to(kde.density(x, y), 4)).collect::<Vec<f64>>())
            .collect();

        Ok(Stratum { grid, sample_size, total })
    }
}
