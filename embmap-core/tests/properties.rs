use embmap_core::types::points_from_coords;
use embmap_core::*;
use proptest::prelude::*;
use std::collections::HashMap;

fn coords() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    prop::collection::vec((-50.0f64..50.0, -50.0f64..50.0), 1..120)
        .prop_map(|pts| pts.into_iter().unzip())
}

fn tree_of(xs: &[f64], ys: &[f64]) -> Quadtree {
    Quadtree::from_points(&points_from_coords(xs, ys)).unwrap()
}

proptest! {
    #[test]
    fn tiles_partition_every_point((xs, ys) in coords(), level in 0u32..12) {
        let Collapsed { tiles, .. } = collapse(tree_of(&xs, &ys), level).unwrap();
        let mut ids: Vec<usize> = tiles.iter().flat_map(|t| t.point_ids.iter().copied()).collect();
        ids.sort_unstable();
        prop_assert_eq!(ids, (0..xs.len()).collect::<Vec<_>>());
    }

    #[test]
    fn coarser_tiles_absorb_finer_ones((xs, ys) in coords(), fine in 1u32..12, step in 1u32..6) {
        let coarse = fine.saturating_sub(step);
        let Collapsed { tree, tiles: fine_tiles } = collapse(tree_of(&xs, &ys), fine).unwrap();
        let Collapsed { tiles: coarse_tiles, .. } = collapse(tree, coarse).unwrap();

        let mut owner = HashMap::new();
        for tile in &coarse_tiles {
            for &pid in &tile.point_ids {
                owner.insert(pid, tile.row);
            }
        }
        for tile in &fine_tiles {
            let first = owner[&tile.point_ids[0]];
            for pid in &tile.point_ids {
                prop_assert_eq!(owner[pid], first);
            }
        }
    }

    #[test]
    fn level_selection_is_monotonic(small in 1.0f64..20.0, extra in 0.0f64..20.0, width in 100u32..2000) {
        let viewport = Viewport { width, height: width / 2, ideal_tile_width: 35.0 };
        let extent = [[0.0, 0.0], [64.0, 64.0]];
        let a = select_levels(small, &viewport, [1.0, 40.0], [2.0, 30.0], extent).unwrap();
        let b = select_levels(small + extra, &viewport, [1.0, 40.0], [2.0, 30.0], extent).unwrap();
        prop_assert!(a.min_level <= a.max_level);
        prop_assert!(b.max_level >= a.max_level);
        prop_assert!(b.min_level <= a.min_level);
    }

    #[test]
    fn contour_domain_is_square((xs, ys) in coords()) {
        let c = ContourEstimator::new(3, 50).estimate_seeded(&xs, &ys, &[], 3).unwrap();
        let wx = c.x_range[1] - c.x_range[0];
        let wy = c.y_range[1] - c.y_range[0];
        prop_assert!((wx - wy).abs() <= 1e-9 * wx.max(1.0));

        let (x_lo, x_hi) = xs.iter().fold((f64::MAX, f64::MIN), |(l, h), &v| (l.min(v), h.max(v)));
        let (y_lo, y_hi) = ys.iter().fold((f64::MAX, f64::MIN), |(l, h), &v| (l.min(v), h.max(v)));
        prop_assert!(c.x_range[0] < x_lo && c.x_range[1] > x_hi);
        prop_assert!(c.y_range[0] < y_lo && c.y_range[1] > y_hi);
    }
}

#[test]
fn single_zoom_scale_gives_single_level() {
    let range = select_levels(1.0, &Viewport::default(), [0.0, 3.0], [0.0, 5.0], [[0.0, 0.0], [8.0, 8.0]]).unwrap();
    assert_eq!(range.min_level, range.max_level);
}

#[test]
fn unit_square_round_trip() {
    let xs = [0.0, 1.0, 0.0, 1.0];
    let ys = [0.0, 0.0, 1.0, 1.0];
    let texts = ["cat dog", "dog bird", "cat dog", "dog bird"];

    let contour = ContourEstimator::new(4, 100).estimate_seeded(&xs, &ys, &[], 202355).unwrap();
    for r in 0..4 {
        for c in 0..4 {
            assert!((contour.grid[r][c] - contour.grid[3 - r][3 - c]).abs() < 1.5e-4);
        }
    }

    let (counts, vocab) = CountVectorizer::default().fit_transform(&texts).unwrap();
    let levels = extract_all_levels(tree_of(&xs, &ys), &counts, &vocab, None, None).unwrap();

    let coarsest = &levels[&0];
    assert_eq!(coarsest.len(), 1);
    assert!(coarsest[0].keywords.iter().any(|(w, _)| w == "dog"));

    // Once tiles separate the documents the shared term ranks below the distinctive one
    for tile in &levels[&1] {
        let dog = tile.keywords.iter().position(|(w, _)| w == "dog").unwrap();
        assert!(dog > 0, "{:?}", tile.keywords);
        assert!(["cat", "bird"].contains(&tile.keywords[0].0.as_str()));
    }
}

#[test]
fn level_topics_are_reproducible() {
    let xs: Vec<f64> = (0..300).map(|i| ((i * 7919) % 1000) as f64 / 37.0).collect();
    let ys: Vec<f64> = (0..300).map(|i| ((i * 104729) % 997) as f64 / 41.0).collect();
    let words = ["alpha", "beta", "gamma", "delta", "omega", "sigma"];
    let texts: Vec<String> = (0..300)
        .map(|i| format!("{} {} {}", words[i % 6], words[(i / 6) % 6], words[(i * 5) % 6]))
        .collect();

    let run = || {
        let (counts, vocab) = CountVectorizer::default().fit_transform(&texts).unwrap();
        let levels = extract_all_levels(tree_of(&xs, &ys), &counts, &vocab, Some(1), Some(6)).unwrap();
        serde_json::to_vec(&levels).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn malformed_group_labels_are_rejected() {
    let names = vec!["a".to_string(), "b".to_string()];
    let labels = [0, 1];
    let err = ContourEstimator::default()
        .estimate_seeded(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &[Partition::ByGroup { labels: &labels, names: &names }], 1)
        .unwrap_err();
    assert!(matches!(err, contour::ContourError::LabelCountMismatch { labels: 2, points: 3 }));
}
