//! Topic extraction across a range of quadtree levels.

use crate::lod::LevelRange;
use crate::quadtree::Quadtree;
use crate::sparse::CsrMatrix;
use crate::tiles::{collapse, membership_matrix, Collapsed};
use crate::topics::{extract_topics, TopicEntry, TopicError, TopicResult, DEFAULT_TOP_K};
use crate::types::Level;
use std::collections::BTreeMap;

pub type LevelTopics = BTreeMap<Level, Vec<TopicEntry>>;

/// Extract tile topics for every level in `[min_level, max_level]`.
///
/// The tree is consumed: levels are processed deepest first and each collapse
/// coarsens it in place. Missing bounds default to `0` and the tree height.
pub fn extract_all_levels(
    tree: Quadtree,
    counts: &CsrMatrix,
    vocabulary: &[String],
    min_level: Option<Level>,
    max_level: Option<Level>,
) -> TopicResult<LevelTopics> {
    let range = LevelRange {
        min_level: min_level.unwrap_or(0),
        max_level: max_level.unwrap_or_else(|| tree.height()),
    };
    extract_all_levels_with(tree, counts, vocabulary, range, DEFAULT_TOP_K, |_, _| {})
}

/// Like [`extract_all_levels`] with an explicit range and keyword count;
/// `on_level(level, tiles)` is called after each level is done.
pub fn extract_all_levels_with<F>(
    mut tree: Quadtree,
    counts: &CsrMatrix,
    vocabulary: &[String],
    range: LevelRange,
    top_k: usize,
    mut on_level: F,
) -> TopicResult<LevelTopics>
where
    F: FnMut(Level, usize),
{
    if range.min_level > range.max_level {
        return Err(TopicError::InvalidLevelRange { min: range.min_level, max: range.max_level });
    }

    let corpus_len = counts.shape().0;
    let mut result = LevelTopics::new();

    for level in range.levels().rev() {
        let Collapsed { tree: coarser, tiles } = collapse(tree, level)?;
        tree = coarser;

        let membership = membership_matrix(&tiles, corpus_len)?;
        let bounds: Vec<_> = tiles.iter().map(|t| t.bounds).collect();
        let topics = extract_topics(&membership, &bounds, counts, vocabulary, top_k)?;

        log::debug!("Level {}: {} tiles", level, topics.len());
        on_level(level, topics.len());
        result.insert(level, topics);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{CountVectorizer, StopWords};
    use crate::types::points_from_coords;

    fn corpus() -> (Quadtree, CsrMatrix, Vec<String>) {
        let xs = [0.1, 0.2, 3.6, 3.8, 0.3, 3.7];
        let ys = [0.1, 0.3, 3.5, 3.9, 0.2, 3.6];
        let texts = [
            "apple banana",
            "apple cherry",
            "rocket launch",
            "rocket orbit",
            "banana apple",
            "orbit launch",
        ];
        let tree = Quadtree::from_points(&points_from_coords(&xs, &ys)).unwrap();
        let (counts, vocab) = CountVectorizer::new(StopWords::None, (1, 1)).fit_transform(&texts).unwrap();
        (tree, counts, vocab)
    }

    #[test]
    fn test_default_range_covers_tree_height() {
        let (tree, counts, vocab) = corpus();
        let height = tree.height();
        let levels = extract_all_levels(tree, &counts, &vocab, None, None).unwrap();
        assert_eq!(levels.keys().copied().collect::<Vec<_>>(), (0..=height).collect::<Vec<_>>());
        assert_eq!(levels[&0].len(), 1);
    }

    #[test]
    fn test_clusters_get_their_own_topics() {
        let (tree, counts, vocab) = corpus();
        let levels = extract_all_levels(tree, &counts, &vocab, Some(1), Some(1)).unwrap();
        let tiles = &levels[&1];
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].keywords[0].0, "apple");
        assert!(["launch", "orbit", "rocket"].contains(&tiles[1].keywords[0].0.as_str()));
    }

    #[test]
    fn test_observer_sees_levels_deepest_first() {
        let (tree, counts, vocab) = corpus();
        let mut seen = Vec::new();
        let range = LevelRange { min_level: 0, max_level: 3 };
        extract_all_levels_with(tree, &counts, &vocab, range, 2, |level, _| seen.push(level)).unwrap();
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let (tree, counts, vocab) = corpus();
        let err = extract_all_levels(tree, &counts, &vocab, Some(3), Some(1)).unwrap_err();
        assert!(matches!(err, TopicError::InvalidLevelRange { min: 3, max: 1 }));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let run = || {
            let (tree, counts, vocab) = corpus();
            let levels = extract_all_levels(tree, &counts, &vocab, None, None).unwrap();
            serde_json::to_string(&levels).unwrap()
        };
        assert_eq!(run(), run());
    }
}
