//! Keyword extraction per tile.

use crate::sparse::CsrMatrix;
use crate::tiles::TileError;
use crate::text::TfidfTransformer;
use crate::types::{round_to, TileBounds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Score given to padding slots so every tile carries `top_k` keywords
pub const PLACEHOLDER_SCORE: f64 = 0.00001;

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Shape mismatch: {left:?} × {right:?}")]
    ShapeMismatch { left: (usize, usize), right: (usize, usize) },

    #[error("Vocabulary has {vocabulary} terms but the count matrix has {columns} columns")]
    VocabularyMismatch { vocabulary: usize, columns: usize },

    #[error("Invalid level range: min {min} > max {max}")]
    InvalidLevelRange { min: u32, max: u32 },

    #[error(transparent)]
    Tile(#[from] TileError),
}

pub type TopicResult<T> = Result<T, TopicError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicEntry {
    #[serde(rename = "w")]
    pub keywords: Vec<(String, f64)>,
    #[serde(rename = "p")]
    pub bounds: TileBounds,
}

impl TopicEntry {
    /// First `n` keywords joined with `-`
    pub fn label(&self, n: usize) -> String {
        self.keywords
            .iter()
            .take(n)
            .map(|(w, _)| w.as_str())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Aggregate term counts per tile, weight them with tf-idf over tile rows and
/// keep the `top_k` terms of each tile.
///
/// `membership` is the tile × document indicator and `bounds[row]` the box of
/// tile `row`; only the first `bounds.len()` rows are reported.
pub fn extract_topics(
    membership: &CsrMatrix,
    bounds: &[TileBounds],
    counts: &CsrMatrix,
    vocabulary: &[String],
    top_k: usize,
) -> TopicResult<Vec<TopicEntry>> {
    if vocabulary.len() != counts.shape().1 {
        return Err(TopicError::VocabularyMismatch {
            vocabulary: vocabulary.len(),
            columns: counts.shape().1,
        });
    }
    if bounds.len() > membership.shape().0 {
        return Err(TopicError::ShapeMismatch {
            left: membership.shape(),
            right: (bounds.len(), counts.shape().0),
        });
    }

    if vocabulary.is_empty() {
        return Ok(bounds
            .iter()
            .map(|&b| TopicEntry { keywords: Vec::new(), bounds: b })
            .collect());
    }

    let tile_counts = membership.matmul(counts).ok_or(TopicError::ShapeMismatch {
        left: membership.shape(),
        right: counts.shape(),
    })?;
    let weights = TfidfTransformer::default().fit_transform(&tile_counts);

    let topics = bounds
        .iter()
        .enumerate()
        .map(|(row, &b)| TopicEntry { keywords: top_keywords(&weights, row, vocabulary, top_k), bounds: b })
        .collect();
    Ok(topics)
}

fn top_keywords(weights: &CsrMatrix, row: usize, vocabulary: &[String], top_k: usize) -> Vec<(String, f64)> {
    let mut scored: Vec<(usize, f64)> = weights.row(row).filter(|&(_, s)| s > 0.0).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(top_k);

    let mut keywords: Vec<(String, f64)> = scored
        .into_iter()
        .map(|(c, s)| (vocabulary[c].clone(), round_to(s, 4)))
        .collect();
    keywords.resize(top_k, (String::new(), PLACEHOLDER_SCORE));
    keywords
}
