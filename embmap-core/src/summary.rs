//! Assembly of the topic and grid summaries consumed by the map viewer.

use crate::contour::{ContourError, ContourEstimator, ContourGrid, ContourParams, Partition};
use crate::lod::{select_levels, LevelError, Viewport};
use crate::pipeline::extract_all_levels_with;
use crate::quadtree::{Quadtree, TreeError};
use crate::text::{CountVectorizer, StopWords, TextError};
use crate::topics::{TopicError, DEFAULT_TOP_K};
use crate::types::{points_from_coords, round_to, Level};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Input length mismatch: {0}")]
    InputLengthMismatch(String),

    #[error("Cannot summarize an empty corpus")]
    EmptyInput,

    #[error("Point {index} is not a JSON object with a string '{key}' field")]
    JsonPoint { index: usize, key: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Text(#[from] TextError),

    #[error(transparent)]
    Topic(#[from] TopicError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Contour(#[from] ContourError),
}

pub type SummaryResult<T> = Result<T, SummaryError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicParams {
    pub max_zoom_scale: f64,
    pub render_width: u32,
    pub render_height: u32,
    pub ideal_tile_width: f64,
    pub top_k: usize,
    pub stop_words: StopWords,
    pub ngram_range: (usize, usize),
}

impl Default for TopicParams {
    fn default() -> Self {
        Self {
            max_zoom_scale: 30.0,
            render_width: 1000,
            render_height: 1000,
            ideal_tile_width: 35.0,
            top_k: DEFAULT_TOP_K,
            stop_words: StopWords::English,
            ngram_range: (1, 1),
        }
    }
}

impl TopicParams {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.render_width,
            height: self.render_height,
            ideal_tile_width: self.ideal_tile_width,
        }
    }
}

/// How the viewer parses points whose text is a JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonPointConfig {
    pub text_key: String,
    #[serde(default)]
    pub group_labels: Option<Vec<usize>>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default, rename = "imageURLPrefix")]
    pub image_url_prefix: Option<String>,
    #[serde(default)]
    pub large_image_key: Option<String>,
    #[serde(default, rename = "largeImageURLPrefix")]
    pub large_image_url_prefix: Option<String>,
    #[serde(default)]
    pub link_field_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryParams {
    pub embedding_name: String,
    pub contour: ContourParams,
    pub topic: TopicParams,
    pub image_label: Option<usize>,
    pub image_url_prefix: Option<String>,
    pub opacity: Option<f64>,
    pub json_point: Option<JsonPointConfig>,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            embedding_name: "My Embedding".to_string(),
            contour: ContourParams::default(),
            topic: TopicParams::default(),
            image_label: None,
            image_url_prefix: None,
            opacity: None,
            json_point: None,
        }
    }
}

/// Points, their documents and optional strata
#[derive(Debug, Clone, Default)]
pub struct SummaryInput {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub texts: Vec<String>,
    pub labels: Option<Vec<usize>>,
    pub group_names: Option<Vec<String>>,
    pub times: Option<Vec<String>>,
    pub time_format: Option<String>,
}

/// One label placed at a tile centre: `[x, y, name]`
pub type TopicLabel = (f64, f64, String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub extent: [[f64; 2]; 2],
    pub data: BTreeMap<Level, Vec<TopicLabel>>,
    pub range: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub image_group: usize,
    #[serde(rename = "imageURLPrefix", skip_serializing_if = "Option::is_none")]
    pub image_url_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSummary {
    #[serde(flatten)]
    pub contour: ContourGrid,
    pub topic: TopicSummary,
    pub embedding_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_point: Option<JsonPointConfig>,
}

/// Build the quadtree and term matrix, choose the levels for the zoom range
/// and label every tile at every selected level.
pub fn generate_topic_summary<S: AsRef<str>>(
    xs: &[f64],
    ys: &[f64],
    texts: &[S],
    params: &TopicParams,
) -> SummaryResult<TopicSummary> {
    generate_topic_summary_with(xs, ys, texts, params, |_, _| {})
}

/// [`generate_topic_summary`] reporting `(level, tiles)` after each level
pub fn generate_topic_summary_with<S, F>(
    xs: &[f64],
    ys: &[f64],
    texts: &[S],
    params: &TopicParams,
    on_level: F,
) -> SummaryResult<TopicSummary>
where
    S: AsRef<str>,
    F: FnMut(Level, usize),
{
    if xs.len() != ys.len() || xs.len() != texts.len() {
        return Err(SummaryError::InputLengthMismatch(format!(
            "{} x values, {} y values, {} texts",
            xs.len(),
            ys.len(),
            texts.len()
        )));
    }

    let tree = Quadtree::from_points(&points_from_coords(xs, ys))?;
    let extent = tree.extent().ok_or(SummaryError::EmptyInput)?;

    let vectorizer = CountVectorizer::new(params.stop_words.clone(), params.ngram_range);
    let (counts, vocabulary) = vectorizer.fit_transform(texts)?;

    let (x_min, x_max) = bounds_of(xs);
    let (y_min, y_max) = bounds_of(ys);
    let range = select_levels(
        params.max_zoom_scale,
        &params.viewport(),
        [x_min, x_max],
        [y_min, y_max],
        extent,
    )?;
    log::info!(
        "Extracting topics for levels {}..={} from {} documents ({} terms)",
        range.min_level,
        range.max_level,
        texts.len(),
        vocabulary.len()
    );

    let levels = extract_all_levels_with(tree, &counts, &vocabulary, range, params.top_k, on_level)?;

    let data = levels
        .into_iter()
        .map(|(level, topics)| {
            let labels = topics
                .iter()
                .map(|t| {
                    let (cx, cy) = t.bounds.center();
                    (round_to(cx, 3), round_to(cy, 3), t.label(4))
                })
                .collect();
            (level, labels)
        })
        .collect();

    Ok(TopicSummary { extent, data, range: [x_min, y_min, x_max, y_max] })
}

fn bounds_of(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Read each point's document from the `key` field of its JSON text
pub fn json_point_texts<S: AsRef<str>>(texts: &[S], key: &str) -> SummaryResult<Vec<String>> {
    texts
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let value: serde_json::Value = serde_json::from_str(raw.as_ref())
                .map_err(|_| SummaryError::JsonPoint { index, key: key.to_string() })?;
            value
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| SummaryError::JsonPoint { index, key: key.to_string() })
        })
        .collect()
}

/// Contours plus topics plus viewer metadata
pub fn generate_grid_summary(input: &SummaryInput, params: &SummaryParams) -> SummaryResult<GridSummary> {
    generate_grid_summary_with(input, params, |_, _| {})
}

pub fn generate_grid_summary_with<F>(
    input: &SummaryInput,
    params: &SummaryParams,
    on_level: F,
) -> SummaryResult<GridSummary>
where
    F: FnMut(Level, usize),
{
    log::info!("Generating contours");
    let estimator = ContourEstimator::from(&params.contour);
    let contour = estimator.estimate_seeded(&input.xs, &input.ys, &input.partitions(), params.contour.random_seed)?;

    log::info!("Generating multi-level summaries");
    let topic = match &params.json_point {
        Some(cfg) => {
            let texts = json_point_texts(&input.texts, &cfg.text_key)?;
            generate_topic_summary_with(&input.xs, &input.ys, &texts, &params.topic, on_level)?
        }
        None => generate_topic_summary_with(&input.xs, &input.ys, &input.texts, &params.topic, on_level)?,
    };

    let image = params.image_label.map(|group| ImageConfig {
        image_group: group,
        image_url_prefix: params.image_url_prefix.clone(),
    });

    Ok(GridSummary {
        contour,
        topic,
        embedding_name: params.embedding_name.clone(),
        opacity: params.opacity,
        image,
        json_point: params.json_point.clone(),
    })
}

impl SummaryInput {
    /// Contour strata requested by this input. Group grids need both labels
    /// and names; either one alone adds no group strata.
    pub fn partitions(&self) -> Vec<Partition<'_>> {
        let mut partitions = Vec::new();
        match (&self.labels, &self.group_names) {
            (Some(labels), Some(names)) => partitions.push(Partition::ByGroup { labels, names }),
            (Some(_), None) | (None, Some(_)) => {
                log::debug!("Group labels and group names must both be given; skipping group grids")
            }
            (None, None) => {}
        }
        if let Some(times) = &self.times {
            partitions.push(Partition::ByTime { times, format: self.time_format.as_deref() });
        }
        partitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_input() -> SummaryInput {
        SummaryInput {
            xs: vec![0.0, 1.0, 0.0, 1.0],
            ys: vec![0.0, 0.0, 1.0, 1.0],
            texts: vec!["cat dog".into(), "dog bird".into(), "cat dog".into(), "dog bird".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_topic_summary_levels_and_labels() {
        let input = square_input();
        let params = TopicParams { max_zoom_scale: 1.0, ..Default::default() };
        let summary = generate_topic_summary(&input.xs, &input.ys, &input.texts, &params).unwrap();

        assert_eq!(summary.extent, [[0.0, 0.0], [2.0, 2.0]]);
        assert_eq!(summary.range, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(summary.data.len(), 1);
        for labels in summary.data.values() {
            assert_eq!(labels.len(), 4);
            for (_, _, name) in labels {
                assert!(name.starts_with("cat-dog") || name.starts_with("bird-dog"), "{}", name);
            }
        }
    }

    #[test]
    fn test_topic_summary_json_shape() {
        let input = square_input();
        let params = TopicParams { max_zoom_scale: 1.0, ..Default::default() };
        let summary = generate_topic_summary(&input.xs, &input.ys, &input.texts, &params).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        let (level, labels) = json["data"].as_object().unwrap().iter().next().unwrap();
        assert!(level.parse::<u32>().is_ok());
        assert_eq!(labels[0].as_array().unwrap().len(), 3);
        assert!(json["extent"].is_array());
    }

    #[test]
    fn test_grid_summary_metadata() {
        let input = square_input();
        let params = SummaryParams {
            embedding_name: "Pets".into(),
            contour: ContourParams { grid_size: 4, ..Default::default() },
            topic: TopicParams { max_zoom_scale: 2.0, ..Default::default() },
            image_label: Some(1),
            opacity: Some(0.5),
            ..Default::default()
        };
        let summary = generate_grid_summary(&input, &params).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["embeddingName"], "Pets");
        assert_eq!(json["opacity"], 0.5);
        assert_eq!(json["image"], serde_json::json!({"imageGroup": 1}));
        assert_eq!(json["grid"].as_array().unwrap().len(), 4);
        assert_eq!(json["totalPointSize"], 4);
        assert!(json["topic"]["data"].is_object());
        assert!(json.get("jsonPoint").is_none());
    }

    #[test]
    fn test_json_point_texts() {
        let raw = [r#"{"t": "hello world"}"#, r#"{"t": "bye"}"#];
        assert_eq!(json_point_texts(&raw, "t").unwrap(), vec!["hello world", "bye"]);
        assert!(matches!(
            json_point_texts(&raw, "missing"),
            Err(SummaryError::JsonPoint { index: 0, .. })
        ));
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        let err = generate_topic_summary(&[1.0], &[1.0], &["a", "b"], &TopicParams::default()).unwrap_err();
        assert!(matches!(err, SummaryError::InputLengthMismatch(_)));

        let empty: [&str; 0] = [];
        let err = generate_topic_summary(&[], &[], &empty, &TopicParams::default()).unwrap_err();
        assert!(matches!(err, SummaryError::EmptyInput));
    }

    #[test]
    fn test_grid_summary_with_groups_and_times() {
        let mut input = square_input();
        input.labels = Some(vec![0, 1, 0, 1]);
        input.group_names = Some(vec!["a".into(), "b".into()]);
        input.times = Some(vec!["2020".into(), "2021".into(), "2020".into(), "2021".into()]);
        let params = SummaryParams {
            contour: ContourParams { grid_size: 4, ..Default::default() },
            topic: TopicParams { max_zoom_scale: 1.0, ..Default::default() },
            ..Default::default()
        };

        let summary = generate_grid_summary(&input, &params).unwrap();
        let groups = summary.contour.groups.as_ref().unwrap();
        assert_eq!(groups.group_total_point_sizes["b"], 2);
        let times = summary.contour.times.as_ref().unwrap();
        assert_eq!(times.time_counter["2020"], 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("groupGrids").is_some());
        assert!(json.get("timeGrids").is_some());
        assert!(json["timeFormat"].is_null());
    }

    #[test]
    fn test_labels_without_names_still_give_time_grids() {
        let mut input = square_input();
        input.labels = Some(vec![0, 1, 0, 1]);
        input.times = Some(vec!["2020".into(), "2021".into(), "2020".into(), "2021".into()]);
        let params = SummaryParams {
            contour: ContourParams { grid_size: 4, ..Default::default() },
            topic: TopicParams { max_zoom_scale: 1.0, ..Default::default() },
            ..Default::default()
        };

        let summary = generate_grid_summary(&input, &params).unwrap();
        assert!(summary.contour.groups.is_none());
        assert_eq!(summary.contour.times.as_ref().unwrap().time_grids.len(), 2);
    }

    #[test]
    fn test_malformed_groups_propagate() {
        let mut input = square_input();
        input.labels = Some(vec![0, 1]);
        input.group_names = Some(vec!["a".into(), "b".into()]);
        let err = generate_grid_summary(&input, &SummaryParams::default()).unwrap_err();
        assert!(matches!(err, SummaryError::Contour(ContourError::LabelCountMismatch { .. })));
    }
}
