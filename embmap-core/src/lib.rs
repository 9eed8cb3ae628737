//! EmbMap Core Library
//!
//! Quadtree tiling, tile topics, level selection and density contours for
//! embedding maps.

pub mod types;
pub mod quadtree;
pub mod tiles;
pub mod sparse;
pub mod text;
pub mod topics;
pub mod lod;
pub mod pipeline;
pub mod kde;
pub mod contour;
pub mod summary;

// Re-export commonly used types and functions
pub use types::{Level, Point, TileBounds};
pub use quadtree::{Quadtree, TreeError};
pub use tiles::{collapse, membership_matrix, Collapsed, Tile, TileError};
pub use sparse::CsrMatrix;
pub use text::{CountVectorizer, StopWords, TfidfTransformer};
pub use topics::{extract_topics, TopicEntry, TopicError};
pub use lod::{select_levels, LevelRange, Viewport};
pub use pipeline::{extract_all_levels, extract_all_levels_with, LevelTopics};
pub use contour::{ContourEstimator, ContourGrid, ContourParams, Partition};
pub use summary::{
    generate_grid_summary, generate_topic_summary, GridSummary, SummaryError, SummaryInput,
    SummaryParams, TopicParams, TopicSummary,
};

/// Version information for the EmbMap core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
