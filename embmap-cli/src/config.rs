//! Configuration handling for EmbMap CLI
//!
//! Supports loading configuration from embmap.toml files with CLI argument overrides.

use anyhow::{Result, Context};
use embmap_core::summary::{SummaryParams, TopicParams};
use embmap_core::text::StopWords;
use embmap_core::ContourParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub contour: ContourConfig,
    pub topic: TopicConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default number of threads to use
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Show a progress bar while levels are extracted
    #[serde(default = "default_true")]
    pub progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContourConfig {
    /// Grid resolution per axis
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,

    /// Maximum number of points the density is fitted on
    #[serde(default = "default_max_sample")]
    pub max_sample: usize,

    /// Seed for subsampling
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Deepest zoom the viewer allows
    #[serde(default = "default_max_zoom_scale")]
    pub max_zoom_scale: f64,

    /// Approximate viewer width in pixels
    #[serde(default = "default_render_size")]
    pub render_width: u32,

    /// Approximate viewer height in pixels
    #[serde(default = "default_render_size")]
    pub render_height: u32,

    /// Preferred on-screen tile width in pixels
    #[serde(default = "default_ideal_tile_width")]
    pub ideal_tile_width: f64,

    /// Keywords kept per tile
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Smallest and largest n-gram length
    #[serde(default = "default_ngram_range")]
    pub ngram_range: [usize; 2],

    /// "english", "none", or a custom word list
    #[serde(default = "default_stop_words")]
    pub stop_words: StopWords,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Name shown by the viewer
    #[serde(default = "default_embedding_name")]
    pub embedding_name: String,

    /// Fixed point opacity; the viewer adapts it when unset
    #[serde(default)]
    pub opacity: Option<f64>,

    /// Group label whose points are images
    #[serde(default)]
    pub image_label: Option<usize>,

    /// URL prefix for image points
    #[serde(default)]
    pub image_url_prefix: Option<String>,

    /// Pretty-print the JSON output
    #[serde(default)]
    pub pretty: bool,
}

// Default value functions
fn default_threads() -> usize { num_cpus::get() }
fn default_true() -> bool { true }
fn default_grid_size() -> usize { ContourParams::default().grid_size }
fn default_max_sample() -> usize { ContourParams::default().max_sample }
fn default_random_seed() -> u64 { ContourParams::default().random_seed }
fn default_max_zoom_scale() -> f64 { 30.0 }
fn default_render_size() -> u32 { 1000 }
fn default_ideal_tile_width() -> f64 { 35.0 }
fn default_top_k() -> usize { embmap_core::topics::DEFAULT_TOP_K }
fn default_stop_words() -> StopWords { StopWords::English }
fn default_ngram_range() -> [usize; 2] { [1, 1] }
fn default_embedding_name() -> String { "My Embedding".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                threads: default_threads(),
                progress: true,
            },
            contour: ContourConfig {
                grid_size: default_grid_size(),
                max_sample: default_max_sample(),
                random_seed: default_random_seed(),
            },
            topic: TopicConfig {
                max_zoom_scale: default_max_zoom_scale(),
                render_width: default_render_size(),
                render_height: default_render_size(),
                ideal_tile_width: default_ideal_tile_width(),
                top_k: default_top_k(),
                ngram_range: default_ngram_range(),
                stop_words: default_stop_words(),
            },
            output: OutputConfig {
                embedding_name: default_embedding_name(),
                opacity: None,
                image_label: None,
                image_url_prefix: None,
                pretty: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                // Try to find embmap.toml in current directory
                let default_path = PathBuf::from("embmap.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: embmap.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default configuration")
    }

    pub fn contour_params(&self) -> ContourParams {
        ContourParams {
            grid_size: self.contour.grid_size,
            max_sample: self.contour.max_sample,
            random_seed: self.contour.random_seed,
        }
    }

    pub fn topic_params(&self) -> TopicParams {
        TopicParams {
            max_zoom_scale: self.topic.max_zoom_scale,
            render_width: self.topic.render_width,
            render_height: self.topic.render_height,
            ideal_tile_width: self.topic.ideal_tile_width,
            top_k: self.topic.top_k,
            stop_words: self.topic.stop_words.clone(),
            ngram_range: (self.topic.ngram_range[0], self.topic.ngram_range[1]),
        }
    }

    pub fn summary_params(&self) -> SummaryParams {
        SummaryParams {
            embedding_name: self.output.embedding_name.clone(),
            contour: self.contour_params(),
            topic: self.topic_params(),
            image_label: self.output.image_label,
            image_url_prefix: self.output.image_url_prefix.clone(),
            opacity: self.output.opacity,
            json_point: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.contour.grid_size, 200);
        assert_eq!(config.contour.random_seed, 202355);
        assert_eq!(config.topic.stop_words, StopWords::English);
        assert_eq!(config.topic_params(), TopicParams::default());
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.output.opacity = Some(0.4);
        config.topic.stop_words = StopWords::Custom(vec!["lorem".to_string()]);
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(config.contour.max_sample, loaded_config.contour.max_sample);
        assert_eq!(config.topic.stop_words, loaded_config.topic.stop_words);
        assert_eq!(loaded_config.output.opacity, Some(0.4));

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(
            temp_file.path(),
            "[general]\n[contour]\ngrid_size = 50\n[topic]\n[output]\n",
        )?;
        let config = Config::load_from_file(temp_file.path())?;
        assert_eq!(config.contour.grid_size, 50);
        assert_eq!(config.contour.max_sample, 100_000);
        assert_eq!(config.topic.top_k, 10);
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[general]"));
        assert!(example.contains("[contour]"));
        assert!(example.contains("[topic]"));
        Ok(())
    }
}
