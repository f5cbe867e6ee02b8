use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cluster::engine::DEFAULT_MAX_CLUSTERS;
use crate::dedup::phases::DEFAULT_DEDUP_THRESHOLD;
use crate::matrix::DEFAULT_ID_COLUMN;

pub const DEFAULT_METADATA_DELIMITER: u8 = b';';
pub const DEFAULT_OUTPUT_DIR: &str = "output/csv";
pub const DEFAULT_SEED: u64 = 42;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// value has a default; command-line flags override them per run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Header of the document identifier column in both input files.
    pub id_column: String,
    /// Field separator of the raw metadata export.
    pub metadata_delimiter: u8,
    /// Where cluster artifacts go.
    pub output_dir: PathBuf,
    /// Similarity threshold for deduplication.
    pub threshold: f64,
    /// Largest cluster count tried for the inertia curve.
    pub max_clusters: usize,
    /// k-means random state.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_column: DEFAULT_ID_COLUMN.to_string(),
            metadata_delimiter: DEFAULT_METADATA_DELIMITER,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            threshold: DEFAULT_DEDUP_THRESHOLD,
            max_clusters: DEFAULT_MAX_CLUSTERS,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let metadata_delimiter = match lookup("TAGCLUST_METADATA_DELIMITER") {
            Some(value) => parse_delimiter(&value)?,
            None => defaults.metadata_delimiter,
        };

        let threshold = match lookup("TAGCLUST_THRESHOLD") {
            Some(value) => value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("TAGCLUST_THRESHOLD must be a number, got {value:?}"))?,
            None => defaults.threshold,
        };
        validate_threshold(threshold)?;

        let max_clusters = match lookup("TAGCLUST_MAX_CLUSTERS") {
            Some(value) => value.trim().parse::<usize>().with_context(|| {
                format!("TAGCLUST_MAX_CLUSTERS must be a whole number, got {value:?}")
            })?,
            None => defaults.max_clusters,
        };
        if max_clusters == 0 {
            anyhow::bail!("TAGCLUST_MAX_CLUSTERS must be at least 1");
        }

        let seed = match lookup("TAGCLUST_SEED") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("TAGCLUST_SEED must be a whole number, got {value:?}"))?,
            None => defaults.seed,
        };

        Ok(Self {
            id_column: lookup("TAGCLUST_ID_COLUMN").unwrap_or(defaults.id_column),
            metadata_delimiter,
            output_dir: lookup("TAGCLUST_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            threshold,
            max_clusters,
            seed,
        })
    }
}

/// The threshold is a Bray-Curtis cutoff, so only (0, 1] is meaningful.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        anyhow::bail!("Threshold must be in (0, 1], got {threshold}");
    }
    Ok(())
}

fn parse_delimiter(value: &str) -> Result<u8> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => anyhow::bail!(
            "TAGCLUST_METADATA_DELIMITER must be a single ASCII character, got {value:?}"
        ),
    }
}
