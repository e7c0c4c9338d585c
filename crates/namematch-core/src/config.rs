//! Searcher configuration with environment overrides.

use std::path::{Path, PathBuf};

use crate::errors::{MatchError, MatchResult};
use crate::query::guards::{clamp_limit, DEFAULT_SEARCH_LIMIT};

pub const DEFAULT_POOL_SIZE: usize = 4;
const MAX_POOL_SIZE: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearcherConfig {
    /// Directory holding `cb.sqlite`, `irmng.sqlite`, `vernacular.sqlite`
    /// and `id.sqlite`.
    pub index_dir: PathBuf,
    pub max_results: usize,
    /// Read connections kept per index snapshot.
    pub pool_size: usize,
}

impl SearcherConfig {
    pub fn new(index_dir: impl AsRef<Path>) -> Self {
        Self {
            index_dir: index_dir.as_ref().to_path_buf(),
            max_results: DEFAULT_SEARCH_LIMIT,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = clamp_limit(max_results);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.clamp(1, MAX_POOL_SIZE);
        self
    }

    /// Read `NAMEMATCH_INDEX_DIR` (required), `NAMEMATCH_MAX_RESULTS` and
    /// `NAMEMATCH_POOL_SIZE`.  Unparsable numbers fall back to defaults.
    pub fn from_env() -> MatchResult<Self> {
        let index_dir = match std::env::var("NAMEMATCH_INDEX_DIR") {
            Ok(val) if !val.trim().is_empty() => PathBuf::from(val.trim()),
            _ => {
                return Err(MatchError::InvalidInput(
                    "NAMEMATCH_INDEX_DIR is not set".to_string(),
                ))
            }
        };
        Ok(Self::new(index_dir)
            .with_max_results(env_usize("NAMEMATCH_MAX_RESULTS", DEFAULT_SEARCH_LIMIT))
            .with_pool_size(env_usize("NAMEMATCH_POOL_SIZE", DEFAULT_POOL_SIZE)))
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
