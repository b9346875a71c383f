use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_STRUCTURAL_TIMEOUT_MS: &str = "CONTEXT_LOCAL_STRUCTURAL_TIMEOUT_MS";
const ENV_MAX_MATCHES: &str = "CONTEXT_LOCAL_MAX_MATCHES";
const ENV_DETECTOR_BATCH: &str = "CONTEXT_LOCAL_DETECTOR_BATCH";

/// Operational limits of the local context engine.
///
/// Ranking weights and thresholds are constants of the ranker and are not
/// configurable here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard limit for one structural search run, in milliseconds
    pub structural_timeout_ms: u64,

    /// Match ceiling handed to structural search
    pub max_structural_matches: usize,

    /// Files read concurrently by the detectors
    pub detector_batch_size: usize,

    /// Projects kept by the in-memory index cache
    pub index_cache_capacity: usize,

    /// Lines after an anchor's start covered by its suggested excerpt
    pub excerpt_window_lines: usize,

    /// Longest snippet the bundle assembler cuts for one target
    pub max_snippet_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            structural_timeout_ms: 30_000,
            max_structural_matches: context_indexer::DEFAULT_MAX_MATCHES,
            detector_batch_size: context_search::DEFAULT_DETECTOR_BATCH,
            index_cache_capacity: context_indexer::DEFAULT_CACHE_CAPACITY,
            excerpt_window_lines: 30,
            max_snippet_lines: 60,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `CONTEXT_LOCAL_*` overrides. Unset, blank or unparsable values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .and_then(|v| v.parse::<u64>().ok())
        };
        if let Some(ms) = read(ENV_STRUCTURAL_TIMEOUT_MS) {
            self.structural_timeout_ms = ms.max(1);
        }
        if let Some(max) = read(ENV_MAX_MATCHES) {
            self.max_structural_matches = max as usize;
        }
        if let Some(batch) = read(ENV_DETECTOR_BATCH) {
            self.detector_batch_size = (batch as usize).clamp(1, 256);
        }
        self
    }

    pub fn structural_timeout(&self) -> Duration {
        Duration::from_millis(self.structural_timeout_ms)
    }
}
