use crate::error::{ProtocolError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Normalize a repo-relative path to forward slashes without a leading `./`.
#[must_use]
pub fn normalize_rel_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while value.starts_with("./") {
        value = value[2..].to_string();
    }
    value.trim_start_matches('/').to_string()
}

/// A set of anchored path globs.
///
/// `**` spans any number of path segments (including none), `*` stays inside one
/// segment and `?` matches a single non-separator character. Matching is
/// case-insensitive and always covers the whole relative path.
#[derive(Clone, Debug)]
pub struct PathGlobs {
    set: GlobSet,
    patterns: Vec<String>,
}

impl PathGlobs {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();
        for raw in patterns {
            let pattern = normalize_rel_path(raw.as_ref());
            if pattern.is_empty() {
                continue;
            }
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .case_insensitive(true)
                .build()
                .map_err(|source| ProtocolError::InvalidGlob {
                    pattern: pattern.clone(),
                    source,
                })?;
            builder.add(glob);
            kept.push(pattern);
        }
        let set = builder.build().map_err(|source| ProtocolError::InvalidGlob {
            pattern: kept.join(","),
            source,
        })?;
        Ok(Self {
            set,
            patterns: kept,
        })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_match(&self, rel_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        self.set.is_match(normalize_rel_path(rel_path))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for PathGlobs {
    fn default() -> Self {
        Self::empty()
    }
}
