use crate::error::Result;
use crate::topic::Topic;
use context_protocol::PathGlobs;
use once_cell::sync::Lazy;
use regex::Regex;

/// Dropped for every topic: tests, mocks, fixtures, examples, build output, docs, config files.
const UNIVERSAL_STOPLIST: &[&str] = &[
    "**/test/**",
    "**/tests/**",
    "**/__tests__/**",
    "**/*.test.*",
    "**/*.spec.*",
    "**/test_*.py",
    "**/*_test.py",
    "**/*_test.go",
    "**/__mocks__/**",
    "**/mocks/**",
    "**/fixtures/**",
    "**/__fixtures__/**",
    "**/testdata/**",
    "**/examples/**",
    "**/example/**",
    "**/demo/**",
    "**/dist/**",
    "**/build/**",
    "**/out/**",
    "**/.next/**",
    "**/coverage/**",
    "**/generated/**",
    "**/__generated__/**",
    "**/*.generated.*",
    "**/*.d.ts",
    "**/*.min.js",
    "**/docs/**",
    "**/*.md",
    "**/*.mdx",
    "**/*.config.js",
    "**/*.config.cjs",
    "**/*.config.mjs",
    "**/*.config.ts",
    "**/tsconfig*.json",
    "**/.eslintrc*",
    "**/.prettierrc*",
    "**/*.lock",
    "**/package-lock.json",
];

fn topic_stoplist(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Auth => &["**/migrations/**", "**/*.sql", "**/*.css", "**/*.scss", "**/*.stories.*"],
        Topic::Db => &["**/*.css", "**/*.scss", "**/*.stories.*", "**/public/**"],
        Topic::Api => &["**/*.css", "**/*.scss", "**/*.stories.*", "**/public/**"],
        Topic::State | Topic::Components => &["**/migrations/**", "**/*.sql"],
        Topic::Errors | Topic::Config | Topic::Unknown => &[],
    }
}

/// Universal stoplist plus the additions for `topic`.
#[must_use]
pub fn stoplist_for(topic: Topic) -> Vec<&'static str> {
    UNIVERSAL_STOPLIST
        .iter()
        .chain(topic_stoplist(topic))
        .copied()
        .collect()
}

static API_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|/)(routes?|router|controllers?|handlers?|endpoints?)[^/]*\.\w+$")
        .expect("api hint regex")
});
static AUTH_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(auth|login|session|jwt|token)").expect("auth hint regex"));

struct TopicHints {
    globs: PathGlobs,
    regex: Option<&'static Regex>,
}

const API_HINT_GLOBS: &[&str] = &[
    "**/api/**",
    "**/routes/**",
    "**/router/**",
    "**/controllers/**",
    "**/handlers/**",
    "**/route.*",
    "**/server.*",
];
const COMPONENT_HINT_GLOBS: &[&str] = &[
    "**/components/**",
    "**/ui/**",
    "**/*.tsx",
    "**/*.jsx",
    "**/*.vue",
    "**/*.svelte",
];
const AUTH_HINT_GLOBS: &[&str] = &["**/auth/**", "**/middleware.*", "**/session/**", "**/login/**"];

impl TopicHints {
    fn for_topic(topic: Topic) -> Result<Option<Self>> {
        let (globs, regex) = match topic {
            Topic::Api => (API_HINT_GLOBS, Some(Lazy::force(&API_HINT))),
            Topic::Components => (COMPONENT_HINT_GLOBS, None),
            Topic::Auth => (AUTH_HINT_GLOBS, Some(Lazy::force(&AUTH_HINT))),
            _ => return Ok(None),
        };
        Ok(Some(Self {
            globs: PathGlobs::new(globs)?,
            regex,
        }))
    }

    fn is_hinted(&self, file: &str) -> bool {
        self.globs.is_match(file) || self.regex.is_some_and(|regex| regex.is_match(file))
    }
}

/// Topic-aware file filter and ordering.
pub struct FilePrioritizer {
    stoplist: PathGlobs,
    excludes: PathGlobs,
    hints: Option<TopicHints>,
}

impl FilePrioritizer {
    /// Fails only when a caller exclude pattern is not a valid glob.
    pub fn new(topic: Topic, exclude_patterns: &[String]) -> Result<Self> {
        Ok(Self {
            stoplist: PathGlobs::new(stoplist_for(topic))?,
            excludes: PathGlobs::new(exclude_patterns)?,
            hints: TopicHints::for_topic(topic)?,
        })
    }

    pub fn is_stoplisted(&self, file: &str) -> bool {
        self.stoplist.is_match(file)
    }

    /// Stoplisted or excluded by the caller.
    pub fn is_excluded(&self, file: &str) -> bool {
        self.is_stoplisted(file) || self.excludes.is_match(file)
    }

    /// Surviving files, hinted ones first for topics that have hints.
    /// Relative order is preserved within each group.
    pub fn prioritize(&self, files: &[String]) -> Vec<String> {
        let kept = files.iter().filter(|file| !self.is_excluded(file));
        let Some(hints) = &self.hints else {
            return kept.cloned().collect();
        };
        let (mut hinted, other): (Vec<String>, Vec<String>) =
            kept.cloned().partition(|file| hints.is_hinted(file));
        log::debug!(
            "Prioritized {} hinted and {} other files",
            hinted.len(),
            other.len()
        );
        hinted.extend(other);
        hinted
    }
}
