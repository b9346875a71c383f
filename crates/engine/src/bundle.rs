//! Retrieval bundle: anchors, one-hop neighbors, env hints and bucket coverage.

use crate::answer::UNKNOWN_MARKER;
use context_graph::ImportGraph;
use context_indexer::ProjectContext;
use context_protocol::{
    Anchor, BundleDebug, CoverageEntry, RepoFingerprint, RetrievalBundle, SuggestedExcerpt,
};
use context_search::{RankedCandidate, Topic};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;

pub const MAX_ANCHORS: usize = 8;
pub const MAX_NEIGHBORS: usize = 12;
pub const MAX_ENV_HINTS: usize = 12;

/// Appended to the env hints of auth questions.
pub const AUTH_ENV_HINTS: &[&str] = &[
    "SUPABASE_URL",
    "SUPABASE_ANON_KEY",
    "JWT_SECRET",
    "NEXTAUTH_SECRET",
];

/// Lines shown before an anchor's start in its suggested excerpt.
const EXCERPT_LEAD_LINES: usize = 3;

struct CoverageBucket {
    name: &'static str,
    pattern: Regex,
}

static BUCKETS: Lazy<Vec<CoverageBucket>> = Lazy::new(|| {
    [
        (
            "frontend",
            r"(?i)(\.(tsx|jsx|vue|svelte|css|scss|html)$|(^|/)(components|pages|views|ui|frontend|client|hooks)/)",
        ),
        (
            "api",
            r"(?i)((^|/)(api|routes?|router|controllers?|handlers?|endpoints?)(/|\.)|(^|/)route\.\w+$)",
        ),
        (
            "backend",
            r"(?i)((^|/)(server|services?|lib|core|backend|middleware|workers?)(/|\.)|\.(py|rs|go|java|rb)$)",
        ),
        (
            "db",
            r"(?i)((^|/)(db|database|models?|migrations|prisma|schema|repositor(y|ies)|storage)(/|\.)|\.(sql|prisma)$)",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| CoverageBucket {
        name,
        pattern: Regex::new(pattern).expect("coverage bucket regex"),
    })
    .collect()
});

static AUTH_SOUNDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(auth|login|session|jwt|passport|clerk|supabase|oauth)").expect("auth regex")
});
static ENTRY_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|/)(index|main|app|server|lib|mod)\.\w+$").expect("entry file regex")
});

/// Everything one bundle is derived from.
pub struct BundleInputs<'a> {
    pub topic: Topic,
    pub ui_query: bool,
    pub ranked: &'a [RankedCandidate],
    pub context: &'a ProjectContext,
    pub graph: &'a ImportGraph,
    pub fingerprint: RepoFingerprint,
    pub excerpt_window_lines: usize,
    pub debug: Option<BundleDebug>,
}

/// Highest-scoring candidate per file, best first, at most [`MAX_ANCHORS`].
pub fn select_anchors(ranked: &[RankedCandidate], context: &ProjectContext) -> Vec<Anchor> {
    let mut sorted: Vec<&RankedCandidate> = ranked.iter().collect();
    sorted.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
    });

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|entry| seen.insert(entry.candidate.file.as_str()))
        .take(MAX_ANCHORS)
        .map(|entry| Anchor {
            file: entry.candidate.file.clone(),
            symbol: entry.candidate.symbol.clone(),
            start: entry.candidate.start,
            end: entry.candidate.end,
            score: entry.final_score,
            features: path_features(&entry.candidate.file, context),
        })
        .collect()
}

fn path_features(file: &str, context: &ProjectContext) -> Vec<String> {
    let mut features: Vec<String> = BUCKETS
        .iter()
        .filter(|bucket| bucket.pattern.is_match(file))
        .map(|bucket| bucket.name.to_string())
        .collect();
    if AUTH_SOUNDING.is_match(file) {
        features.push("auth-path".to_string());
    }
    if context
        .imports_of(file)
        .any(|import| AUTH_SOUNDING.is_match(&import.source))
    {
        features.push("auth-import".to_string());
    }
    if ENTRY_FILE.is_match(file) {
        features.push("entry".to_string());
    }
    features
}

/// Detected env keys (deduped, capped), plus the auth extras for the auth topic.
pub fn env_hints(context: &ProjectContext, topic: Topic) -> Vec<String> {
    let mut hints: Vec<String> = context.env_keys().into_iter().take(MAX_ENV_HINTS).collect();
    if topic == Topic::Auth {
        for key in AUTH_ENV_HINTS {
            if !hints.iter().any(|hint| hint == key) {
                hints.push((*key).to_string());
            }
        }
    }
    hints
}

/// Per-bucket anchor counts and one warning per bucket below its minimum.
///
/// The frontend bucket only requires an anchor when the query talks about UI.
pub fn coverage(anchors: &[Anchor], ui_query: bool) -> (Vec<CoverageEntry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    for bucket in BUCKETS.iter() {
        let minimum = match bucket.name {
            "frontend" => usize::from(ui_query),
            _ => 1,
        };
        let count = anchors
            .iter()
            .filter(|anchor| bucket.pattern.is_match(&anchor.file))
            .count();
        let satisfied = count >= minimum;
        if !satisfied {
            warnings.push(format!(
                "Coverage gap: {count} {} anchor(s), expected at least {minimum}",
                bucket.name
            ));
        }
        entries.push(CoverageEntry {
            bucket: bucket.name.to_string(),
            count,
            minimum,
            satisfied,
        });
    }
    (entries, warnings)
}

/// One naive line window per anchor.
pub fn suggested_excerpts(anchors: &[Anchor], window: usize) -> Vec<SuggestedExcerpt> {
    anchors
        .iter()
        .map(|anchor| SuggestedExcerpt {
            file: anchor.file.clone(),
            start_line: anchor.start.saturating_sub(EXCERPT_LEAD_LINES).max(1),
            end_line: anchor.start + window,
        })
        .collect()
}

fn summary_plan(
    anchors: &[Anchor],
    neighbors: &[String],
    env_hints: &[String],
    coverage: &[CoverageEntry],
) -> Vec<String> {
    let mut steps: Vec<String> = anchors
        .iter()
        .take(3)
        .map(|anchor| {
            format!(
                "Read {} around line {} ({})",
                anchor.file, anchor.start, anchor.symbol
            )
        })
        .collect();
    if !neighbors.is_empty() {
        let shown: Vec<&str> = neighbors.iter().take(3).map(String::as_str).collect();
        steps.push(format!("Follow imports into {}", shown.join(", ")));
    }
    if !env_hints.is_empty() {
        let shown: Vec<&str> = env_hints.iter().take(4).map(String::as_str).collect();
        steps.push(format!("Check configuration keys {}", shown.join(", ")));
    }
    for entry in coverage.iter().filter(|entry| !entry.satisfied) {
        steps.push(format!("Search for {} code not covered by the anchors", entry.bucket));
    }
    steps
}

fn answer_frame(
    topic: Topic,
    anchors: &[Anchor],
    env_hints: &[String],
    warnings: &[String],
) -> Vec<String> {
    let entry = anchors.first().map_or_else(
        || UNKNOWN_MARKER.to_string(),
        |anchor| format!("{}:{} {}", anchor.file, anchor.start, anchor.symbol),
    );
    let flow = if anchors.is_empty() {
        UNKNOWN_MARKER.to_string()
    } else {
        anchors
            .iter()
            .take(4)
            .map(|anchor| anchor.file.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    };
    let config = if env_hints.is_empty() {
        "none detected".to_string()
    } else {
        env_hints.join(", ")
    };
    let gaps = if warnings.is_empty() {
        "none".to_string()
    } else {
        warnings.len().to_string()
    };
    vec![
        format!("Topic: {topic}"),
        format!("Entry point: {entry}"),
        format!("Flow: {flow}"),
        format!("Configuration: {config}"),
        format!("Coverage gaps: {gaps}"),
    ]
}

pub fn build_retrieval_bundle(inputs: BundleInputs<'_>) -> RetrievalBundle {
    let anchors = select_anchors(inputs.ranked, inputs.context);
    let anchor_files: Vec<String> = anchors.iter().map(|anchor| anchor.file.clone()).collect();
    let neighbors = inputs.graph.expand_neighbors(&anchor_files, MAX_NEIGHBORS);
    let env_hints = env_hints(inputs.context, inputs.topic);
    let (coverage, warnings) = coverage(&anchors, inputs.ui_query);
    let suggested_excerpts = suggested_excerpts(&anchors, inputs.excerpt_window_lines);
    let summary_plan = summary_plan(&anchors, &neighbors, &env_hints, &coverage);
    let answer_frame = answer_frame(inputs.topic, &anchors, &env_hints, &warnings);

    log::debug!(
        "Bundle: {} anchors, {} neighbors, {} env hints, {} warnings",
        anchors.len(),
        neighbors.len(),
        env_hints.len(),
        warnings.len()
    );

    RetrievalBundle {
        topic: inputs.topic.as_str().to_string(),
        fingerprint: inputs.fingerprint,
        anchors,
        neighbors,
        coverage,
        env_hints,
        suggested_excerpts,
        summary_plan,
        answer_frame,
        warnings: (!warnings.is_empty()).then_some(warnings),
        debug: inputs.debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_indexer::{EnvRecord, ImportRecord};
    use context_protocol::{CandidateKind, CandidateSymbol};
    use context_search::ScoreBreakdown;
    use pretty_assertions::assert_eq;

    fn ranked(file: &str, symbol: &str, start: usize, score: f32) -> RankedCandidate {
        RankedCandidate {
            candidate: CandidateSymbol::new(file, symbol, start, start + 4, CandidateKind::Export),
            breakdown: ScoreBreakdown::default(),
            final_score: score,
            ranking: 0,
        }
    }

    fn import(file: &str, source: &str) -> ImportRecord {
        ImportRecord {
            file: file.to_string(),
            source: source.to_string(),
            names: Vec::new(),
            line: 1,
        }
    }

    #[test]
    fn anchors_keep_best_per_file_in_score_order() {
        let context = ProjectContext::default();
        let list = vec![
            ranked("src/a.ts", "low", 1, 0.4),
            ranked("src/b.ts", "top", 5, 0.9),
            ranked("src/a.ts", "high", 9, 0.7),
        ];
        let anchors = select_anchors(&list, &context);
        let picked: Vec<(&str, &str)> = anchors
            .iter()
            .map(|a| (a.file.as_str(), a.symbol.as_str()))
            .collect();
        assert_eq!(picked, vec![("src/b.ts", "top"), ("src/a.ts", "high")]);
    }

    #[test]
    fn anchors_are_capped() {
        let context = ProjectContext::default();
        let list: Vec<RankedCandidate> = (0..12)
            .map(|i| ranked(&format!("src/f{i}.ts"), "x", 1, 0.5))
            .collect();
        let anchors = select_anchors(&list, &context);
        assert_eq!(anchors.len(), MAX_ANCHORS);
        assert_eq!(anchors[0].file, "src/f0.ts");
    }

    #[test]
    fn features_come_from_path_and_imports() {
        let mut context = ProjectContext::default();
        context.imports.push(import("src/api/users.ts", "@supabase/supabase-js"));
        let anchors = select_anchors(&[ranked("src/api/users.ts", "GET", 1, 0.8)], &context);
        assert_eq!(anchors[0].features, vec!["api".to_string(), "auth-import".to_string()]);

        let anchors = select_anchors(&[ranked("src/auth/index.ts", "login", 1, 0.8)], &context);
        assert_eq!(
            anchors[0].features,
            vec!["auth-path".to_string(), "entry".to_string()]
        );
    }

    #[test]
    fn env_hints_cap_and_auth_extras() {
        let mut context = ProjectContext::default();
        for i in 0..15 {
            context.env.push(EnvRecord {
                file: "src/env.ts".to_string(),
                key: format!("KEY_{i}"),
                line: i + 1,
            });
        }
        context.env.push(EnvRecord {
            file: "src/env.ts".to_string(),
            key: "KEY_0".to_string(),
            line: 99,
        });
        assert_eq!(env_hints(&context, Topic::Db).len(), MAX_ENV_HINTS);

        let auth = env_hints(&context, Topic::Auth);
        assert_eq!(auth.len(), MAX_ENV_HINTS + AUTH_ENV_HINTS.len());
        assert_eq!(&auth[MAX_ENV_HINTS..], AUTH_ENV_HINTS);

        let empty = env_hints(&ProjectContext::default(), Topic::Auth);
        assert_eq!(empty, AUTH_ENV_HINTS);
    }

    #[test]
    fn coverage_minimums_and_warnings() {
        let context = ProjectContext::default();
        let anchors = select_anchors(
            &[
                ranked("src/routes/users.ts", "router", 1, 0.9),
                ranked("src/database/connection.ts", "initializeDatabase", 3, 0.8),
            ],
            &context,
        );

        let (entries, warnings) = coverage(&anchors, false);
        let summary: Vec<(&str, usize, usize, bool)> = entries
            .iter()
            .map(|e| (e.bucket.as_str(), e.count, e.minimum, e.satisfied))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("frontend", 0, 0, true),
                ("api", 1, 1, true),
                ("backend", 0, 1, false),
                ("db", 1, 1, true),
            ]
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("backend"));

        let (entries, warnings) = coverage(&anchors, true);
        assert_eq!(entries[0].minimum, 1);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn excerpts_use_a_naive_window() {
        let context = ProjectContext::default();
        let anchors = select_anchors(
            &[ranked("a.ts", "x", 2, 0.5), ranked("b.ts", "y", 40, 0.4)],
            &context,
        );
        let excerpts = suggested_excerpts(&anchors, 30);
        assert_eq!(
            excerpts,
            vec![
                SuggestedExcerpt {
                    file: "a.ts".to_string(),
                    start_line: 1,
                    end_line: 32,
                },
                SuggestedExcerpt {
                    file: "b.ts".to_string(),
                    start_line: 37,
                    end_line: 70,
                },
            ]
        );
    }

    #[test]
    fn bundle_wires_neighbors_and_optional_blocks() {
        let mut context = ProjectContext::default();
        context.files = vec![
            "src/server.ts".to_string(),
            "src/db.ts".to_string(),
            "src/routes.ts".to_string(),
        ];
        context.imports = vec![
            import("src/server.ts", "./db"),
            import("src/server.ts", "./routes"),
        ];
        let graph = ImportGraph::from_context(&context);
        let list = vec![ranked("src/server.ts", "startServer", 1, 0.9)];

        let bundle = build_retrieval_bundle(BundleInputs {
            topic: Topic::Api,
            ui_query: false,
            ranked: &list,
            context: &context,
            graph: &graph,
            fingerprint: RepoFingerprint::default(),
            excerpt_window_lines: 30,
            debug: None,
        });
        assert_eq!(bundle.topic, "api");
        assert_eq!(
            bundle.neighbors,
            vec!["src/db.ts".to_string(), "src/routes.ts".to_string()]
        );
        assert!(bundle.debug.is_none());
        assert!(bundle.warnings.is_some());
        assert_eq!(bundle.answer_frame[0], "Topic: api");
        assert_eq!(bundle.summary_plan[0], "Read src/server.ts around line 1 (startServer)");
    }
}
