use crate::rerank::RankedCandidate;
use context_protocol::{CandidateSymbol, JumpTarget, MAX_SIMILAR_CHUNKS_LIMIT};
use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_REASON: &str = "fallback: best raw candidate (nothing survived ranking)";

/// Ordered role rules over the lowercased symbol with underscores removed.
static ROLE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"^(init|setup|bootstrap|connect|start|open|create(db|database|client|pool|connection|app|server))",
            "initialization",
        ),
        (
            r"^(get|find|fetch|read|load|list|select|query|search|lookup)",
            "read operation",
        ),
        (
            r"^(save|insert|update|delete|remove|write|upsert|put|set|create|add)",
            "write operation",
        ),
        (
            r"(handler|controller|route|endpoint|^handle)",
            "request handler",
        ),
        (r"(middleware|guard|interceptor)", "middleware"),
        (r"(^test|spec$|^describe)", "test"),
        (r"(config|settings|options|^env)", "configuration"),
        (r"(service|provider|client|repository|store)", "service provider"),
    ]
    .into_iter()
    .map(|(pattern, role)| (Regex::new(pattern).expect("role regex"), role))
    .collect()
});

static HTTP_VERB_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|ANY)( |$)").expect("verb regex")
});

/// Role for a symbol that has none assigned.
#[must_use]
pub fn infer_role(symbol: &str) -> &'static str {
    // route symbols ("GET /users") would otherwise read as getters
    if HTTP_VERB_SYMBOL.is_match(symbol) {
        return "request handler";
    }
    let normalized = symbol.to_lowercase().replace('_', "");
    ROLE_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(&normalized))
        .map_or("code symbol", |(_, role)| *role)
}

fn signal_labels(entry: &RankedCandidate) -> Vec<&'static str> {
    let b = &entry.breakdown;
    let mut labels = Vec::new();
    if b.keyword_score >= 0.6 {
        labels.push("strong keyword match");
    }
    if b.surface_boost >= 0.8 {
        labels.push("exported surface");
    }
    if b.domain_boost >= 0.7 {
        labels.push("matches plan domain");
    }
    if b.path_prior >= 0.7 {
        labels.push("preferred location");
    }
    if b.recency_boost >= 1.0 {
        labels.push("recently modified");
    }
    labels
}

fn to_target(candidate: &CandidateSymbol, confidence: f32, why: Vec<String>) -> JumpTarget {
    JumpTarget {
        file: candidate.file.clone(),
        symbol: candidate.symbol.clone(),
        start: Some(candidate.start),
        end: Some(candidate.end),
        role: candidate
            .role
            .clone()
            .unwrap_or_else(|| infer_role(&candidate.symbol).to_string()),
        confidence: confidence.clamp(0.0, 1.0),
        why,
    }
}

/// Highest provisional score, earliest on ties. Non-finite scores count as zero.
fn best_raw(raw: &[CandidateSymbol]) -> Option<&CandidateSymbol> {
    let score = |c: &CandidateSymbol| if c.score.is_finite() { c.score } else { 0.0 };
    let mut best: Option<&CandidateSymbol> = None;
    for candidate in raw {
        if best.map_or(true, |current| score(candidate) > score(current)) {
            best = Some(candidate);
        }
    }
    best
}

/// First `requested` ranked candidates as jump targets (`requested` clamped to 1..=20).
///
/// With nothing ranked but some raw candidates, returns exactly one target built
/// from the best raw candidate.
#[must_use]
pub fn select_jump_targets(
    ranked: &[RankedCandidate],
    raw: &[CandidateSymbol],
    requested: usize,
) -> Vec<JumpTarget> {
    let requested = requested.clamp(1, MAX_SIMILAR_CHUNKS_LIMIT);

    if ranked.is_empty() {
        return best_raw(raw)
            .map(|candidate| {
                let mut why = candidate.reasons.clone();
                why.push(FALLBACK_REASON.to_string());
                vec![to_target(candidate, candidate.score.max(0.0), why)]
            })
            .unwrap_or_default();
    }

    ranked
        .iter()
        .take(requested)
        .map(|entry| {
            let mut why = entry.candidate.reasons.clone();
            why.extend(signal_labels(entry).into_iter().map(str::to_string));
            to_target(&entry.candidate, entry.final_score, why)
        })
        .collect()
}
