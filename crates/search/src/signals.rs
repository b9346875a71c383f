//! The seven ranking signals. Each returns a value clamped to `[0, 1]`.

use crate::detectors::{ROLE_CONFIG, ROLE_INTERFACE, ROLE_REQUEST_HANDLER};
use crate::plan::AttackPlan;
use context_protocol::{CandidateKind, CandidateSymbol, REASON_RETURNS_JSX};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub path_prior: f32,
    pub keyword_score: f32,
    pub surface_boost: f32,
    pub degree_boost: f32,
    pub recency_boost: f32,
    pub context_boost: f32,
    pub domain_boost: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub path_prior: f32,
    pub keyword_score: f32,
    pub surface_boost: f32,
    pub degree_boost: f32,
    pub recency_boost: f32,
    pub context_boost: f32,
    pub domain_boost: f32,
}

pub const SCORE_WEIGHTS: ScoreWeights = ScoreWeights {
    path_prior: 0.15,
    keyword_score: 0.25,
    surface_boost: 0.20,
    degree_boost: 0.10,
    recency_boost: 0.05,
    context_boost: 0.15,
    domain_boost: 0.10,
};

impl Default for ScoreWeights {
    fn default() -> Self {
        SCORE_WEIGHTS
    }
}

impl ScoreBreakdown {
    /// Weighted sum of the seven signals.
    #[must_use]
    pub fn weighted(&self, weights: &ScoreWeights) -> f32 {
        weights.path_prior * self.path_prior
            + weights.keyword_score * self.keyword_score
            + weights.surface_boost * self.surface_boost
            + weights.degree_boost * self.degree_boost
            + weights.recency_boost * self.recency_boost
            + weights.context_boost * self.context_boost
            + weights.domain_boost * self.domain_boost
    }
}

fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        return value;
    }
    value.clamp(0.0, 1.0)
}

/// Query-derived inputs shared by every candidate of one request.
#[derive(Debug, Clone)]
pub struct QuerySignals {
    pub plan: AttackPlan,
    /// Meaningful lowercase tokens.
    pub tokens: Vec<String>,
    /// Tokens joined without separators, for whole-query symbol hits.
    pub joined: String,
    /// The query talks about UI.
    pub ui_query: bool,
}

static UI_WORDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ui|component\w*|page\w*|screen\w*|button\w*|form\w*|frontend|view\w*|render\w*|layout\w*|jsx|tsx)\b")
        .expect("ui wording regex")
});

/// Whether the query text mentions user-interface concepts.
#[must_use]
pub fn mentions_ui(query: &str) -> bool {
    UI_WORDING.is_match(query)
}

impl QuerySignals {
    #[must_use]
    pub fn new(plan: AttackPlan, query: &str, tokens: Vec<String>) -> Self {
        let joined = tokens.concat();
        Self {
            plan,
            tokens,
            joined,
            ui_query: mentions_ui(query),
        }
    }
}

static TEST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)((^|/)(tests?|__tests__|specs?|testing)(/|$)|[._](test|spec)\.)")
        .expect("test path regex")
});

/// Path segment, penalty. The generated-matrix name is the heaviest.
static NOISE_PATHS: Lazy<Vec<(Regex, f32)>> = Lazy::new(|| {
    [
        (r"(?i)(^|/)[\w.-]*matrix[\w-]*\.generated\.", 0.9),
        (r"(?i)(^|/)(examples?|samples?)/", 0.5),
        (r"(?i)(^|/)(fixtures?|__fixtures__)/", 0.5),
        (r"(?i)(^|/)(bench|benches|benchmarks?)/", 0.4),
        (r"(?i)(^|/)scripts?/", 0.3),
        (r"(?i)(^|/)(telemetry|metrics)/", 0.3),
        (r"(?i)(^|/)(workers?|queues?|jobs)/", 0.3),
    ]
    .into_iter()
    .map(|(pattern, penalty)| (Regex::new(pattern).expect("noise path regex"), penalty))
    .collect()
});

const DIRECTORY_BONUSES: &[(&[&str], f32)] = &[
    (&["local", "lib"], 0.10),
    (&["core"], 0.10),
    (&["api"], 0.15),
    (&["db", "database"], 0.15),
    (&["auth"], 0.15),
];

pub fn path_prior(file: &str, plan: AttackPlan) -> f32 {
    let lowered = file.to_lowercase();
    let mut score = 0.5;

    for keyword in plan.domain_keywords() {
        if lowered.contains(keyword) {
            score += 0.1;
        }
    }

    let dirs: Vec<&str> = lowered.split('/').rev().skip(1).collect();
    for (names, bonus) in DIRECTORY_BONUSES {
        if dirs.iter().any(|dir| names.contains(dir)) {
            score += bonus;
        }
    }

    if TEST_PATH.is_match(file) {
        score *= if plan == AttackPlan::ErrorDriven { 1.1 } else { 0.7 };
    }

    for (regex, penalty) in NOISE_PATHS.iter() {
        if regex.is_match(file) {
            score -= penalty;
        }
    }

    clamp01(score)
}

static FILE_ROUTER_ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)((^|/)app/(.+/)?route\.\w+$|(^|/)pages/api/|(^|/)api/)").expect("endpoint regex")
});

fn looks_like_component_file(file: &str) -> bool {
    let lowered = file.to_lowercase();
    [".tsx", ".jsx", ".vue", ".svelte"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
        || lowered.contains("/components/")
        || lowered.starts_with("components/")
}

fn base_name(file: &str) -> String {
    file.rsplit('/').next().unwrap_or(file).to_lowercase()
}

pub fn keyword_score(candidate: &CandidateSymbol, query: &QuerySignals) -> f32 {
    let symbol = candidate.symbol.to_lowercase();
    let base = base_name(&candidate.file);
    let mut score = 0.0;

    for token in &query.tokens {
        if symbol.contains(token.as_str()) {
            score += 0.3;
        }
        if base.contains(token.as_str()) {
            score += 0.15;
        }
    }
    for keyword in query.plan.domain_keywords() {
        if symbol.contains(keyword) {
            score += 0.2;
        }
    }
    if !query.joined.is_empty() && symbol.contains(&query.joined) {
        score += 0.4;
    }
    if query.plan == AttackPlan::ApiRoute && FILE_ROUTER_ENDPOINT.is_match(&candidate.file) {
        score += 0.3;
    }
    if query.ui_query && looks_like_component_file(&candidate.file) {
        score += 0.2;
    }

    clamp01(score)
}

const INITIALIZER_PREFIXES: &[&str] = &["init", "initialize", "setup", "start", "create"];

pub fn surface_boost(candidate: &CandidateSymbol, exported: bool) -> f32 {
    let symbol = candidate.symbol.to_lowercase();
    let mut score = 0.3;

    score += match candidate.kind {
        CandidateKind::Export => 0.4,
        CandidateKind::Class => 0.25,
        CandidateKind::Function => 0.2,
        CandidateKind::Interface => 0.15,
        CandidateKind::Call => 0.1,
        _ => 0.05,
    };
    if candidate.reasons.iter().any(|r| r == REASON_RETURNS_JSX) {
        score += 0.25;
    }
    if exported {
        score += 0.3;
    }
    if symbol.contains("handle") || symbol.contains("tool") {
        score += 0.2;
    }
    if INITIALIZER_PREFIXES.iter().any(|p| symbol.starts_with(p)) {
        score += 0.25;
    }

    clamp01(score)
}

/// Connections saturate the signal at this count.
const DEGREE_SATURATION: f32 = 20.0;

pub fn degree_boost(connections: usize) -> f32 {
    clamp01(0.3 + 0.4 * (connections as f32 / DEGREE_SATURATION).min(1.0))
}

/// Neighbors per candidate over the current result set: other candidates in the
/// same file, or whose symbol contains (or is contained in) this one's.
pub fn candidate_connections(candidates: &[CandidateSymbol]) -> Vec<usize> {
    let lowered: Vec<String> = candidates.iter().map(|c| c.symbol.to_lowercase()).collect();
    let related = |a: &str, b: &str| a.len() >= 3 && b.len() >= 3 && (a.contains(b) || b.contains(a));

    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            candidates
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i
                        && (other.file == candidate.file || related(&lowered[i], &lowered[*j]))
                })
                .count()
        })
        .collect()
}

/// Modification-time lookup for the recency signal.
pub trait RecencySource: Send + Sync {
    fn recency(&self, file: &str) -> f32;
}

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Bucket an age into the recency signal.
#[must_use]
pub fn recency_for_age(age: Duration) -> f32 {
    if age <= DAY {
        1.0
    } else if age <= DAY * 7 {
        0.7
    } else if age <= DAY * 30 {
        0.5
    } else {
        0.3
    }
}

/// Stats files under `root` against a `now` fixed at construction.
pub struct FsRecency {
    root: PathBuf,
    now: SystemTime,
    cache: Mutex<HashMap<String, f32>>,
}

impl FsRecency {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::at(root, SystemTime::now())
    }

    pub fn at(root: impl AsRef<Path>, now: SystemTime) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            now,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn measure(&self, file: &str) -> f32 {
        let Ok(meta) = std::fs::metadata(self.root.join(file)) else {
            return 0.5;
        };
        let Ok(modified) = meta.modified() else {
            return 0.3;
        };
        // mtimes in the future count as just modified
        let age = self.now.duration_since(modified).unwrap_or_default();
        recency_for_age(age)
    }
}

impl RecencySource for FsRecency {
    fn recency(&self, file: &str) -> f32 {
        let mut cache = self.cache.lock().expect("recency cache mutex poisoned");
        if let Some(value) = cache.get(file) {
            return *value;
        }
        let value = self.measure(file);
        cache.insert(file.to_string(), value);
        value
    }
}

/// Same value for every file.
pub struct FixedRecency(pub f32);

impl RecencySource for FixedRecency {
    fn recency(&self, _file: &str) -> f32 {
        self.0
    }
}

fn role_bonus(role: &str) -> f32 {
    match role {
        ROLE_REQUEST_HANDLER | ROLE_INTERFACE | "entry point" => 0.25,
        "initialization" | "core" => 0.2,
        "read operation" | "write operation" | "middleware" | "service provider" => 0.15,
        ROLE_CONFIG | "configuration" => 0.1,
        _ => 0.0,
    }
}

pub fn context_boost(candidate: &CandidateSymbol, tokens: &[String]) -> f32 {
    let mut score = 0.4;
    if !candidate.reasons.is_empty() {
        score += 0.2;
    }
    for reason in &candidate.reasons {
        let reason = reason.to_lowercase();
        if tokens.iter().any(|token| reason.contains(token.as_str())) {
            score += 0.1;
        }
    }
    if let Some(role) = &candidate.role {
        score += role_bonus(role);
    }
    clamp01(score)
}

struct DomainRule {
    symbol: Vec<(Regex, f32)>,
    path: Vec<(Regex, f32)>,
}

fn compile_rules(rules: &[(&str, f32)]) -> Vec<(Regex, f32)> {
    rules
        .iter()
        .map(|(pattern, bonus)| (Regex::new(pattern).expect("domain regex"), *bonus))
        .collect()
}

fn domain_rule(symbol: &[(&str, f32)], path: &[(&str, f32)]) -> DomainRule {
    DomainRule {
        symbol: compile_rules(symbol),
        path: compile_rules(path),
    }
}

static DOMAIN_RULES: Lazy<HashMap<AttackPlan, DomainRule>> = Lazy::new(|| {
    let mut rules = HashMap::new();
    rules.insert(
        AttackPlan::InitReadWrite,
        domain_rule(
            &[
                (r"(?i)^(init|initiali[sz]e|setup|connect|open)", 0.3),
                (r"(?i)^(get|find|list|fetch|read|load|select|query)", 0.2),
                (r"(?i)^(save|create|insert|update|delete|remove|write|upsert|put)", 0.2),
            ],
            &[(
                r"(?i)(db|database|storage|store|repositor|model|schema|migration|prisma|sql)",
                0.2,
            )],
        ),
    );
    rules.insert(
        AttackPlan::Auth,
        domain_rule(
            &[
                (
                    r"(?i)(auth|login|logout|sign_?in|sign_?up|token|session|jwt|password|credential)",
                    0.3,
                ),
                (r"(?i)(middleware|guard|protect|require|verify|authori[sz]e)", 0.2),
            ],
            &[(r"(?i)(auth|session|login|middleware|guard)", 0.2)],
        ),
    );
    rules.insert(
        AttackPlan::ApiRoute,
        domain_rule(
            &[
                (r"^(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|ANY)\b", 0.3),
                (r"(?i)(handler|controller|route|endpoint)", 0.2),
            ],
            &[(r"(?i)((^|/)(api|routes?|controllers?|handlers?)(/|\.)|(^|/)route\.)", 0.2)],
        ),
    );
    rules.insert(
        AttackPlan::ErrorDriven,
        domain_rule(
            &[(r"(?i)(error|exception|catch|throw|fail|panic|raise)", 0.3)],
            &[(r"(?i)(errors?|exceptions?)", 0.2)],
        ),
    );
    rules
});

pub fn domain_boost(candidate: &CandidateSymbol, plan: AttackPlan) -> f32 {
    let mut score = 0.4;
    if let Some(rule) = DOMAIN_RULES.get(&plan) {
        for (regex, bonus) in &rule.symbol {
            if regex.is_match(&candidate.symbol) {
                score += bonus;
            }
        }
        for (regex, bonus) in &rule.path {
            if regex.is_match(&candidate.file) {
                score += bonus;
            }
        }
    }
    clamp01(score)
}
