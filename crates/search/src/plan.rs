//! Attack plans: named retrieval strategies and the structural queries they compile to.
//!
//! An explicit plan is used as given. `auto` is resolved by counting, per keyword
//! category, the query tokens that contain one of the category's keywords. The
//! highest count wins and ties go to the earliest category, so a query that hits
//! nothing resolves to `init-read-write`.

use crate::error::{Result, SearchError};
use context_protocol::{StructuralQuery, TextPattern};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttackPlan {
    #[default]
    Auto,
    InitReadWrite,
    ApiRoute,
    Auth,
    ErrorDriven,
}

impl AttackPlan {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::InitReadWrite => "init-read-write",
            Self::ApiRoute => "api-route",
            Self::Auth => "auth",
            Self::ErrorDriven => "error-driven",
        }
    }

    /// Ordered structural queries this plan always runs. `auto` has none.
    #[must_use]
    pub fn recipe(self) -> Vec<StructuralQuery> {
        match self {
            Self::Auto => Vec::new(),
            Self::InitReadWrite => vec![
                StructuralQuery::Export {
                    name: TextPattern::regex_ci(r"^(init|initiali[sz]e|setup|connect|open)"),
                },
                StructuralQuery::Call {
                    callee: TextPattern::regex_ci(r"(^|\.)(init|initiali[sz]e|setup|connect)\w*$"),
                    in_files: None,
                },
                StructuralQuery::New {
                    class: TextPattern::regex_ci(
                        r"(database|pool|client|connection|sequelize|redis|engine)$",
                    ),
                },
                StructuralQuery::Import {
                    source: TextPattern::regex_ci(
                        r"(sqlite|^pg$|postgres|mysql|mongo|prisma|drizzle|typeorm|sequelize|knex|supabase|sqlalchemy|sqlx|diesel|redis)",
                    ),
                    import_name: None,
                },
                StructuralQuery::Export {
                    name: TextPattern::regex_ci(
                        r"^(get|find|list|fetch|read|load|select|save|create|insert|update|delete|remove|write|upsert)",
                    ),
                },
                StructuralQuery::Call {
                    callee: TextPattern::regex_ci(
                        r"\.(query|execute|exec|prepare|run|find\w*|select|insert|update|delete|upsert|save)$",
                    ),
                    in_files: None,
                },
                StructuralQuery::Env {
                    key: TextPattern::regex_ci(r"(database|^db_|postgres|mysql|mongo|redis|supabase)"),
                },
            ],
            Self::ApiRoute => vec![
                StructuralQuery::Route {
                    method: None,
                    path: None,
                },
                StructuralQuery::Export {
                    name: TextPattern::regex(r"^(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)$"),
                },
                StructuralQuery::Import {
                    source: TextPattern::regex_ci(
                        r"^(express|fastify|koa|hono|next/server|@nestjs/|fastapi|flask|axum|actix-web)",
                    ),
                    import_name: None,
                },
                StructuralQuery::Export {
                    name: TextPattern::regex_ci(r"(handler|controller|router|middleware)"),
                },
                StructuralQuery::Call {
                    callee: TextPattern::regex_ci(r"(^|\.)(use|route|listen)$"),
                    in_files: None,
                },
            ],
            Self::Auth => vec![
                StructuralQuery::Import {
                    source: TextPattern::regex_ci(
                        r"(next-auth|@auth/|@supabase/|@clerk/|lucia|passport|jsonwebtoken|jose|firebase/auth|bcrypt|argon2)",
                    ),
                    import_name: None,
                },
                StructuralQuery::Export {
                    name: TextPattern::regex_ci(
                        r"(auth|login|logout|session|token|guard|middleware|current_?user)",
                    ),
                },
                StructuralQuery::Call {
                    callee: TextPattern::regex_ci(
                        r"(sign_?in|sign_?out|sign_?up|get_?(server_?)?session|get_?user|verify|authenticate|authorize|login|logout)",
                    ),
                    in_files: None,
                },
                StructuralQuery::Env {
                    key: TextPattern::regex_ci(r"(auth|jwt|session|secret|supabase|clerk|oauth)"),
                },
            ],
            Self::ErrorDriven => vec![
                StructuralQuery::New {
                    class: TextPattern::regex(r"(Error|Exception)$"),
                },
                StructuralQuery::Export {
                    name: TextPattern::regex_ci(r"(error|exception|fail|fallback|boundary)"),
                },
                StructuralQuery::Call {
                    callee: TextPattern::regex_ci(
                        r"(console\.error|logger\.error|log\.error|capture_?exception|report_?error|^panic$|^raise|throw)",
                    ),
                    in_files: None,
                },
                StructuralQuery::Import {
                    source: TextPattern::regex_ci(r"(@sentry/|sentry_sdk|bugsnag|rollbar|winston|pino)"),
                    import_name: None,
                },
            ],
        }
    }

    /// Keywords that mark a path or symbol as belonging to this plan's domain.
    #[must_use]
    pub fn domain_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Auto => &[],
            Self::InitReadWrite => &[
                "database", "db", "storage", "sql", "connection", "schema", "repository", "model",
                "query",
            ],
            Self::ApiRoute => &["api", "route", "router", "endpoint", "handler", "controller", "server"],
            Self::Auth => &["auth", "login", "session", "token", "jwt", "user", "password", "guard"],
            Self::ErrorDriven => &["error", "exception", "fail", "catch", "throw", "panic", "fault"],
        }
    }
}

impl fmt::Display for AttackPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackPlan {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "init-read-write" => Ok(Self::InitReadWrite),
            "api-route" => Ok(Self::ApiRoute),
            "auth" => Ok(Self::Auth),
            "error-driven" => Ok(Self::ErrorDriven),
            _ => Err(SearchError::UnknownPlan(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    #[default]
    Understand,
    Debug,
    Implement,
    Review,
}

impl TaskType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Understand => "understand",
            Self::Debug => "debug",
            Self::Implement => "implement",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "understand" => Ok(Self::Understand),
            "debug" => Ok(Self::Debug),
            "implement" => Ok(Self::Implement),
            "review" => Ok(Self::Review),
            _ => Err(SearchError::UnknownTaskType(value.to_string())),
        }
    }
}

/// Keyword categories for `auto`, in tie-break order.
const PLAN_CATEGORIES: [(AttackPlan, &[&str]); 4] = [
    (
        AttackPlan::InitReadWrite,
        &[
            "database", "db", "storage", "sql", "sqlite", "postgres", "mysql", "mongo", "prisma",
            "schema", "migration", "persist", "init", "table", "repository", "connection", "save",
        ],
    ),
    (
        AttackPlan::ApiRoute,
        &[
            "api", "route", "endpoint", "handler", "controller", "request", "response", "http",
            "rest", "graphql", "webhook",
        ],
    ),
    (
        AttackPlan::Auth,
        &[
            "auth", "login", "logout", "signin", "signup", "session", "token", "jwt", "oauth",
            "password", "credential", "permission",
        ],
    ),
    (
        AttackPlan::ErrorDriven,
        &[
            "error", "exception", "fail", "crash", "bug", "debug", "throw", "catch", "panic",
            "stacktrace", "broken",
        ],
    ),
];

/// Per-category hit counts, in [`PLAN_CATEGORIES`] order.
#[must_use]
pub fn plan_scores(query: &str) -> [usize; 4] {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    let mut scores = [0usize; 4];
    for (slot, (_, keywords)) in scores.iter_mut().zip(PLAN_CATEGORIES.iter()) {
        *slot = tokens
            .iter()
            .filter(|token| keywords.iter().any(|keyword| token.contains(keyword)))
            .count();
    }
    scores
}

/// Resolve `auto` against the query; any other plan is returned unchanged.
#[must_use]
pub fn select_plan(requested: AttackPlan, query: &str) -> AttackPlan {
    if requested != AttackPlan::Auto {
        return requested;
    }
    let scores = plan_scores(query);
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = idx;
        }
    }
    PLAN_CATEGORIES[best].0
}

const STOPWORDS: &[&str] = &[
    "about", "does", "doing", "from", "have", "into", "show", "that", "their", "there", "these",
    "this", "those", "what", "when", "where", "which", "while", "with", "work", "works", "would",
    "could", "should", "code", "file", "files", "find", "explain", "used", "using", "happen",
    "happens",
];

/// Meaningful query tokens: lowercased, punctuation-trimmed, longer than 3 chars,
/// not stopwords, first occurrence only.
#[must_use]
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
                .to_lowercase()
        })
        .filter(|token| token.chars().count() > 3)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Recipe queries, then an export and a call query per meaningful token, then `extra`.
#[must_use]
pub fn compile_queries(
    plan: AttackPlan,
    query: &str,
    extra: &[StructuralQuery],
) -> Vec<StructuralQuery> {
    let mut queries = plan.recipe();
    for token in query_tokens(query) {
        queries.push(StructuralQuery::Export {
            name: TextPattern::contains_ci(&token),
        });
        queries.push(StructuralQuery::Call {
            callee: TextPattern::contains_ci(&token),
            in_files: None,
        });
    }
    queries.extend(extra.iter().cloned());
    queries
}
