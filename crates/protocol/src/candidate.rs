use serde::{Deserialize, Serialize};

/// Reason attached by generators to exports whose body renders JSX.
pub const REASON_RETURNS_JSX: &str = "export returns JSX";

/// Syntactic category of a candidate location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Export,
    Class,
    Function,
    Interface,
    Call,
    Import,
    New,
    Assign,
    Env,
    Route,
    Component,
    Schema,
    Other,
}

impl CandidateKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Class => "class",
            Self::Function => "function",
            Self::Interface => "interface",
            Self::Call => "call",
            Self::Import => "import",
            Self::New => "new",
            Self::Assign => "assign",
            Self::Env => "env",
            Self::Route => "route",
            Self::Component => "component",
            Self::Schema => "schema",
            Self::Other => "other",
        }
    }
}

/// Unranked code location produced by a generator.
///
/// Identity is `(file, symbol, start)`. Generators may emit duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSymbol {
    /// Repo-relative path with forward slashes.
    pub file: String,
    pub symbol: String,
    /// 1-based first line.
    pub start: usize,
    /// 1-based last line (inclusive).
    pub end: usize,
    pub kind: CandidateKind,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl CandidateSymbol {
    #[must_use]
    pub fn new(
        file: impl Into<String>,
        symbol: impl Into<String>,
        start: usize,
        end: usize,
        kind: CandidateKind,
    ) -> Self {
        Self {
            file: file.into(),
            symbol: symbol.into(),
            start,
            end: end.max(start),
            kind,
            score: 0.0,
            reasons: Vec::new(),
            role: None,
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    #[must_use]
    pub fn identity(&self) -> (&str, &str, usize) {
        (&self.file, &self.symbol, self.start)
    }
}
