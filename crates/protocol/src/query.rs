use crate::error::{ProtocolError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A string-or-pattern field of a structural query.
///
/// Plain JSON strings deserialize as exact matches; objects carry a regex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPattern {
    Exact(String),
    Regex {
        regex: String,
        #[serde(default, rename = "caseInsensitive")]
        case_insensitive: bool,
    },
}

impl TextPattern {
    #[must_use]
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    #[must_use]
    pub fn regex(source: impl Into<String>) -> Self {
        Self::Regex {
            regex: source.into(),
            case_insensitive: false,
        }
    }

    #[must_use]
    pub fn regex_ci(source: impl Into<String>) -> Self {
        Self::Regex {
            regex: source.into(),
            case_insensitive: true,
        }
    }

    /// Case-insensitive substring match on `token` (regex metacharacters escaped).
    #[must_use]
    pub fn contains_ci(token: &str) -> Self {
        Self::regex_ci(regex::escape(token))
    }

    pub fn compile(&self) -> Result<CompiledPattern> {
        match self {
            Self::Exact(value) => Ok(CompiledPattern::Exact(value.clone())),
            Self::Regex {
                regex,
                case_insensitive,
            } => RegexBuilder::new(regex)
                .case_insensitive(*case_insensitive)
                .build()
                .map(CompiledPattern::Regex)
                .map_err(|source| ProtocolError::InvalidPattern {
                    pattern: regex.clone(),
                    source,
                }),
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => write!(f, "\"{value}\""),
            Self::Regex {
                regex,
                case_insensitive,
            } => {
                if *case_insensitive {
                    write!(f, "/{regex}/i")
                } else {
                    write!(f, "/{regex}/")
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Exact(String),
    Regex(Regex),
}

impl CompiledPattern {
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Exact(value) => value == text,
            Self::Regex(regex) => regex.is_match(text),
        }
    }
}

/// Declarative description of a code construct to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StructuralQuery {
    Import {
        source: TextPattern,
        #[serde(
            default,
            rename = "importName",
            skip_serializing_if = "Option::is_none"
        )]
        import_name: Option<TextPattern>,
    },
    Export {
        name: TextPattern,
    },
    Call {
        callee: TextPattern,
        #[serde(default, rename = "inFiles", skip_serializing_if = "Option::is_none")]
        in_files: Option<TextPattern>,
    },
    New {
        class: TextPattern,
    },
    Assign {
        target: TextPattern,
    },
    Env {
        key: TextPattern,
    },
    Route {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<TextPattern>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<TextPattern>,
    },
}

impl StructuralQuery {
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Import { .. } => "import",
            Self::Export { .. } => "export",
            Self::Call { .. } => "call",
            Self::New { .. } => "new",
            Self::Assign { .. } => "assign",
            Self::Env { .. } => "env",
            Self::Route { .. } => "route",
        }
    }

    /// Short human-readable form, used in candidate reasons.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Import {
                source,
                import_name,
            } => match import_name {
                Some(name) => format!("import {name} from {source}"),
                None => format!("import from {source}"),
            },
            Self::Export { name } => format!("export {name}"),
            Self::Call { callee, in_files } => match in_files {
                Some(files) => format!("call {callee} in {files}"),
                None => format!("call {callee}"),
            },
            Self::New { class } => format!("new {class}"),
            Self::Assign { target } => format!("assign {target}"),
            Self::Env { key } => format!("env {key}"),
            Self::Route { method, path } => {
                let method = method
                    .as_ref()
                    .map_or_else(|| "*".to_string(), ToString::to_string);
                let path = path
                    .as_ref()
                    .map_or_else(|| "*".to_string(), ToString::to_string);
                format!("route {method} {path}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_strings_deserialize_as_exact_patterns() {
        let query: StructuralQuery =
            serde_json::from_str(r#"{"kind":"import","source":"express"}"#).unwrap();
        assert_eq!(
            query,
            StructuralQuery::Import {
                source: TextPattern::exact("express"),
                import_name: None,
            }
        );
    }

    #[test]
    fn regex_objects_deserialize_with_flags() {
        let query: StructuralQuery = serde_json::from_str(
            r#"{"kind":"call","callee":{"regex":"^init","caseInsensitive":true},"inFiles":"src/db.ts"}"#,
        )
        .unwrap();
        assert_eq!(
            query,
            StructuralQuery::Call {
                callee: TextPattern::regex_ci("^init"),
                in_files: Some(TextPattern::exact("src/db.ts")),
            }
        );
        assert_eq!(query.kind_name(), "call");
    }

    #[test]
    fn contains_ci_escapes_metacharacters() {
        let pattern = TextPattern::contains_ci("a.b").compile().unwrap();
        assert!(pattern.is_match("xxA.Byy"));
        assert!(!pattern.is_match("aXb"));
    }

    #[test]
    fn exact_pattern_requires_full_equality() {
        let pattern = TextPattern::exact("GET").compile().unwrap();
        assert!(pattern.is_match("GET"));
        assert!(!pattern.is_match("GETTER"));
    }

    #[test]
    fn describe_is_stable() {
        let query = StructuralQuery::Route {
            method: Some(TextPattern::exact("GET")),
            path: None,
        };
        assert_eq!(query.describe(), "route \"GET\" *");
    }
}
