//! Executes [`StructuralQuery`] lists against the syntax facts of a file set.

use crate::context::RouteRecord;
use crate::env_keys::{is_dotenv_file, scan_dotenv, scan_env_access, EnvReference};
use crate::error::Result;
use crate::facts::{DeclKind, FactExtractor, SyntaxFacts};
use crate::routes::routes_from_facts;
use context_protocol::{
    CandidateKind, CandidateSymbol, CompiledPattern, StructuralQuery, REASON_RETURNS_JSX,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_MAX_MATCHES: usize = 100;

enum CompiledQuery {
    Import {
        source: CompiledPattern,
        name: Option<CompiledPattern>,
    },
    Export {
        name: CompiledPattern,
    },
    Call {
        callee: CompiledPattern,
        in_files: Option<CompiledPattern>,
    },
    New {
        class: CompiledPattern,
    },
    Assign {
        target: CompiledPattern,
    },
    Env {
        key: CompiledPattern,
    },
    Route {
        method: Option<CompiledPattern>,
        path: Option<CompiledPattern>,
    },
}

impl CompiledQuery {
    fn compile(query: &StructuralQuery) -> Result<Self> {
        let compiled = match query {
            StructuralQuery::Import {
                source,
                import_name,
            } => Self::Import {
                source: source.compile()?,
                name: import_name.as_ref().map(|p| p.compile()).transpose()?,
            },
            StructuralQuery::Export { name } => Self::Export {
                name: name.compile()?,
            },
            StructuralQuery::Call { callee, in_files } => Self::Call {
                callee: callee.compile()?,
                in_files: in_files.as_ref().map(|p| p.compile()).transpose()?,
            },
            StructuralQuery::New { class } => Self::New {
                class: class.compile()?,
            },
            StructuralQuery::Assign { target } => Self::Assign {
                target: target.compile()?,
            },
            StructuralQuery::Env { key } => Self::Env {
                key: key.compile()?,
            },
            StructuralQuery::Route { method, path } => Self::Route {
                method: method.as_ref().map(|p| p.compile()).transpose()?,
                path: path.as_ref().map(|p| p.compile()).transpose()?,
            },
        };
        Ok(compiled)
    }
}

/// What one file offers to the matchers. Env and routes are computed lazily.
struct FileView<'a> {
    file: &'a str,
    text: &'a str,
    facts: SyntaxFacts,
    env: Option<Vec<EnvReference>>,
    routes: Option<Vec<RouteRecord>>,
}

impl FileView<'_> {
    fn env(&mut self) -> &[EnvReference] {
        let (file, text) = (self.file, self.text);
        self.env.get_or_insert_with(|| {
            let name = file.rsplit('/').next().unwrap_or(file);
            if is_dotenv_file(name) {
                scan_dotenv(text)
            } else {
                scan_env_access(text)
            }
        })
    }

    fn routes(&mut self) -> &[RouteRecord] {
        let (file, facts) = (self.file, &self.facts);
        self.routes
            .get_or_insert_with(|| routes_from_facts(file, facts))
    }
}

/// Collects matches, merging reasons for repeated `(file, symbol, start, kind)`.
struct MatchSink {
    out: Vec<CandidateSymbol>,
    seen: HashMap<(String, String, usize, CandidateKind), usize>,
    max: usize,
}

impl MatchSink {
    fn full(&self) -> bool {
        self.out.len() >= self.max
    }

    fn push(&mut self, candidate: CandidateSymbol) {
        let key = (
            candidate.file.clone(),
            candidate.symbol.clone(),
            candidate.start,
            candidate.kind,
        );
        if let Some(&idx) = self.seen.get(&key) {
            let existing = &mut self.out[idx];
            for reason in candidate.reasons {
                if !existing.reasons.contains(&reason) {
                    existing.reasons.push(reason);
                }
            }
            return;
        }
        if self.full() {
            return;
        }
        self.seen.insert(key, self.out.len());
        self.out.push(candidate);
    }
}

/// Syntax-fact backed structural search over files under one root.
pub struct SyntaxSearch {
    root: PathBuf,
    cancel: Option<Arc<AtomicBool>>,
}

impl SyntaxSearch {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cancel: None,
        }
    }

    /// Stop before the next file once `flag` is raised.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Match `queries` against `files` in order, stopping after `max_matches` distinct hits.
    ///
    /// Queries with invalid patterns are skipped with a warning; unreadable files are skipped.
    pub fn run(
        &self,
        files: &[String],
        queries: &[StructuralQuery],
        max_matches: usize,
    ) -> Result<Vec<CandidateSymbol>> {
        let compiled: Vec<(CompiledQuery, String)> = queries
            .iter()
            .filter_map(|query| match CompiledQuery::compile(query) {
                Ok(compiled) => Some((compiled, query.describe())),
                Err(e) => {
                    log::warn!("Skipping structural query {}: {e}", query.describe());
                    None
                }
            })
            .collect();

        let mut sink = MatchSink {
            out: Vec::new(),
            seen: HashMap::new(),
            max: max_matches,
        };
        if compiled.is_empty() || max_matches == 0 {
            return Ok(sink.out);
        }

        let mut extractor = FactExtractor::new();
        for (visited, file) in files.iter().enumerate() {
            if sink.full() {
                break;
            }
            if self.cancelled() {
                log::debug!(
                    "Structural search cancelled after {visited} of {} files",
                    files.len()
                );
                break;
            }
            let Ok(text) = std::fs::read_to_string(self.root.join(file)) else {
                log::debug!("Structural search skipping unreadable {file}");
                continue;
            };
            let facts = match extractor.extract(file, &text) {
                Ok(facts) => facts.unwrap_or_default(),
                Err(e) => {
                    log::warn!("Structural search could not parse {file}: {e}");
                    SyntaxFacts::default()
                }
            };
            let mut view = FileView {
                file,
                text: &text,
                facts,
                env: None,
                routes: None,
            };
            // Keep going once full: later queries may still add reasons to kept hits.
            for (query, description) in &compiled {
                collect_matches(query, description, &mut view, &mut sink);
            }
        }

        log::debug!(
            "Structural search: {} queries over {} files -> {} matches",
            compiled.len(),
            files.len(),
            sink.out.len()
        );
        Ok(sink.out)
    }
}

fn collect_matches(
    query: &CompiledQuery,
    description: &str,
    view: &mut FileView<'_>,
    sink: &mut MatchSink,
) {
    let file = view.file;
    let reason = format!("matched {description}");

    match query {
        CompiledQuery::Import { source, name } => {
            for import in &view.facts.imports {
                if !source.is_match(&import.source) {
                    continue;
                }
                let symbol = match name {
                    Some(pattern) => match import.names.iter().find(|n| pattern.is_match(n)) {
                        Some(found) => found.clone(),
                        None => continue,
                    },
                    None => import
                        .names
                        .first()
                        .cloned()
                        .unwrap_or_else(|| import.source.clone()),
                };
                sink.push(
                    CandidateSymbol::new(file, symbol, import.line, import.line, CandidateKind::Import)
                        .with_reason(reason.clone()),
                );
            }
        }
        CompiledQuery::Export { name } => {
            for decl in view.facts.exported() {
                if !name.is_match(&decl.name) {
                    continue;
                }
                let kind = match decl.kind {
                    DeclKind::Interface | DeclKind::Type => CandidateKind::Interface,
                    _ => CandidateKind::Export,
                };
                let mut candidate =
                    CandidateSymbol::new(file, decl.name.clone(), decl.start, decl.end, kind)
                        .with_reason(reason.clone())
                        .with_reason(format!("exported {}", decl.kind.as_str()));
                if decl.returns_jsx {
                    candidate = candidate.with_reason(REASON_RETURNS_JSX);
                }
                sink.push(candidate);
            }
        }
        CompiledQuery::Call { callee, in_files } => {
            if in_files.as_ref().is_some_and(|p| !p.is_match(file)) {
                return;
            }
            for call in &view.facts.calls {
                if !callee.is_match(&call.callee) && !callee.is_match(call.short_name()) {
                    continue;
                }
                let mut candidate =
                    CandidateSymbol::new(file, call.callee.clone(), call.line, call.line, CandidateKind::Call)
                        .with_reason(reason.clone());
                if let Some(enclosing) = &call.enclosing {
                    candidate = candidate.with_reason(format!("called from {enclosing}"));
                }
                sink.push(candidate);
            }
        }
        CompiledQuery::New { class } => {
            for new in &view.facts.news {
                if class.is_match(&new.class) {
                    sink.push(
                        CandidateSymbol::new(file, new.class.clone(), new.line, new.line, CandidateKind::New)
                            .with_reason(reason.clone()),
                    );
                }
            }
        }
        CompiledQuery::Assign { target } => {
            for assign in &view.facts.assigns {
                if target.is_match(&assign.target) {
                    sink.push(
                        CandidateSymbol::new(
                            file,
                            assign.target.clone(),
                            assign.line,
                            assign.line,
                            CandidateKind::Assign,
                        )
                        .with_reason(reason.clone()),
                    );
                }
            }
        }
        CompiledQuery::Env { key } => {
            let hits: Vec<CandidateSymbol> = view
                .env()
                .iter()
                .filter(|r| key.is_match(&r.key))
                .map(|r| {
                    CandidateSymbol::new(file, r.key.clone(), r.line, r.line, CandidateKind::Env)
                        .with_reason(reason.clone())
                })
                .collect();
            hits.into_iter().for_each(|c| sink.push(c));
        }
        CompiledQuery::Route { method, path } => {
            let hits: Vec<CandidateSymbol> = view
                .routes()
                .iter()
                .filter(|r| method.as_ref().map_or(true, |m| m.is_match(&r.method)))
                .filter(|r| path.as_ref().map_or(true, |p| p.is_match(&r.path)))
                .map(|r| {
                    CandidateSymbol::new(file, r.symbol(), r.line, r.line, CandidateKind::Route)
                        .with_reason(reason.clone())
                        .with_reason(format!("{} {}", r.method, r.path))
                        .with_role("request handler")
                })
                .collect();
            hits.into_iter().for_each(|c| sink.push(c));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_protocol::TextPattern;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn fixture() -> tempfile::TempDir {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/database")).unwrap();
        fs::create_dir_all(root.join("src/components")).unwrap();
        fs::write(
            root.join("src/database/connection.ts"),
            "import Database from 'better-sqlite3';\n\
             let db = null;\n\
             export function initializeDatabase() {\n\
             \x20 db = new Database(process.env.DB_PATH);\n\
             \x20 return db;\n\
             }\n\
             export function getUser(id: string) {\n\
             \x20 return db.prepare('SELECT 1').get(id);\n\
             }\n",
        )
        .unwrap();
        fs::write(
            root.join("src/server.ts"),
            "import { initializeDatabase } from './database/connection';\n\
             import express from 'express';\n\
             const app = express();\n\
             app.post('/users', (req, res) => res.send('ok'));\n\
             initializeDatabase();\n",
        )
        .unwrap();
        fs::write(
            root.join("src/components/Profile.tsx"),
            "export function Profile() {\n  return <div />;\n}\n",
        )
        .unwrap();
        temp
    }

    fn files() -> Vec<String> {
        vec![
            "src/components/Profile.tsx".to_string(),
            "src/database/connection.ts".to_string(),
            "src/server.ts".to_string(),
        ]
    }

    #[test]
    fn matches_every_query_kind() {
        let temp = fixture();
        let search = SyntaxSearch::new(temp.path());
        let queries = vec![
            StructuralQuery::Import {
                source: TextPattern::exact("better-sqlite3"),
                import_name: None,
            },
            StructuralQuery::Export {
                name: TextPattern::contains_ci("init"),
            },
            StructuralQuery::Call {
                callee: TextPattern::regex("^initializeDatabase$"),
                in_files: None,
            },
            StructuralQuery::New {
                class: TextPattern::exact("Database"),
            },
            StructuralQuery::Assign {
                target: TextPattern::exact("db"),
            },
            StructuralQuery::Env {
                key: TextPattern::regex("^DB_"),
            },
            StructuralQuery::Route {
                method: Some(TextPattern::exact("POST")),
                path: None,
            },
        ];
        let hits = search.run(&files(), &queries, 100).unwrap();
        let summary: Vec<(&str, &str, usize, CandidateKind)> = hits
            .iter()
            .map(|c| (c.file.as_str(), c.symbol.as_str(), c.start, c.kind))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("src/database/connection.ts", "Database", 1, CandidateKind::Import),
                ("src/database/connection.ts", "initializeDatabase", 3, CandidateKind::Export),
                ("src/database/connection.ts", "Database", 4, CandidateKind::New),
                ("src/database/connection.ts", "db", 2, CandidateKind::Assign),
                ("src/database/connection.ts", "db", 4, CandidateKind::Assign),
                ("src/database/connection.ts", "DB_PATH", 4, CandidateKind::Env),
                ("src/server.ts", "initializeDatabase", 5, CandidateKind::Call),
                ("src/server.ts", "POST /users", 4, CandidateKind::Route),
            ]
        );
        let route = hits.iter().find(|c| c.kind == CandidateKind::Route).unwrap();
        assert_eq!(route.role.as_deref(), Some("request handler"));
    }

    #[test]
    fn caps_results_and_merges_duplicate_hits() {
        let temp = fixture();
        let search = SyntaxSearch::new(temp.path());
        let queries = vec![
            StructuralQuery::Export {
                name: TextPattern::contains_ci("profile"),
            },
            StructuralQuery::Export {
                name: TextPattern::regex("^Prof"),
            },
            StructuralQuery::Export {
                name: TextPattern::contains_ci("user"),
            },
        ];
        let hits = search.run(&files(), &queries, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "Profile");
        assert_eq!(
            hits[0].reasons,
            vec![
                "matched export /profile/i".to_string(),
                "exported function".to_string(),
                REASON_RETURNS_JSX.to_string(),
                "matched export /^Prof/".to_string(),
            ]
        );
    }

    #[test]
    fn raised_cancel_flag_stops_before_reading_files() {
        let temp = fixture();
        let queries = vec![StructuralQuery::Export {
            name: TextPattern::contains_ci("init"),
        }];

        let flag = Arc::new(AtomicBool::new(false));
        let search = SyntaxSearch::new(temp.path()).with_cancel_flag(Arc::clone(&flag));
        assert_eq!(search.run(&files(), &queries, 100).unwrap().len(), 1);

        flag.store(true, Ordering::Relaxed);
        assert!(search.run(&files(), &queries, 100).unwrap().is_empty());
    }

    #[test]
    fn invalid_patterns_and_missing_files_are_skipped() {
        let temp = fixture();
        let search = SyntaxSearch::new(temp.path());
        let queries = vec![
            StructuralQuery::Call {
                callee: TextPattern::regex("("),
                in_files: None,
            },
            StructuralQuery::Call {
                callee: TextPattern::contains_ci("prepare"),
                in_files: Some(TextPattern::regex("database/")),
            },
        ];
        let mut with_missing = files();
        with_missing.insert(0, "src/gone.ts".to_string());
        let hits = search.run(&with_missing, &queries, 100).unwrap();
        let symbols: Vec<&str> = hits.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["db.prepare.get", "db.prepare"]);
        assert!(hits[0]
            .reasons
            .contains(&"called from getUser".to_string()));
    }
}
