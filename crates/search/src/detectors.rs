//! Topic-gated candidate detectors.
//!
//! Each detector family sits behind [`Matcher`] so a syntax-aware implementation
//! can replace the regex ones without touching ranking. All detectors emit the
//! same [`CandidateSymbol`] shape; the detector confidence is carried as the
//! provisional score.

use crate::topic::Topic;
use context_indexer::file_router_path;
use context_protocol::{CandidateKind, CandidateSymbol};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

pub const ROUTE_CONFIDENCE: f32 = 0.85;
pub const COMPONENT_CONFIDENCE: f32 = 0.6;
pub const SCHEMA_CONFIDENCE: f32 = 0.8;
pub const DEFAULT_DETECTOR_BATCH: usize = 32;

pub const ROLE_REQUEST_HANDLER: &str = "request handler";
pub const ROLE_INTERFACE: &str = "interface";
pub const ROLE_CONFIG: &str = "config";

pub trait Matcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Topics this detector runs for.
    fn topics(&self) -> &'static [Topic];

    /// Cheap path check made before any file is read.
    fn accepts(&self, file: &str) -> bool;

    /// Whether [`Matcher::detect`] needs the file text.
    fn needs_text(&self) -> bool {
        false
    }

    fn detect(&self, file: &str, text: Option<&str>) -> Vec<CandidateSymbol>;
}

/// Route, component and schema detectors.
pub fn default_matchers() -> Vec<Arc<dyn Matcher>> {
    vec![
        Arc::new(RouteMatcher),
        Arc::new(ComponentMatcher),
        Arc::new(SchemaMatcher),
    ]
}

static ROUTE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:app|router|server|api|fastify|route|routes|r)\s*\.\s*(get|post|put|patch|delete|del|head|options|all)\s*\(\s*['"`](/[^'"`]*)['"`]"#,
    )
    .expect("route call regex")
});

static FILE_ROUTE_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+(?:async\s+)?(?:function\s+|const\s+)(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b",
    )
    .expect("file route regex")
});

const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".py"];

fn has_extension(file: &str, extensions: &[&str]) -> bool {
    let lowered = file.to_ascii_lowercase();
    extensions.iter().any(|ext| lowered.ends_with(ext))
}

fn file_name(file: &str) -> &str {
    file.rsplit('/').next().unwrap_or(file)
}

fn file_stem(file: &str) -> &str {
    let name = file_name(file);
    name.split('.').next().filter(|s| !s.is_empty()).unwrap_or(name)
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Express/Fastify/Koa style registrations and file-router verb exports.
pub struct RouteMatcher;

impl Matcher for RouteMatcher {
    fn name(&self) -> &'static str {
        "route"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Api, Topic::Auth]
    }

    fn accepts(&self, file: &str) -> bool {
        has_extension(file, SCRIPT_EXTENSIONS)
    }

    fn needs_text(&self) -> bool {
        true
    }

    fn detect(&self, file: &str, text: Option<&str>) -> Vec<CandidateSymbol> {
        let Some(text) = text else {
            return Vec::new();
        };
        let mut out = Vec::new();

        for caps in ROUTE_CALL.captures_iter(text) {
            let (Some(whole), Some(method), Some(path)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let method = match method.as_str() {
                "del" => "DELETE".to_string(),
                "all" => "ANY".to_string(),
                other => other.to_ascii_uppercase(),
            };
            let line = line_of(text, whole.start());
            out.push(route_candidate(file, &method, path.as_str(), line));
        }

        let router_path = file_router_path(file);
        for caps in FILE_ROUTE_EXPORT.captures_iter(text) {
            let Some(method) = caps.get(1) else {
                continue;
            };
            let line = line_of(text, method.start());
            let symbol = match &router_path {
                Some(path) => format!("{} {path}", method.as_str()),
                None => method.as_str().to_string(),
            };
            out.push(
                CandidateSymbol::new(file, symbol, line, line, CandidateKind::Export)
                    .with_score(ROUTE_CONFIDENCE)
                    .with_role(ROLE_REQUEST_HANDLER)
                    .with_reason(format!("file route export {}", method.as_str())),
            );
        }
        out
    }
}

fn route_candidate(file: &str, method: &str, path: &str, line: usize) -> CandidateSymbol {
    CandidateSymbol::new(file, format!("{method} {path}"), line, line, CandidateKind::Export)
        .with_score(ROUTE_CONFIDENCE)
        .with_role(ROLE_REQUEST_HANDLER)
        .with_reason(format!("route {method} {path}"))
}

/// One candidate per UI-component file, decided by path alone.
pub struct ComponentMatcher;

const COMPONENT_EXTENSIONS: &[&str] = &[".tsx", ".jsx", ".vue", ".svelte"];

impl Matcher for ComponentMatcher {
    fn name(&self) -> &'static str {
        "component"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Components, Topic::State]
    }

    fn accepts(&self, file: &str) -> bool {
        has_extension(file, COMPONENT_EXTENSIONS)
            || ((file.starts_with("components/") || file.contains("/components/"))
                && has_extension(file, SCRIPT_EXTENSIONS))
    }

    fn detect(&self, file: &str, _text: Option<&str>) -> Vec<CandidateSymbol> {
        vec![
            CandidateSymbol::new(file, file_stem(file), 1, 1, CandidateKind::Component)
                .with_score(COMPONENT_CONFIDENCE)
                .with_role(ROLE_INTERFACE)
                .with_reason("UI component file"),
        ]
    }
}

/// One candidate per database-schema-shaped file.
pub struct SchemaMatcher;

const SCHEMA_EXTENSIONS: &[&str] = &[".sql", ".prisma"];

impl Matcher for SchemaMatcher {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::Db]
    }

    fn accepts(&self, file: &str) -> bool {
        let name = file_name(file).to_ascii_lowercase();
        has_extension(file, SCHEMA_EXTENSIONS)
            || file.starts_with("migrations/")
            || file.contains("/migrations/")
            || name.starts_with("schema.")
            || name.contains(".schema.")
    }

    fn detect(&self, file: &str, _text: Option<&str>) -> Vec<CandidateSymbol> {
        vec![
            CandidateSymbol::new(file, file_name(file), 1, 1, CandidateKind::Schema)
                .with_score(SCHEMA_CONFIDENCE)
                .with_role(ROLE_CONFIG)
                .with_reason("database schema file"),
        ]
    }
}

/// Matchers that run for `topic`, in registration order.
pub fn active_matchers(topic: Topic, matchers: &[Arc<dyn Matcher>]) -> Vec<Arc<dyn Matcher>> {
    matchers
        .iter()
        .filter(|matcher| matcher.topics().contains(&topic))
        .cloned()
        .collect()
}

/// Run `matchers` over `files`, reading text in batches of `batch_size`.
///
/// Candidates come back grouped by file in input order, and by matcher order
/// within a file, whatever order the reads finish in.
pub async fn run_detectors(
    root: &Path,
    files: &[String],
    matchers: &[Arc<dyn Matcher>],
    batch_size: usize,
) -> Vec<CandidateSymbol> {
    if matchers.is_empty() {
        return Vec::new();
    }
    let batch_size = batch_size.max(1);
    let mut out = Vec::new();

    for batch in files.chunks(batch_size) {
        let mut slots: Vec<Vec<CandidateSymbol>> = vec![Vec::new(); batch.len()];
        let mut reads = JoinSet::new();

        for (idx, file) in batch.iter().enumerate() {
            let wanted: Vec<Arc<dyn Matcher>> = matchers
                .iter()
                .filter(|matcher| matcher.accepts(file))
                .cloned()
                .collect();
            if wanted.is_empty() {
                continue;
            }
            if !wanted.iter().any(|matcher| matcher.needs_text()) {
                slots[idx] = detect_all(&wanted, file, None);
                continue;
            }
            let path: PathBuf = root.join(file);
            let file = file.clone();
            reads.spawn(async move {
                let text = match tokio::fs::read_to_string(&path).await {
                    Ok(text) => Some(text),
                    Err(e) => {
                        log::debug!("Detector skipped unreadable {file}: {e}");
                        None
                    }
                };
                (idx, detect_all(&wanted, &file, text.as_deref()))
            });
        }

        while let Some(joined) = reads.join_next().await {
            match joined {
                Ok((idx, found)) => slots[idx] = found,
                Err(e) => log::warn!("Detector task failed: {e}"),
            }
        }
        out.extend(slots.into_iter().flatten());
    }

    log::debug!(
        "Detectors [{}] produced {} candidates from {} files",
        matchers.iter().map(|m| m.name()).collect::<Vec<_>>().join(", "),
        out.len(),
        files.len()
    );
    out
}

fn detect_all(matchers: &[Arc<dyn Matcher>], file: &str, text: Option<&str>) -> Vec<CandidateSymbol> {
    matchers
        .iter()
        .flat_map(|matcher| matcher.detect(file, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn route_matcher_finds_registrations_and_file_routes() {
        let text = "const app = express();\n\
                    app.get('/health', (req, res) => res.send('ok'));\n\
                    router.post(\"/users\", createUser);\n";
        let found = RouteMatcher.detect("src/server.ts", Some(text));
        let symbols: Vec<&str> = found.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GET /health", "POST /users"]);
        assert_eq!(found[0].start, 2);
        assert_eq!(found[1].start, 3);
        assert_eq!(found[0].kind, CandidateKind::Export);
        assert_eq!(found[0].role.as_deref(), Some(ROLE_REQUEST_HANDLER));
        assert!((found[0].score - ROUTE_CONFIDENCE).abs() < f32::EPSILON);

        let text = "import { NextResponse } from 'next/server';\n\
                    export async function GET() {\n  return NextResponse.json([]);\n}\n";
        let found = RouteMatcher.detect("src/app/api/users/route.ts", Some(text));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "GET /api/users");
        assert_eq!(found[0].start, 2);
    }

    #[test]
    fn component_and_schema_matchers_use_paths() {
        assert!(ComponentMatcher.accepts("src/components/Header.tsx"));
        assert!(ComponentMatcher.accepts("src/components/header.js"));
        assert!(ComponentMatcher.accepts("src/App.vue"));
        assert!(!ComponentMatcher.accepts("src/components/readme.md"));
        assert!(!ComponentMatcher.accepts("src/server.ts"));

        let found = ComponentMatcher.detect("src/components/Header.tsx", None);
        assert_eq!(found[0].symbol, "Header");
        assert_eq!(found[0].kind, CandidateKind::Component);

        assert!(SchemaMatcher.accepts("db/migrations/001_init.js"));
        assert!(SchemaMatcher.accepts("prisma/schema.prisma"));
        assert!(SchemaMatcher.accepts("src/user.schema.ts"));
        assert!(SchemaMatcher.accepts("sql/tables.sql"));
        assert!(!SchemaMatcher.accepts("src/database/connection.ts"));
        assert_eq!(
            SchemaMatcher.detect("prisma/schema.prisma", None)[0].role.as_deref(),
            Some(ROLE_CONFIG)
        );
    }

    #[test]
    fn matchers_are_gated_by_topic() {
        let matchers = default_matchers();
        let names = |topic| {
            active_matchers(topic, &matchers)
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(Topic::Api), vec!["route"]);
        assert_eq!(names(Topic::Auth), vec!["route"]);
        assert_eq!(names(Topic::State), vec!["component"]);
        assert_eq!(names(Topic::Db), vec!["schema"]);
        assert!(names(Topic::Unknown).is_empty());
    }

    #[tokio::test]
    async fn batched_detection_keeps_file_order() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let files: Vec<String> = (0..5).map(|i| format!("src/routes/r{i}.ts")).collect();
        fs::create_dir_all(root.join("src/routes")).unwrap();
        for (i, file) in files.iter().enumerate() {
            fs::write(root.join(file), format!("app.get('/r{i}', h);\n")).unwrap();
        }

        let matchers: Vec<Arc<dyn Matcher>> = vec![Arc::new(RouteMatcher)];
        let found = run_detectors(root, &files, &matchers, 2).await;
        let symbols: Vec<String> = found.into_iter().map(|c| c.symbol).collect();
        assert_eq!(
            symbols,
            vec!["GET /r0", "GET /r1", "GET /r2", "GET /r3", "GET /r4"]
        );
    }

    #[tokio::test]
    async fn unreadable_files_yield_nothing() {
        let temp = tempdir().unwrap();
        let matchers: Vec<Arc<dyn Matcher>> = vec![Arc::new(RouteMatcher)];
        let found = run_detectors(temp.path(), &["missing.ts".to_string()], &matchers, 32).await;
        assert!(found.is_empty());
    }
}
