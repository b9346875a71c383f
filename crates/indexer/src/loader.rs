use crate::context::{CallGraph, EnvRecord, ExportRecord, ImportRecord, ProjectContext};
use crate::env_keys::{scan_dotenv, scan_env_access};
use crate::error::{IndexerError, Result};
use crate::facts::{FactExtractor, SyntaxFacts};
use crate::routes::routes_from_facts;
use crate::scanner::{FileScanner, ScanOptions};
use crate::systems::{detect_systems, manifest_dependencies};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Dotenv files read from the project root even though the scanner skips dotfiles.
const DOTENV_CANDIDATES: &[&str] = &[
    ".env.example",
    ".env.sample",
    ".env.template",
    ".env.local.example",
    ".env",
    ".env.local",
];

/// Builds a [`ProjectContext`] for one project root.
pub struct ProjectIndexer {
    root: PathBuf,
    scan: ScanOptions,
}

impl ProjectIndexer {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(root.display().to_string()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            scan: ScanOptions::default(),
        })
    }

    #[must_use]
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan_files(&self) -> Vec<String> {
        FileScanner::with_options(&self.root, self.scan.clone()).scan()
    }

    pub fn load(&self) -> Result<ProjectContext> {
        let files = self.scan_files();
        self.load_files(files)
    }

    /// Index an already scanned file list (repo-relative paths).
    pub fn load_files(&self, files: Vec<String>) -> Result<ProjectContext> {
        let started = Instant::now();
        let mut context = ProjectContext::empty(&self.root);
        let mut extractor = FactExtractor::new();
        let mut calls = CallGraph::default();
        let mut parsed = 0usize;

        for file in &files {
            let text = match std::fs::read_to_string(self.root.join(file)) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!("Skipping unreadable {file}: {e}");
                    continue;
                }
            };

            context
                .env
                .extend(scan_env_access(&text).into_iter().map(|r| EnvRecord {
                    file: file.clone(),
                    key: r.key,
                    line: r.line,
                }));

            match extractor.extract(file, &text) {
                Ok(Some(facts)) => {
                    parsed += 1;
                    absorb(&mut context, &mut calls, file, facts);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Syntax extraction failed for {file}: {e}"),
            }
        }

        self.read_dotenv_files(&mut context);

        let deps = manifest_dependencies(&self.root, &files);
        context.systems = detect_systems(&deps, &context.imports, &files);
        context.call_graph = (!calls.is_empty()).then_some(calls);
        context.files = files;

        log::debug!(
            "Indexed {} files ({} parsed): {} exports, {} imports, {} routes, {} env refs in {} ms",
            context.files.len(),
            parsed,
            context.exports.len(),
            context.imports.len(),
            context.routes.len(),
            context.env.len(),
            started.elapsed().as_millis()
        );
        Ok(context)
    }

    fn read_dotenv_files(&self, context: &mut ProjectContext) {
        for name in DOTENV_CANDIDATES {
            let Ok(text) = std::fs::read_to_string(self.root.join(name)) else {
                continue;
            };
            context
                .env
                .extend(scan_dotenv(&text).into_iter().map(|r| EnvRecord {
                    file: (*name).to_string(),
                    key: r.key,
                    line: r.line,
                }));
        }
    }
}

fn absorb(context: &mut ProjectContext, calls: &mut CallGraph, file: &str, facts: SyntaxFacts) {
    context.routes.extend(routes_from_facts(file, &facts));

    for call in &facts.calls {
        if let Some(caller) = &call.enclosing {
            calls.add_call(caller.clone(), call.short_name());
        }
    }

    context.exports.extend(facts.exported().map(|decl| ExportRecord {
        file: file.to_string(),
        name: decl.name.clone(),
        kind: decl.kind,
        line: decl.start,
        end_line: decl.end,
        returns_jsx: decl.returns_jsx,
    }));

    context
        .imports
        .extend(facts.imports.into_iter().map(|import| ImportRecord {
            file: file.to_string(),
            source: import.source,
            names: import.names,
            line: import.line,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn rejects_missing_root() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            ProjectIndexer::new(&missing),
            Err(IndexerError::InvalidPath(_))
        ));
    }

    #[test]
    fn loads_exports_imports_env_routes_and_systems() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(
            root,
            "package.json",
            r#"{"dependencies":{"better-sqlite3":"^9.0.0","express":"^4.18.0"}}"#,
        );
        write(
            root,
            "src/database/connection.ts",
            "import Database from 'better-sqlite3';\n\
             export function initializeDatabase() {\n\
             \x20 return new Database(process.env.DB_PATH);\n\
             }\n",
        );
        write(
            root,
            "src/server.ts",
            "import express from 'express';\n\
             import { initializeDatabase } from './database/connection';\n\
             const app = express();\n\
             export function start() {\n\
             \x20 initializeDatabase();\n\
             \x20 app.get('/health', (req, res) => res.send('ok'));\n\
             }\n",
        );
        write(root, ".env.example", "PORT=3000\nDB_PATH=./data.db\n");

        let context = ProjectIndexer::new(root).unwrap().load().unwrap();

        assert_eq!(
            context.files,
            vec![
                "package.json".to_string(),
                "src/database/connection.ts".to_string(),
                "src/server.ts".to_string(),
            ]
        );
        assert!(context.has_export("initializeDatabase"));
        assert!(context.has_export("start"));
        assert_eq!(
            context
                .imports_of("src/server.ts")
                .map(|i| i.source.as_str())
                .collect::<Vec<_>>(),
            vec!["express", "./database/connection"]
        );
        assert_eq!(context.env_keys(), vec!["DB_PATH", "PORT"]);
        assert_eq!(context.routes.len(), 1);
        assert_eq!(context.routes[0].path, "/health");
        assert_eq!(context.systems.database.as_deref(), Some("SQLite"));
        assert_eq!(context.systems.framework.as_deref(), Some("Express"));

        let graph = context.call_graph.as_ref().unwrap();
        assert!(graph.callees("start").contains(&"initializeDatabase"));
    }
}
