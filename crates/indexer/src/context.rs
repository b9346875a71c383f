use crate::facts::DeclKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub file: String,
    pub name: String,
    pub kind: DeclKind,
    pub line: usize,
    pub end_line: usize,
    pub returns_jsx: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub file: String,
    pub source: String,
    pub names: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub file: String,
    /// Upper-case HTTP method, `ANY` when the registration does not say.
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    pub line: usize,
}

impl RouteRecord {
    /// Name used when a route becomes a candidate.
    pub fn symbol(&self) -> String {
        self.handler
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.method, self.path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvRecord {
    pub file: String,
    pub key: String,
    pub line: usize,
}

/// What the project is built on, as far as manifests and imports tell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemsInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Function name to called names, both by short name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl CallGraph {
    pub fn add_call(&mut self, caller: impl Into<String>, callee: impl Into<String>) {
        let callee = callee.into();
        if callee.is_empty() {
            return;
        }
        self.edges.entry(caller.into()).or_default().insert(callee);
    }

    pub fn callees(&self, symbol: &str) -> Vec<&str> {
        self.edges
            .get(symbol)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn callers(&self, symbol: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, callees)| callees.contains(symbol))
            .map(|(caller, _)| caller.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Read-only snapshot of what the indexer knows about one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub root: PathBuf,
    pub files: Vec<String>,
    pub exports: Vec<ExportRecord>,
    pub imports: Vec<ImportRecord>,
    pub routes: Vec<RouteRecord>,
    pub env: Vec<EnvRecord>,
    pub systems: SystemsInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_graph: Option<CallGraph>,
}

impl ProjectContext {
    pub fn empty(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.exports.iter().any(|export| export.name == name)
    }

    pub fn exports_in<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ExportRecord> {
        self.exports.iter().filter(move |export| export.file == file)
    }

    pub fn imports_of<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a ImportRecord> {
        self.imports.iter().filter(move |import| import.file == file)
    }

    /// Distinct env keys in first-seen order.
    pub fn env_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.env
            .iter()
            .filter(|record| seen.insert(record.key.as_str()))
            .map(|record| record.key.clone())
            .collect()
    }
}
