use crate::resolve::ModuleResolver;
use crate::types::ImportEdge;
use context_indexer::{ImportRecord, ProjectContext};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// File-level import graph: an edge `a -> b` means `a` imports `b`.
#[derive(Debug, Default)]
pub struct ImportGraph {
    graph: DiGraph<String, ImportEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the import records of a loaded project.
    pub fn from_context(context: &ProjectContext) -> Self {
        Self::from_imports(&context.files, &context.imports)
    }

    /// Every file becomes a node; imports that resolve inside `files` become edges.
    pub fn from_imports(files: &[String], imports: &[ImportRecord]) -> Self {
        let mut graph = Self::new();
        for file in files {
            graph.add_file(file);
        }

        let resolver = ModuleResolver::new(files);
        let mut unresolved = 0usize;
        for import in imports {
            let target = specifiers(import).find_map(|spec| resolver.resolve(&import.file, &spec));
            match target {
                Some(target) if target != import.file => graph.add_import(
                    &import.file,
                    &target,
                    ImportEdge {
                        specifier: import.source.clone(),
                        line: import.line,
                    },
                ),
                Some(_) => {}
                None => unresolved += 1,
            }
        }

        log::debug!(
            "Import graph: {} files, {} edges ({} external or unresolved imports)",
            graph.node_count(),
            graph.edge_count(),
            unresolved
        );
        graph
    }

    pub fn add_file(&mut self, file: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(file) {
            return idx;
        }
        let idx = self.graph.add_node(file.to_string());
        self.index.insert(file.to_string(), idx);
        idx
    }

    /// Add an edge; repeated imports of the same target keep the first edge.
    pub fn add_import(&mut self, from: &str, to: &str, edge: ImportEdge) {
        let a = self.add_file(from);
        let b = self.add_file(to);
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, edge);
        }
    }

    /// Files directly imported by `file`, sorted. Unknown files have none.
    pub fn neighbors(&self, file: &str) -> Vec<String> {
        let Some(&idx) = self.index.get(file) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| self.graph[e.target()].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Union of the one-hop neighbors of `anchors`, visited in anchor order.
    ///
    /// Anchors themselves are excluded and the result holds at most `limit`
    /// distinct files.
    pub fn expand_neighbors(&self, anchors: &[String], limit: usize) -> Vec<String> {
        let excluded: HashSet<&str> = anchors.iter().map(String::as_str).collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for anchor in anchors {
            for neighbor in self.neighbors(anchor) {
                if out.len() >= limit {
                    return out;
                }
                if excluded.contains(neighbor.as_str()) || !seen.insert(neighbor.clone()) {
                    continue;
                }
                out.push(neighbor);
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Specifiers to try for one import, most specific first.
///
/// A Rust `use crate::db::{init}` is recorded as source `crate::db` with names,
/// and `use crate::db;` as source `crate` with name `db`, so the joined paths
/// are tried before the bare source.
fn specifiers(import: &ImportRecord) -> impl Iterator<Item = String> + '_ {
    let joined: Vec<String> = if import.file.ends_with(".rs") {
        import
            .names
            .iter()
            .map(|name| format!("{}::{}", import.source, name))
            .collect()
    } else {
        Vec::new()
    };
    joined.into_iter().chain(std::iter::once(import.source.clone()))
}
