//! Resolution of import specifiers to files of the same project.
//!
//! Bare package names never resolve; only specifiers that can point into the
//! scanned file set are considered.

use std::collections::HashSet;

const SCRIPT_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts", "vue", "svelte", "json",
];

/// Path aliases and the directories they are tried against, in order.
const PATH_ALIASES: &[(&str, &[&str])] = &[("@/", &["src/", ""]), ("~/", &["src/", ""])];

pub struct ModuleResolver<'a> {
    files: HashSet<&'a str>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(files: &'a [String]) -> Self {
        Self {
            files: files.iter().map(String::as_str).collect(),
        }
    }

    /// Repo-relative file that `specifier`, imported from `from`, points at.
    pub fn resolve(&self, from: &str, specifier: &str) -> Option<String> {
        let specifier = specifier.trim();
        if specifier.is_empty() {
            return None;
        }
        if from.ends_with(".py") {
            return self.resolve_python(from, specifier);
        }
        if from.ends_with(".rs") {
            return self.resolve_rust(from, specifier);
        }
        self.resolve_script(from, specifier)
    }

    fn resolve_script(&self, from: &str, specifier: &str) -> Option<String> {
        if specifier.starts_with("./") || specifier.starts_with("../") {
            let joined = join(parent_dir(from), specifier)?;
            return self.script_candidates(&joined);
        }
        if let Some(rest) = specifier.strip_prefix('/') {
            return self.script_candidates(rest);
        }
        for (alias, bases) in PATH_ALIASES {
            if let Some(rest) = specifier.strip_prefix(alias) {
                return bases
                    .iter()
                    .find_map(|base| self.script_candidates(&format!("{base}{rest}")));
            }
        }
        None
    }

    fn script_candidates(&self, base: &str) -> Option<String> {
        if self.files.contains(base) {
            return Some(base.to_string());
        }
        // ESM TypeScript imports name the emitted `.js` file.
        if let Some(stem) = base.strip_suffix(".js").or_else(|| base.strip_suffix(".mjs")) {
            for ext in ["ts", "tsx", "mts"] {
                if let Some(hit) = self.existing(format!("{stem}.{ext}")) {
                    return Some(hit);
                }
            }
        }
        SCRIPT_EXTENSIONS
            .iter()
            .find_map(|ext| self.existing(format!("{base}.{ext}")))
            .or_else(|| {
                SCRIPT_EXTENSIONS
                    .iter()
                    .find_map(|ext| self.existing(format!("{base}/index.{ext}")))
            })
    }

    fn resolve_python(&self, from: &str, specifier: &str) -> Option<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let module = specifier[dots..].replace('.', "/");

        let bases: Vec<String> = if dots > 0 {
            let mut dir = parent_dir(from).to_string();
            for _ in 1..dots {
                dir = parent_dir(&dir).to_string();
            }
            vec![dir]
        } else {
            vec![String::new(), "src".to_string()]
        };

        bases.iter().find_map(|dir| {
            let path = join_segments(dir, &module);
            if module.is_empty() {
                return self.existing(join_segments(&path, "__init__.py"));
            }
            self.existing(format!("{path}.py"))
                .or_else(|| self.existing(join_segments(&path, "__init__.py")))
        })
    }

    fn resolve_rust(&self, from: &str, specifier: &str) -> Option<String> {
        let mut segments: Vec<&str> = specifier.split("::").filter(|s| !s.is_empty()).collect();
        let base = match segments.first().copied() {
            Some("crate") => {
                segments.remove(0);
                crate_src_dir(from)?
            }
            Some("self") => {
                segments.remove(0);
                rust_module_dir(from)
            }
            Some("super") => {
                let mut dir = rust_module_dir(from);
                while segments.first() == Some(&"super") {
                    segments.remove(0);
                    dir = parent_dir(&dir).to_string();
                }
                dir
            }
            _ => return None,
        };

        // Trailing segments may name items rather than modules; drop them one at a time.
        while !segments.is_empty() {
            let path = join_segments(&base, &segments.join("/"));
            if let Some(hit) = self
                .existing(format!("{path}.rs"))
                .or_else(|| self.existing(format!("{path}/mod.rs")))
            {
                return Some(hit);
            }
            segments.pop();
        }
        None
    }

    fn existing(&self, path: String) -> Option<String> {
        self.files.contains(path.as_str()).then_some(path)
    }
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|idx| &path[..idx]).unwrap_or("")
}

fn join_segments(dir: &str, rest: &str) -> String {
    match (dir.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => dir.to_string(),
        _ => format!("{dir}/{rest}"),
    }
}

/// Lexically join a relative specifier onto `dir`; `None` when it climbs above the root.
fn join(dir: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// `src` directory of the crate owning `from` (`crates/x/src/a/b.rs` -> `crates/x/src`).
fn crate_src_dir(from: &str) -> Option<String> {
    let mut prefix = String::new();
    for segment in from.split('/') {
        if segment == "src" {
            return Some(join_segments(&prefix, "src"));
        }
        prefix = join_segments(&prefix, segment);
    }
    None
}

/// Directory holding the children of the module defined by `from`.
fn rust_module_dir(from: &str) -> String {
    let dir = parent_dir(from);
    let name = from.rsplit('/').next().unwrap_or(from);
    match name {
        "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
        other => join_segments(dir, other.trim_end_matches(".rs")),
    }
}
