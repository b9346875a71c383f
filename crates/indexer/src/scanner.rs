use context_protocol::normalize_rel_path;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

/// Knobs for [`FileScanner`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_file_size: u64,
    /// Respect `.gitignore`, global git excludes and `.git/info/exclude`.
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE_BYTES,
            respect_gitignore: true,
        }
    }
}

/// Finds the files of a project worth indexing.
///
/// Paths come back repo-relative, forward-slashed and sorted so that every
/// downstream stage sees the same order on every run.
pub struct FileScanner {
    root: PathBuf,
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_options(root, ScanOptions::default())
    }

    pub fn with_options(root: impl AsRef<Path>, options: ScanOptions) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan(&self) -> Vec<String> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(self.options.respect_gitignore)
            .git_global(self.options.respect_gitignore)
            .git_exclude(self.options.respect_gitignore)
            .require_git(false);
        builder.filter_entry(move |entry| !FileScanner::is_ignored_scope(entry.path(), &root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.options.max_file_size {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.options.max_file_size
                            );
                            continue;
                        }
                    }

                    if Self::is_noise_file(path) || !Self::is_indexable(path) {
                        continue;
                    }

                    if let Some(rel) = self.relative(path) {
                        files.push(rel);
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        files.dedup();
        log::debug!("Found {} files under {}", files.len(), self.root.display());
        files
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let rel = normalize_rel_path(&rel.to_string_lossy());
        (!rel.is_empty()).then_some(rel)
    }

    fn is_indexable(path: &Path) -> bool {
        if let Some(file_name) = path.file_name().and_then(|name| name.to_str()) {
            if INDEXED_FILE_NAMES
                .iter()
                .any(|candidate| file_name.eq_ignore_ascii_case(candidate))
            {
                return true;
            }
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext.as_str()))
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        relative.components().any(|component| match component {
            std::path::Component::Normal(name) => {
                let lowered = name.to_string_lossy().to_lowercase();
                IGNORED_SCOPES.contains(&lowered.as_str())
            }
            _ => false,
        })
    }

    fn is_noise_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| {
                NOISE_FILE_NAMES
                    .iter()
                    .any(|candidate| name.eq_ignore_ascii_case(candidate))
                    || name.ends_with(".min.js")
                    || name.ends_with(".map")
            })
    }
}

const IGNORED_SCOPES: &[&str] = &[
    // VCS / tooling
    ".git",
    ".hg",
    ".svn",
    ".idea",
    ".vscode",
    ".yarn",
    ".npm",
    // caches / builds
    ".cache",
    "node_modules",
    ".next",
    ".turbo",
    ".parcel-cache",
    ".output",
    ".nuxt",
    ".vite",
    ".vercel",
    ".svelte-kit",
    "build",
    "dist",
    "out",
    "coverage",
    "storybook-static",
    "target",
    ".terraform",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    // vendored code
    "vendor",
    "third_party",
    "third-party",
];

const NOISE_FILE_NAMES: &[&str] = &[
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "bun.lockb",
    "cargo.lock",
    "poetry.lock",
];

/// Manifests and build files kept regardless of extension.
const INDEXED_FILE_NAMES: &[&str] = &["Dockerfile", "Makefile", "Procfile", "Gemfile"];

const INDEXED_EXTENSIONS: &[&str] = &[
    // languages with syntax facts
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py", "pyw", "rs",
    // other code
    "vue", "svelte", "astro", "go", "java", "kt", "rb", "php", "cs", "swift", "c", "h", "cpp",
    "hpp", "sh",
    // schemas / data definitions
    "sql", "prisma", "graphql", "gql", "proto",
    // config + docs
    "json", "toml", "yaml", "yml", "ini", "cfg", "md", "mdx", "html", "css", "scss",
];

#[cfg(test)]
mod tests {
    use super::FileScanner;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn returns_sorted_relative_paths() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/database")).unwrap();
        fs::write(temp.path().join("src/database/connection.ts"), "export {}").unwrap();
        fs::write(temp.path().join("src/app.tsx"), "export {}").unwrap();
        fs::write(temp.path().join("package.json"), "{}").unwrap();

        let files = FileScanner::new(temp.path()).scan();

        assert_eq!(
            files,
            vec![
                "package.json".to_string(),
                "src/app.tsx".to_string(),
                "src/database/connection.ts".to_string(),
            ]
        );
    }

    #[test]
    fn skips_ignored_directories_and_noise() {
        let temp = tempdir().unwrap();
        let modules = temp.path().join("node_modules").join("pg");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("index.js"), "module.exports = {}").unwrap();
        fs::write(temp.path().join("package-lock.json"), "{}").unwrap();
        fs::write(temp.path().join("bundle.min.js"), "x").unwrap();
        fs::write(temp.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(temp.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let files = FileScanner::new(temp.path()).scan();

        assert_eq!(files, vec!["main.rs".to_string()]);
    }

    #[test]
    fn honours_gitignore_without_a_repository() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("generated")).unwrap();
        fs::write(temp.path().join("generated/schema.ts"), "export {}").unwrap();
        fs::write(temp.path().join("index.ts"), "export {}").unwrap();
        fs::write(temp.path().join(".gitignore"), "/generated\n").unwrap();

        let files = FileScanner::new(temp.path()).scan();

        assert_eq!(files, vec!["index.ts".to_string()]);
    }
}
