//! Environment variable references found by plain text scanning.
//!
//! Works on any file regardless of whether a grammar is available, which keeps
//! `.env.example` files and config modules in the picture.

use once_cell::sync::Lazy;
use regex::Regex;

static ENV_ACCESS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"process\.env\.([A-Za-z_][A-Za-z0-9_]*)",
        r#"process\.env\[\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]\s*\]"#,
        r"import\.meta\.env\.([A-Za-z_][A-Za-z0-9_]*)",
        r#"Deno\.env\.get\(\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#,
        r#"os\.environ(?:\.get)?\s*[\[(]\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#,
        r#"os\.getenv\(\s*['"]([A-Za-z_][A-Za-z0-9_]*)['"]"#,
        r#"env::var(?:_os)?\(\s*"([A-Za-z_][A-Za-z0-9_]*)""#,
        r#"(?:option_)?env!\(\s*"([A-Za-z_][A-Za-z0-9_]*)""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("env access regex"))
    .collect()
});

static DOTENV_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:export[ \t]+)?([A-Za-z_][A-Za-z0-9_]*)[ \t]*=")
        .expect("dotenv regex")
});

/// One environment key reference with its 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnvReference {
    pub key: String,
    pub line: usize,
}

pub fn is_dotenv_file(file_name: &str) -> bool {
    file_name == ".env" || file_name.starts_with(".env.")
}

/// Keys read through `process.env`, `os.environ`, `env::var` and friends.
pub fn scan_env_access(text: &str) -> Vec<EnvReference> {
    let lines = LineIndex::new(text);
    let mut out: Vec<EnvReference> = ENV_ACCESS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let key = caps.get(1)?;
            Some(EnvReference {
                key: key.as_str().to_string(),
                line: lines.line_of(key.start()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.key.cmp(&b.key)));
    out.dedup();
    out
}

/// Keys declared in a dotenv-style file (`KEY=value`, optionally `export KEY=`).
pub fn scan_dotenv(text: &str) -> Vec<EnvReference> {
    let lines = LineIndex::new(text);
    DOTENV_LINE
        .captures_iter(text)
        .filter_map(|caps| {
            let key = caps.get(1)?;
            Some(EnvReference {
                key: key.as_str().to_string(),
                line: lines.line_of(key.start()),
            })
        })
        .collect()
}

/// Byte offset to 1-based line lookup.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(refs: &[EnvReference]) -> Vec<(&str, usize)> {
        refs.iter().map(|r| (r.key.as_str(), r.line)).collect()
    }

    #[test]
    fn finds_node_python_and_rust_access() {
        let text = "const url = process.env.SUPABASE_URL;\n\
                    const key = process.env['SUPABASE_ANON_KEY'];\n\
                    db = os.environ.get(\"DATABASE_URL\")\n\
                    let port = std::env::var(\"PORT\");\n";
        assert_eq!(
            keys(&scan_env_access(text)),
            vec![
                ("SUPABASE_URL", 1),
                ("SUPABASE_ANON_KEY", 2),
                ("DATABASE_URL", 3),
                ("PORT", 4),
            ]
        );
    }

    #[test]
    fn parses_dotenv_lines() {
        let text = "# comment\nJWT_SECRET=abc\n\nexport NEXTAUTH_SECRET = x\nnot a key\n";
        assert_eq!(
            keys(&scan_dotenv(text)),
            vec![("JWT_SECRET", 2), ("NEXTAUTH_SECRET", 4)]
        );
    }

    #[test]
    fn line_index_maps_offsets() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(3), 2);
        assert_eq!(index.line_of(4), 2);
        assert_eq!(index.line_of(7), 4);
    }

    #[test]
    fn recognises_dotenv_names() {
        assert!(is_dotenv_file(".env"));
        assert!(is_dotenv_file(".env.example"));
        assert!(!is_dotenv_file("env.ts"));
    }
}
