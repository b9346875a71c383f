use crate::systems::languages_by_frequency;
use context_protocol::RepoFingerprint;
use sha2::{Digest, Sha256};

const DIGEST_HEX_LEN: usize = 16;

/// Marker file name (or path suffix) to framework label.
const FRAMEWORK_MARKERS: &[(&str, &str)] = &[
    ("next.config.", "Next.js"),
    ("nuxt.config.", "Nuxt"),
    ("svelte.config.", "SvelteKit"),
    ("remix.config.", "Remix"),
    ("astro.config.", "Astro"),
    ("vite.config.", "Vite"),
    ("angular.json", "Angular"),
    ("nest-cli.json", "NestJS"),
    ("manage.py", "Django"),
    ("schema.prisma", "Prisma"),
    ("drizzle.config.", "Drizzle"),
    ("supabase/config.toml", "Supabase"),
    ("tailwind.config.", "Tailwind"),
    ("Cargo.toml", "Cargo"),
    ("pyproject.toml", "Python packaging"),
    ("Dockerfile", "Docker"),
];

/// Classify a repository from its file names alone.
pub fn fingerprint_files(files: &[String]) -> RepoFingerprint {
    let mut sorted: Vec<&str> = files.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut frameworks: Vec<String> = Vec::new();
    for (marker, label) in FRAMEWORK_MARKERS {
        let hit = sorted.iter().any(|file| {
            let name = file.rsplit('/').next().unwrap_or(file);
            name.starts_with(marker) || file.ends_with(marker)
        });
        if hit && !frameworks.iter().any(|f| f == label) {
            frameworks.push((*label).to_string());
        }
    }

    RepoFingerprint {
        languages: languages_by_frequency(files),
        frameworks,
        families: families(&sorted),
        digest: digest(&sorted),
    }
}

fn families(files: &[&str]) -> Vec<String> {
    let has = |pred: &dyn Fn(&str) -> bool| files.iter().any(|file| pred(file));
    let mut out = Vec::new();

    if has(&|f| {
        [".tsx", ".jsx", ".vue", ".svelte", ".astro"]
            .iter()
            .any(|ext| f.ends_with(ext))
            || f.contains("/components/")
    }) {
        out.push("frontend");
    }
    if has(&|f| {
        ["api/", "server/", "routes/", "controllers/", "handlers/"]
            .iter()
            .any(|dir| f.starts_with(dir) || f.contains(&format!("/{dir}")))
    }) {
        out.push("backend");
    }
    if has(&|f| {
        f.ends_with(".sql")
            || f.ends_with(".prisma")
            || f.contains("migrations/")
            || f.contains("/db/")
            || f.contains("/database/")
    }) {
        out.push("database");
    }
    if has(&|f| f == "Cargo.toml" || f.ends_with("/Cargo.toml")) {
        out.push("rust-crate");
    }
    if has(&|f| f == "package.json") {
        out.push("node-package");
    }
    if has(&|f| f == "pyproject.toml" || f == "setup.py" || f == "requirements.txt") {
        out.push("python-package");
    }

    out.into_iter().map(str::to_string).collect()
}

fn digest(sorted_files: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for file in sorted_files {
        hasher.update(file.as_bytes());
        hasher.update(b"\n");
    }
    let hex = format!("{:x}", hasher.finalize());
    hex[..DIGEST_HEX_LEN].to_string()
}
