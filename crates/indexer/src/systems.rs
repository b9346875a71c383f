//! Detection of the database engine, web framework and auth provider a project uses.
//!
//! Evidence comes from manifest dependency names and import sources. Each table is
//! scanned in order and the first hit wins, so more specific entries come first.

use crate::context::{ImportRecord, SystemsInfo};
use crate::language::language_name;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

const DATABASE_ENGINES: &[(&str, &str)] = &[
    ("better-sqlite3", "SQLite"),
    ("sqlite3", "SQLite"),
    ("sqlite", "SQLite"),
    ("@libsql/client", "libSQL"),
    ("rusqlite", "SQLite"),
    ("pg", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("@neondatabase/serverless", "PostgreSQL"),
    ("@vercel/postgres", "PostgreSQL"),
    ("psycopg2", "PostgreSQL"),
    ("psycopg", "PostgreSQL"),
    ("asyncpg", "PostgreSQL"),
    ("tokio-postgres", "PostgreSQL"),
    ("mysql2", "MySQL"),
    ("mysql", "MySQL"),
    ("pymysql", "MySQL"),
    ("mongodb", "MongoDB"),
    ("mongoose", "MongoDB"),
    ("pymongo", "MongoDB"),
    ("@prisma/client", "Prisma"),
    ("prisma", "Prisma"),
    ("drizzle-orm", "Drizzle"),
    ("typeorm", "TypeORM"),
    ("sequelize", "Sequelize"),
    ("knex", "Knex"),
    ("@supabase/supabase-js", "Supabase"),
    ("firebase-admin", "Firestore"),
    ("sqlalchemy", "SQLAlchemy"),
    ("sqlx", "SQLx"),
    ("diesel", "Diesel"),
    ("redis", "Redis"),
    ("ioredis", "Redis"),
];

const FRAMEWORKS: &[(&str, &str)] = &[
    ("next", "Next.js"),
    ("nuxt", "Nuxt"),
    ("@sveltejs/kit", "SvelteKit"),
    ("@remix-run/", "Remix"),
    ("@nestjs/core", "NestJS"),
    ("express", "Express"),
    ("fastify", "Fastify"),
    ("koa", "Koa"),
    ("hono", "Hono"),
    ("@angular/core", "Angular"),
    ("react", "React"),
    ("vue", "Vue"),
    ("svelte", "Svelte"),
    ("fastapi", "FastAPI"),
    ("flask", "Flask"),
    ("django", "Django"),
    ("axum", "Axum"),
    ("actix-web", "Actix Web"),
    ("rocket", "Rocket"),
];

const AUTH_PROVIDERS: &[(&str, &str)] = &[
    ("next-auth", "NextAuth"),
    ("@auth/", "Auth.js"),
    ("@supabase/ssr", "Supabase Auth"),
    ("@supabase/auth-helpers-nextjs", "Supabase Auth"),
    ("@supabase/supabase-js", "Supabase Auth"),
    ("@clerk/", "Clerk"),
    ("lucia", "Lucia"),
    ("@auth0/", "Auth0"),
    ("firebase/auth", "Firebase Auth"),
    ("passport", "Passport"),
    ("flask_login", "Flask-Login"),
    ("django.contrib.auth", "Django Auth"),
    ("jsonwebtoken", "JWT"),
    ("jose", "JWT"),
    ("jwt", "JWT"),
];

/// Dependency names declared by the manifests among `files`.
///
/// Reads `package.json`, `requirements.txt`, `pyproject.toml` and `Cargo.toml`
/// at any depth. Unreadable or malformed manifests are skipped.
pub fn manifest_dependencies(root: &Path, files: &[String]) -> BTreeSet<String> {
    let mut deps = BTreeSet::new();
    for file in files {
        let name = file.rsplit('/').next().unwrap_or(file);
        let reader: fn(&str, &mut BTreeSet<String>) -> bool = match name {
            "package.json" => read_package_json,
            "requirements.txt" => read_requirements,
            "pyproject.toml" | "Cargo.toml" => read_toml_manifest,
            _ => continue,
        };
        let Ok(text) = std::fs::read_to_string(root.join(file)) else {
            continue;
        };
        if !reader(&text, &mut deps) {
            log::debug!("Skipping malformed manifest {file}");
        }
    }
    deps
}

fn read_package_json(text: &str, deps: &mut BTreeSet<String>) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return false;
    };
    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        if let Some(map) = value.get(section).and_then(|v| v.as_object()) {
            deps.extend(map.keys().cloned());
        }
    }
    true
}

fn read_requirements(text: &str, deps: &mut BTreeSet<String>) -> bool {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        let name: String = line
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        if !name.is_empty() {
            deps.insert(name.to_ascii_lowercase());
        }
    }
    true
}

fn read_toml_manifest(text: &str, deps: &mut BTreeSet<String>) -> bool {
    let Ok(value) = text.parse::<toml::Table>() else {
        return false;
    };
    for section in ["dependencies", "dev-dependencies"] {
        if let Some(table) = value.get(section).and_then(|v| v.as_table()) {
            deps.extend(table.keys().cloned());
        }
    }
    // PEP 621: `[project] dependencies = ["fastapi>=0.1", ...]`
    if let Some(list) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        let mut requirements = String::new();
        for item in list.iter().filter_map(|v| v.as_str()) {
            requirements.push_str(item);
            requirements.push('\n');
        }
        read_requirements(&requirements, deps);
    }
    true
}

/// Whether package `name` is `key` or lives under it (`key/x`, `key.x`, `key::x`).
/// Keys ending in `/` match any package with that scope prefix.
fn package_matches(key: &str, name: &str) -> bool {
    if key.ends_with('/') {
        return name.starts_with(key);
    }
    name == key
        || name
            .strip_prefix(key)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('.') || rest.starts_with("::"))
}

fn first_match(
    table: &[(&str, &str)],
    deps: &BTreeSet<String>,
    imports: &[ImportRecord],
) -> Option<String> {
    table
        .iter()
        .find(|(key, _)| {
            deps.iter().any(|dep| package_matches(key, dep))
                || imports
                    .iter()
                    .any(|import| package_matches(key, &import.source))
        })
        .map(|(_, label)| (*label).to_string())
}

pub fn detect_systems(
    deps: &BTreeSet<String>,
    imports: &[ImportRecord],
    files: &[String],
) -> SystemsInfo {
    SystemsInfo {
        database: first_match(DATABASE_ENGINES, deps, imports),
        framework: first_match(FRAMEWORKS, deps, imports),
        auth: first_match(AUTH_PROVIDERS, deps, imports),
        languages: languages_by_frequency(files),
    }
}

/// Language names ordered by file count (descending), then name.
pub fn languages_by_frequency(files: &[String]) -> Vec<String> {
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for file in files {
        if let Some(name) = language_name(file) {
            *counts.entry(name).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&'static str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}
