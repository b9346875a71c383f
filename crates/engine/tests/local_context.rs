use async_trait::async_trait;
use context_engine::{
    BundleAssembler, Collaborators, EngineConfig, EngineError, LocalContextEngine,
    StructuralSearch,
};
use context_protocol::{
    estimate_tokens, CandidateSymbol, JumpTarget, LocalContextRequest, MiniBundleItem,
    StructuralQuery,
};
use context_search::{FilePrioritizer, Topic};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn storage_repo() -> TempDir {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "package.json",
        r#"{"name":"fixture","dependencies":{"better-sqlite3":"^9.4.0","express":"^4.19.0"}}"#,
    );
    write(
        root,
        "src/database/connection.ts",
        r#"import Database from 'better-sqlite3';

export function initializeDatabase(path: string) {
  const db = new Database(path);
  db.pragma('journal_mode = WAL');
  return db;
}

export function getUserById(db: any, id: string) {
  return db.prepare('SELECT * FROM users WHERE id = ?').get(id);
}

export function saveUser(db: any, name: string) {
  return db.prepare('INSERT INTO users (name) VALUES (?)').run(name);
}
"#,
    );
    write(
        root,
        "src/server.ts",
        r#"import express from 'express';
import { initializeDatabase, getUserById } from './database/connection';
import { requireSession } from './auth/session';

const app = express();
const db = initializeDatabase(process.env.DATABASE_PATH ?? 'app.db');

app.get('/api/users/:id', requireSession, (req, res) => {
  res.json(getUserById(db, req.params.id));
});

export function startServer() {
  app.listen(Number(process.env.PORT ?? 3000));
}
"#,
    );
    write(
        root,
        "src/auth/session.ts",
        r#"import jwt from 'jsonwebtoken';

export function requireSession(req: any, res: any, next: any) {
  const token = req.headers.authorization;
  req.user = jwt.verify(token, process.env.JWT_SECRET);
  next();
}

export function loginUser(name: string) {
  return jwt.sign({ name }, process.env.JWT_SECRET);
}
"#,
    );
    write(
        root,
        "src/authService.ts",
        r#"import { loginUser } from './auth/session';

export function loginWithPassword(name: string, password: string) {
  return loginUser(name);
}
"#,
    );
    write(
        root,
        "src/database/connection.test.ts",
        r#"import { initializeDatabase } from './connection';

test('initializes', () => {
  initializeDatabase(':memory:');
});
"#,
    );
    write(
        root,
        "docs/database.md",
        "# Database\n\nCall initializeDatabase once at startup.\n",
    );
    temp
}

fn engine() -> LocalContextEngine {
    LocalContextEngine::new(EngineConfig::default())
}

fn request(root: &Path, query: &str) -> LocalContextRequest {
    LocalContextRequest::new(root.to_string_lossy(), query)
}

#[tokio::test]
async fn database_initialization_scenario() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "database initialization").with_attack_plan("init-read-write"))
        .await
        .unwrap();

    assert!(response.success, "{}", response.answer_draft);
    assert!(response
        .jump_targets
        .iter()
        .any(|t| t.symbol.contains("initializeDatabase")));
    assert!(
        response.answer_draft.contains("SQLite"),
        "{}",
        response.answer_draft
    );
    assert!(response.answer_draft.contains("initializeDatabase"));

    let bundle = response.retrieval_bundle.expect("bundle");
    assert_eq!(bundle.topic, "db");
    assert!(bundle.anchors.len() <= 8);
    assert!(bundle.env_hints.contains(&"DATABASE_PATH".to_string()));
}

#[tokio::test]
async fn identical_requests_give_identical_answers() {
    let repo = storage_repo();
    let engine = engine();
    let req = request(repo.path(), "how are users saved to the database");

    let first = engine.run(&req).await.unwrap();
    let second = engine.run(&req).await.unwrap();
    assert_eq!(first.answer_draft, second.answer_draft);
    assert_eq!(first.jump_targets, second.jump_targets);
    assert_eq!(first.mini_bundle.len(), second.mini_bundle.len());

    let uncached = engine
        .run(&LocalContextRequest {
            use_project_hints_cache: Some(false),
            ..req.clone()
        })
        .await
        .unwrap();
    assert_eq!(first.jump_targets, uncached.jump_targets);
}

#[tokio::test]
async fn mini_bundle_respects_small_budget() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "database initialization").with_max_tokens(100))
        .await
        .unwrap();

    assert!(response.metadata.bundle_tokens <= 100);
    let spent: usize = response
        .mini_bundle
        .iter()
        .map(|item| estimate_tokens(&item.snippet))
        .sum();
    assert_eq!(spent, response.metadata.bundle_tokens);
    assert_eq!(
        response.metadata.compacted_tokens,
        response.metadata.bundle_tokens + estimate_tokens(&response.answer_draft)
    );
}

#[tokio::test]
async fn stoplisted_files_are_never_targets() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "database initialization"))
        .await
        .unwrap();

    let stoplist = FilePrioritizer::new(Topic::Db, &[]).unwrap();
    assert!(!response.jump_targets.is_empty());
    for target in &response.jump_targets {
        assert!(!stoplist.is_stoplisted(&target.file), "{}", target.file);
    }
}

#[tokio::test]
async fn exclude_patterns_drop_matching_files() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "auth session login").with_exclude_patterns(["**/auth/**"]))
        .await
        .unwrap();

    assert!(response.success);
    for target in &response.jump_targets {
        assert!(!target.file.starts_with("src/auth/"), "{}", target.file);
    }
    // The glob matches a directory segment, not a substring of the file name.
    assert!(response
        .jump_targets
        .iter()
        .any(|target| target.file == "src/authService.ts"));
}

#[tokio::test]
async fn auth_questions_get_supabase_env_hints() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "auth supabase login"))
        .await
        .unwrap();

    let bundle = response.retrieval_bundle.expect("bundle");
    assert_eq!(bundle.topic, "auth");
    assert!(bundle.env_hints.iter().any(|key| key.starts_with("SUPABASE_")));
    assert!(bundle.env_hints.contains(&"JWT_SECRET".to_string()));
}

#[tokio::test]
async fn empty_query_still_succeeds() {
    let repo = storage_repo();
    let response = engine().run(&request(repo.path(), "")).await.unwrap();
    assert!(response.success);
    assert!(response.metadata.bundle_tokens <= 3000);
}

#[tokio::test]
async fn max_similar_chunks_is_clamped_to_twenty() {
    let temp = tempfile::tempdir().unwrap();
    for i in 0..30 {
        write(
            temp.path(),
            &format!("src/records/store{i}.ts"),
            &format!("export function loadRecord{i}(id: string) {{\n  return id;\n}}\n"),
        );
    }
    let response = engine()
        .run(&request(temp.path(), "record loading").with_max_similar_chunks(50))
        .await
        .unwrap();

    assert_eq!(response.jump_targets.len(), 20);
    assert!(response.mini_bundle.len() <= 20);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_work() {
    let engine = engine();
    let missing_path = LocalContextRequest {
        query: Some("database".to_string()),
        ..LocalContextRequest::default()
    };
    assert!(matches!(
        engine.run(&missing_path).await,
        Err(EngineError::Validation(_))
    ));

    let missing_query = LocalContextRequest {
        project_path: Some("/repo".to_string()),
        ..LocalContextRequest::default()
    };
    assert!(matches!(
        engine.run(&missing_query).await,
        Err(EngineError::Validation(_))
    ));

    let bad_plan = LocalContextRequest::new("/repo", "database").with_attack_plan("shotgun");
    assert!(matches!(
        engine.run(&bad_plan).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn unreadable_project_degrades_to_empty_success() {
    let response = engine()
        .run(&LocalContextRequest::new("/no/such/project", "database initialization"))
        .await
        .unwrap();
    assert!(response.success);
    assert!(response.jump_targets.is_empty());
    assert_eq!(response.metadata.files_scanned, 0);
}

#[tokio::test]
async fn debug_flag_adds_debug_block() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "database initialization").with_debug(true))
        .await
        .unwrap();
    let debug = response.retrieval_bundle.unwrap().debug.expect("debug block");
    assert_eq!(debug.plan, "init-read-write");
    assert!(debug.queries > 0);
    assert!(debug.ranked <= debug.candidates);
}

#[tokio::test]
async fn response_serializes_camel_case() {
    let repo = storage_repo();
    let response = engine()
        .run(&request(repo.path(), "database initialization"))
        .await
        .unwrap();
    let value = serde_json::to_value(&response).unwrap();
    assert!(value["jumpTargets"].is_array());
    assert!(value["metadata"]["bundleTokens"].is_u64());
    assert!(value["retrievalBundle"]["envHints"].is_array());
}

struct SlowSearch;

#[async_trait]
impl StructuralSearch for SlowSearch {
    async fn run(
        &self,
        _root: &Path,
        _files: &[String],
        _queries: &[StructuralQuery],
        _max_matches: usize,
    ) -> context_engine::Result<Vec<CandidateSymbol>> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn structural_search_timeout_is_not_fatal() {
    let repo = storage_repo();
    let config = EngineConfig {
        structural_timeout_ms: 20,
        ..EngineConfig::default()
    };
    let collaborators =
        Collaborators::default_stack(&config).with_structural_search(Arc::new(SlowSearch));
    let engine = LocalContextEngine::with_collaborators(config, collaborators);

    let response = engine
        .run(&request(repo.path(), "database initialization"))
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.metadata.symbols_considered, 0);
    assert!(response.jump_targets.is_empty());
}

struct BrokenAssembler;

#[async_trait]
impl BundleAssembler for BrokenAssembler {
    async fn assemble(
        &self,
        _root: &Path,
        _targets: &[JumpTarget],
        _max_tokens: usize,
    ) -> Vec<MiniBundleItem> {
        panic!("assembler exploded");
    }
}

#[tokio::test]
async fn pipeline_failures_become_failed_responses() {
    let repo = storage_repo();
    let config = EngineConfig::default();
    let collaborators =
        Collaborators::default_stack(&config).with_bundle_assembler(Arc::new(BrokenAssembler));
    let engine = LocalContextEngine::with_collaborators(config, collaborators);

    let response = engine
        .run(&request(repo.path(), "database initialization"))
        .await
        .unwrap();
    assert!(!response.success);
    assert!(response.answer_draft.contains("pipeline failed"));
    assert!(response.jump_targets.is_empty());
    assert!(response.mini_bundle.is_empty());
    assert_eq!(response.metadata.bundle_tokens, 0);
    assert!(response.retrieval_bundle.is_none());
}
