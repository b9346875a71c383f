use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let temp = tempfile::tempdir().unwrap();
    write(
        temp.path(),
        "package.json",
        r#"{"name":"fixture","dependencies":{"better-sqlite3":"^9.4.0"}}"#,
    );
    write(
        temp.path(),
        "src/db.ts",
        "import Database from 'better-sqlite3';\n\nexport function initializeDatabase(path: string) {\n  return new Database(path);\n}\n",
    );
    temp
}

fn cli() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("context-local").expect("cargo bin context-local")
}

#[test]
fn flags_produce_json_response() {
    let repo = fixture();
    let output = cli()
        .arg(repo.path())
        .args(["--query", "database initialization", "--quiet"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["success"], Value::Bool(true));
    assert!(value["jumpTargets"].is_array());
    assert_eq!(value["retrievalBundle"]["topic"], "db");
}

#[test]
fn json_request_from_stdin() {
    let repo = fixture();
    let request = serde_json::json!({
        "projectPath": repo.path(),
        "query": "database initialization",
        "maxTokens": 50,
        "debug": true,
    });
    let output = cli()
        .args(["--file", "-", "--quiet", "--pretty"])
        .write_stdin(request.to_string())
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["metadata"]["bundleTokens"].as_u64().unwrap() <= 50);
    assert!(value["retrievalBundle"]["debug"].is_object());
}

#[test]
fn unknown_attack_plan_fails() {
    let repo = fixture();
    cli()
        .arg(repo.path())
        .args(["--query", "database", "--attack-plan", "shotgun", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Request rejected"));
}

#[test]
fn missing_query_fails() {
    let repo = fixture();
    cli()
        .arg(repo.path())
        .arg("--quiet")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}
