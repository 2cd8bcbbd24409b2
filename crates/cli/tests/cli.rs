use assert_cmd::prelude::*;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use predicates::str::contains;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const AUTH_RS: &str = "use crate::db::Users;\n\npub fn authenticate_user(name: &str, password: &str) -> bool {\n    let user = Users::find(name);\n    user.verify(password)\n}\n";

fn setup_repo() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/auth.rs"), AUTH_RS).unwrap();
    let root = temp.path().canonicalize().unwrap();
    (temp, root)
}

/// Fake index service on its own runtime thread; returns its base URL.
fn spawn_backend(app: Router) -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

fn backend_app(root: &Path, vector_ready: bool) -> Router {
    let workspaces = json!([{ "id": "ws-1", "path": root.display().to_string() }]);
    let status = json!({
        "vector_ready": vector_ready,
        "is_vector_indexing": false,
        "file_count": 1,
        "chunk_count": 1
    });
    let results = json!({
        "results": [{
            "file_path": root.join("src/auth.rs").display().to_string(),
            "relative_path": "src/auth.rs",
            "content": AUTH_RS,
            "start_line": 1,
            "end_line": 6,
            "score": 0.8
        }],
        "query_time_ms": 4
    });

    Router::new()
        .route("/api/workspaces", get(move || async move { Json(workspaces) }))
        .route(
            "/api/workspaces/:id/status",
            get(move || async move { Json(status) }),
        )
        .route(
            "/api/workspaces/:id/index",
            post(|| async { StatusCode::ACCEPTED }),
        )
        .route(
            "/api/workspaces/:id/search/semantic",
            post(move || async move { Json(results) }),
        )
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn scout(backend_url: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scout"));
    cmd.env("SCOUT_BACKEND_URL", backend_url)
        .env_remove("SCOUT_CONFIG")
        .env_remove("SCOUT_TIMEOUT_MS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn search_json_reports_structural_matches() {
    let (_temp, root) = setup_repo();
    let url = spawn_backend(backend_app(&root, true));

    let output = scout(&url)
        .args(["search", "user authentication", "--focus", "functions", "--json"])
        .arg("--workspace")
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["status"], "ready");
    assert_eq!(body["workspace_id"], "ws-1");
    let matches = body["matches"].as_array().expect("matches array");
    let structural = matches
        .iter()
        .find(|m| m["match_type"] == "structural")
        .expect("structural match");
    assert_eq!(structural["symbol_name"], "authenticate_user");
    assert_eq!(structural["symbol_kind"], "functions");
    assert_eq!(structural["line_start"], 3);
    assert!(structural["context"]["code"]
        .as_str()
        .is_some_and(|code| code.contains("use crate::db::Users;")));
}

#[test]
fn search_text_output_lists_ranked_blocks() {
    let (_temp, root) = setup_repo();
    let url = spawn_backend(backend_app(&root, true));

    scout(&url)
        .args(["search", "user authentication"])
        .arg("--workspace")
        .arg(&root)
        .assert()
        .success()
        .stdout(contains("Results for \"user authentication\""))
        .stdout(contains("src/auth.rs:1-"))
        .stdout(contains("[functions: authenticate_user]"))
        .stdout(contains("```rust"));
}

#[test]
fn semantic_filters_by_file_type() {
    let (_temp, root) = setup_repo();
    let url = spawn_backend(backend_app(&root, true));

    let output = scout(&url)
        .args(["semantic", "user authentication", "--file-type", "py", "--json"])
        .arg("--workspace")
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["matches"].as_array().map(Vec::len), Some(0));
}

#[test]
fn missing_index_triggers_indexing() {
    let (_temp, root) = setup_repo();
    let url = spawn_backend(backend_app(&root, false));

    scout(&url)
        .args(["search", "login"])
        .arg("--workspace")
        .arg(&root)
        .assert()
        .code(3)
        .stdout(contains("Indexing has been started"));
}

#[test]
fn status_prints_index_state() {
    let (_temp, root) = setup_repo();
    let url = spawn_backend(backend_app(&root, true));

    let output = scout(&url)
        .args(["status", "--json"])
        .arg("--workspace")
        .arg(&root)
        .output()
        .unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["workspace"]["id"], "ws-1");
    assert_eq!(body["status"]["vector_ready"], true);
}

#[test]
fn empty_query_fails_without_backend() {
    let (_temp, root) = setup_repo();

    scout(&closed_port_url())
        .args(["search", "   "])
        .arg("--workspace")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(contains("Invalid input"))
        .stderr(contains("Hint:"));
}

#[test]
fn json_errors_use_envelope() {
    let (_temp, root) = setup_repo();

    let output = scout(&closed_port_url())
        .args(["search", "", "--json"])
        .arg("--workspace")
        .arg(&root)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["code"], "invalid_input");
    assert!(body["hint"].is_string());
}

#[test]
fn unreachable_backend_is_reported() {
    let (_temp, root) = setup_repo();

    scout(&closed_port_url())
        .args(["search", "login"])
        .arg("--workspace")
        .arg(&root)
        .assert()
        .code(1)
        .stderr(contains("unavailable"));
}

#[test]
fn config_file_must_be_valid() {
    let (temp, root) = setup_repo();
    let config = temp.path().join("scout.toml");
    fs::write(&config, "structural_boost = -1.0\n").unwrap();

    scout(&closed_port_url())
        .args(["search", "login"])
        .arg("--workspace")
        .arg(&root)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(contains("structural_boost"));
}

#[test]
fn schema_describes_both_parameter_sets() {
    let output = scout(&closed_port_url()).arg("schema").output().unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(body["hybrid_search"]["properties"]["query"].is_object());
    assert!(body["semantic_search"]["properties"]["min_score"].is_object());
}
