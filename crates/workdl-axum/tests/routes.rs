//! Integration tests for the Axum web server.
//!
//! These tests verify that routes are wired to the engine and that engine
//! errors come back with the right status codes.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use workdl_axum::{AxumContext, CorsConfig, SseBroadcaster, create_router};
use workdl_core::{InMemorySettingsRepository, NoopWorkshopDetails, Settings};
use workdl_download::{DownloadEngine, EngineConfig, EngineDeps};
use workdl_library::LibraryService;

struct TestApp {
    dir: TempDir,
    router: Router,
}

impl TestApp {
    fn new(configure: impl FnOnce(&Path, &mut Settings)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let install = dir.path().join("game");
        fs::create_dir_all(&install).unwrap();

        let mut settings = Settings {
            install_dir: Some(install),
            fetch_tool_path: Some(dir.path().join("steamcmd")),
            ..Settings::default()
        };
        configure(dir.path(), &mut settings);

        let sse = Arc::new(SseBroadcaster::with_defaults());
        let deps = EngineDeps {
            settings: Arc::new(InMemorySettingsRepository::new(settings)),
            library: Arc::new(LibraryService::new()),
            details: Arc::new(NoopWorkshopDetails),
            events: sse.clone(),
        };
        let engine = Arc::new(DownloadEngine::new(deps, EngineConfig::default()));
        let router = create_router(AxumContext::new(engine, sse), &CorsConfig::AllowAll);
        Self { dir, router }
    }

    fn install_root(&self) -> std::path::PathBuf {
        self.dir.path().join("game")
    }

    fn install_map(&self, folder: &str, id: &str, declared: &str) {
        let zone = self.install_root().join("usermaps").join(folder).join("zone");
        fs::create_dir_all(&zone).unwrap();
        fs::write(
            zone.join("workshop.json"),
            format!(r#"{{"PublisherID":"{id}","Title":"Map {id}","FolderName":"{declared}","Type":"map"}}"#),
        )
        .unwrap();
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }
}

fn default_app() -> TestApp {
    TestApp::new(|_, _| {})
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let app = default_app();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn status_starts_idle() {
    let app = default_app();
    let (status, body) = app.get("/api/download/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["progress"], 0);
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn queue_add_list_remove_clear() {
    let app = default_app();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/queue",
            Some(json!({ "text": "123\nhttps://steamcommunity.com/sharedfiles/filedetails/?id=456, 123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], json!(["123", "456"]));
    assert_eq!(body["duplicates"], json!(["123"]));
    assert_eq!(body["queue"]["count"], 2);

    let (_, body) = app.get("/api/queue").await;
    assert_eq!(body["items"], json!(["123", "456"]));
    assert_eq!(body["processing"], Value::Null);

    let (status, body) = app.call(Method::DELETE, "/api/queue/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], false);
    assert_eq!(body["queue"]["count"], 2);

    let (_, body) = app.call(Method::DELETE, "/api/queue/123", None).await;
    assert_eq!(body["removed"], true);
    assert_eq!(body["queue"]["items"], json!(["456"]));

    let (status, body) = app.call(Method::DELETE, "/api/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 1);
}

#[tokio::test]
async fn queue_accepts_item_list() {
    let app = default_app();
    let (status, body) = app
        .call(Method::POST, "/api/queue", Some(json!({ "items": ["7", "8"] })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["added"], json!(["7", "8"]));
}

#[tokio::test]
async fn validation_errors_are_bad_request() {
    let app = default_app();

    let (status, body) = app
        .call(Method::POST, "/api/queue", Some(json!({ "text": "no ids here" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation");
    assert_eq!(body["status"], 400);

    let (status, _) = app.call(Method::POST, "/api/queue/process", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::POST, "/api/download", Some(json!({ "item_id": "abc" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_without_install_dir_is_bad_request() {
    let app = TestApp::new(|_, s| s.install_dir = None);
    let (status, body) = app
        .call(Method::POST, "/api/download", Some(json!({ "workshop_id": "123" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "validation");

    let (_, body) = app.get("/api/download/status").await;
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn stop_when_idle_is_noop() {
    let app = default_app();
    let (status, body) = app.call(Method::POST, "/api/download/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stopped"], false);
}

#[tokio::test]
async fn library_listing_and_fix() {
    let app = default_app();
    app.install_map("123", "123", "zm_castle");
    app.install_map("zm_ok", "456", "zm_ok");

    let (status, body) = app.get("/api/library").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = app.get("/api/library/mismatches").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["expected_folder"], "zm_castle");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/library/fix-compatibility",
            Some(json!({ "items": "all" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fixed_count"], 1);
    assert!(app.install_root().join("usermaps/zm_castle").is_dir());

    let (_, body) = app
        .call(
            Method::POST,
            "/api/library/fix-compatibility",
            Some(json!({ "items": ["all"] })),
        )
        .await;
    assert_eq!(body["fixed_count"], 0);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/library/fix-compatibility",
            Some(json!({ "items": ["999"] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["type"], "not_found");
}

#[tokio::test]
async fn library_remove() {
    let app = default_app();
    app.install_map("zm_castle", "123", "zm_castle");

    let (status, body) = app.call(Method::DELETE, "/api/library/123", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["folder_name"], "zm_castle");
    assert!(!app.install_root().join("usermaps/zm_castle").exists());

    let (status, _) = app.call(Method::DELETE, "/api/library/123", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_get_and_update() {
    let app = default_app();

    let (status, body) = app.get("/api/settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_executable"], "BlackOps3");
    assert_eq!(body["continuous_download"], true);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/settings",
            Some(json!({ "continuous_download": false, "launch_parameters": "-windowed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["continuous_download"], false);
    assert_eq!(body["launch_parameters"], "-windowed");

    let (status, _) = app
        .call(Method::PUT, "/api/settings", Some(json!({ "game_executable": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/settings").await;
    assert_eq!(body["continuous_download"], false);
    assert_eq!(body["game_executable"], "BlackOps3");
}

#[tokio::test]
async fn workshop_info_reports_install_state() {
    let app = default_app();
    app.install_map("zm_castle", "123", "zm_castle");
    app.get("/api/library").await;

    let (status, body) = app.get("/api/workshop/123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "123");
    assert_eq!(body["details"], Value::Null);
    assert_eq!(body["installed"]["folder_name"], "zm_castle");

    let (status, _) = app.get("/api/workshop/nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn launch_without_executable_is_not_found() {
    let app = default_app();
    let (status, body) = app.call(Method::POST, "/api/game/launch", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["type"], "not_found");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_download_is_conflict() {
    use std::os::unix::fs::PermissionsExt;

    let app = TestApp::new(|root, _| {
        let tool_dir = root.join("steamcmd");
        fs::create_dir_all(&tool_dir).unwrap();
        let script = tool_dir.join("steamcmd.sh");
        fs::write(&script, "#!/bin/sh\necho \"Downloading item $7 ...\"\nexec sleep 60\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    });

    let (status, body) = app
        .call(Method::POST, "/api/download", Some(json!({ "item_id": "111" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_id"], "111");

    let (status, body) = app
        .call(Method::POST, "/api/download", Some(json!({ "item_id": "999" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["type"], "conflict");

    let (_, body) = app.get("/api/download/status").await;
    assert_eq!(body["item_id"], "111");
    assert_eq!(body["active"], true);

    let (_, body) = app.call(Method::POST, "/api/download/stop", None).await;
    assert_eq!(body["stopped"], true);
}
