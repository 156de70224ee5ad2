//! Full-sequence runs against a mocked API

use std::path::PathBuf;

use serde_json::json;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kinoprobe_core::outcome::TestStatus;
use kinoprobe_core::runner::{RunConfig, run};

async fn mount_json(server: &MockServer, m: &str, p: &str, body: serde_json::Value) {
    Mock::given(method(m))
        .and(path(p))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mocks for a healthy read-only deployment: item 42, media 7, device 3,
/// collection 9, genre 1
async fn mount_happy_path(server: &MockServer) {
    mount_json(server, "GET", "/v1/user", json!({
        "status": 200,
        "user": {"username": "tester", "subscription": {"active": true}}
    }))
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/references/[a-z-]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200, "items": []})))
        .mount(server)
        .await;
    mount_json(server, "GET", "/v1/tv", json!({"status": 200, "channels": []})).await;
    mount_json(server, "GET", "/v1/types", json!({
        "status": 200,
        "items": [{"id": "movie", "title": "Movies"}]
    }))
    .await;
    mount_json(server, "GET", "/v1/genres", json!({
        "status": 200,
        "items": [{"id": 1, "title": "Action"}]
    }))
    .await;
    mount_json(server, "GET", "/v1/countries", json!({
        "status": 200,
        "items": [{"id": 10, "title": "USA"}]
    }))
    .await;
    mount_json(server, "GET", "/v1/subtitles", json!({
        "status": 200,
        "items": [{"id": "en", "title": "English"}]
    }))
    .await;
    mount_json(server, "GET", "/v1/items", json!({
        "status": 200,
        "items": [{"id": 42, "title": "Sample", "type": "movie"}],
        "pagination": {"total": 1, "current": 1, "perpage": 5}
    }))
    .await;
    mount_json(server, "GET", "/v1/items/42", json!({
        "status": 200,
        "item": {
            "id": 42,
            "title": "Sample",
            "type": "movie",
            "duration": {"average": 5400},
            "videos": [{"id": 7}]
        }
    }))
    .await;
    mount_json(server, "GET", "/v1/items/search", json!({"status": 200, "items": []})).await;
    mount_json(server, "GET", "/v1/items/similar", json!({"items": []})).await;
    for shortcut in ["fresh", "hot", "popular"] {
        mount_json(server, "GET", &format!("/v1/items/{shortcut}"), json!({"items": []})).await;
    }
    mount_json(server, "GET", "/v1/items/trailer", json!({
        "status": 200,
        "trailer": {"id": 5, "url": "https://cdn.example/trailer.mp4"}
    }))
    .await;
    mount_json(server, "GET", "/v1/items/comments", json!({"status": 200, "comments": []})).await;
    mount_json(server, "GET", "/v1/items/media-links", json!({
        "status": 200,
        "files": [{"file": "/media/sample.mp4", "urls": {"hls4": "https://cdn.example/sample.m3u8"}}]
    }))
    .await;
    mount_json(server, "GET", "/v1/items/media-video-link", json!({
        "status": 200,
        "url": "https://cdn.example/sample.m3u8"
    }))
    .await;
    mount_json(server, "GET", "/v1/collections", json!({
        "status": 200,
        "items": [{"id": 9, "title": "Best of"}]
    }))
    .await;
    mount_json(server, "GET", "/v1/collections/view", json!({"status": 200, "items": []})).await;
    mount_json(server, "GET", "/v1/watching", json!({"status": 200})).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/watching/(movies|serials)$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 200, "items": []})))
        .mount(server)
        .await;
    mount_json(server, "GET", "/v1/history", json!({
        "status": 200,
        "history": [{"item": {"id": 42}, "media": {"id": 7}}]
    }))
    .await;
    mount_json(server, "GET", "/v1/device", json!({
        "status": 200,
        "devices": [{"id": 3, "is_browser": false}]
    }))
    .await;
    mount_json(server, "GET", "/v1/device/info", json!({"status": 200, "device": {"id": 3}})).await;
    mount_json(server, "GET", "/v1/device/3", json!({"status": 200, "device": {"id": 3}})).await;
    mount_json(server, "GET", "/v1/device/3/settings", json!({
        "status": 200,
        "settings": {}
    }))
    .await;
}

fn config_for(server: &MockServer, output_root: PathBuf) -> RunConfig {
    RunConfig {
        base_url: server.uri(),
        token: Some("test-token".to_string()),
        token_file: PathBuf::from("/nonexistent/token.json"),
        output_root,
        timeout_secs: 5,
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn read_only_run_passes_and_gates_mutations() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let out = tempfile::tempdir().unwrap();
    let report = run(&config_for(&server, out.path().to_path_buf())).await.unwrap();

    assert_eq!(report.exit_code, 0);

    let get = |id: &str| report.summary.get(id).unwrap_or_else(|| panic!("missing {id}"));

    for id in [
        "test-user",
        "test-references",
        "test-tv",
        "test-content-types",
        "test-content-genres",
        "test-content-countries",
        "test-content-subtitles",
        "test-content-items",
        "test-content-items-filters",
        "test-content-item-details",
        "test-content-search",
        "test-content-similar",
        "test-content-fresh",
        "test-content-fresh-genre",
        "test-content-hot",
        "test-content-popular",
        "test-content-trailer",
        "test-content-comments",
        "test-content-media-links",
        "test-content-media-video-link",
        "test-collections",
        "test-collections-sort",
        "test-collections-view",
        "test-watching",
        "test-history",
        "test-device",
    ] {
        assert_eq!(get(id).status, TestStatus::Pass, "{id}: {:?}", get(id).errors);
    }

    // Gated probes are enumerated as SKIP and name their enabling flag.
    for id in [
        "test-content-vote-mutating",
        "test-bookmarks-mutating",
        "test-watching-mutating",
        "test-watchlist-toggle-mutating",
        "test-device-mutating",
    ] {
        let record = get(id);
        assert_eq!(record.status, TestStatus::Skip, "{id}");
        assert!(record.errors[0].contains("--include-mutating"), "{id}: {:?}", record.errors);
    }
    let history_mutating = get("test-history-mutating");
    assert_eq!(history_mutating.status, TestStatus::Skip);
    assert!(history_mutating.errors[0].contains("--include-destructive"));
    let api2 = get("test-api2");
    assert_eq!(api2.status, TestStatus::Skip);
    assert!(api2.errors[0].contains("--include-api2"));

    // The device-flow probe skips without OAuth credentials.
    assert_eq!(get("test-auth-oauth2-device-flow").status, TestStatus::Skip);

    // Run artifacts.
    assert!(report.output_dir.join("summary.json").is_file());
    assert!(report.output_dir.join("content_items.snapshot.json").is_file());
    let token_source =
        std::fs::read_to_string(report.output_dir.join("token_source.json")).unwrap();
    assert!(token_source.contains("\"arg\""));
    assert!(!token_source.contains("test-token"));
}

#[tokio::test]
async fn missing_item_id_degrades_dependents_to_skip() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/v1/items", json!({"status": 200, "items": []})).await;
    mount_json(&server, "GET", "/v1/user", json!({
        "status": 200,
        "user": {"username": "tester"}
    }))
    .await;

    let out = tempfile::tempdir().unwrap();
    let report = run(&config_for(&server, out.path().to_path_buf())).await.unwrap();

    // The empty listing itself fails, so the run fails, but every
    // item-dependent probe is still enumerated as SKIP.
    assert_eq!(report.exit_code, 1);
    for id in [
        "test-content-item-details",
        "test-content-similar",
        "test-content-trailer",
        "test-content-comments",
        "test-watching",
    ] {
        let record = report.summary.get(id).unwrap_or_else(|| panic!("missing {id}"));
        assert_eq!(record.status, TestStatus::Skip, "{id}");
        assert!(record.errors[0].contains("no item id available"), "{id}: {:?}", record.errors);
    }
}

#[tokio::test]
async fn missing_credentials_exit_with_code_2() {
    let server = MockServer::start().await;

    let out = tempfile::tempdir().unwrap();
    let config = RunConfig {
        base_url: server.uri(),
        token: None,
        token_file: out.path().join("no-such-token.json"),
        output_root: out.path().to_path_buf(),
        timeout_secs: 5,
        ..RunConfig::default()
    };
    let report = run(&config).await.unwrap();

    assert_eq!(report.exit_code, 2);
    assert!(report.summary.results.is_empty());
    // The source record is written even when the run aborts.
    let token_source =
        std::fs::read_to_string(report.output_dir.join("token_source.json")).unwrap();
    assert!(token_source.contains("\"missing\""));
}

#[tokio::test]
async fn api2_sequence_threads_cross_reference_ids() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;
    mount_json(&server, "GET", "/api2/v1.1/items/search", json!({
        "status": 200,
        "items": [{"id": 42}]
    }))
    .await;
    mount_json(&server, "GET", "/api2/v1.1/items/42", json!({
        "item": {"id": 42, "imdb": 120338, "kinopoisk": 507}
    }))
    .await;
    mount_json(&server, "GET", "/api2/v1.1/items/collections/42", json!({"items": []})).await;
    mount_json(&server, "GET", "/api2/v1/backdrop/120338", json!({"backdrop": "url"})).await;
    Mock::given(method("GET"))
        .and(path("/api2/v1/imdb/120338"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = RunConfig {
        include_api2: true,
        ..config_for(&server, out.path().to_path_buf())
    };
    let report = run(&config).await.unwrap();

    assert_eq!(report.exit_code, 0);
    let get = |id: &str| report.summary.get(id).unwrap_or_else(|| panic!("missing {id}"));
    assert_eq!(get("test-api2-items-search").status, TestStatus::Pass);
    assert_eq!(get("test-api2-item-details").status, TestStatus::Pass);
    assert_eq!(get("test-api2-item-collections").status, TestStatus::Pass);
    // The backdrop call only happens when both ids were extracted.
    assert_eq!(get("test-api2-backdrop").status, TestStatus::Pass);
    // A 404 on the imdb endpoint matches observed deployments.
    assert_eq!(get("test-api2-imdb").status, TestStatus::Skip);
    assert_eq!(get("test-api2-notifications-mutating").status, TestStatus::Skip);
    assert!(
        get("test-api2-notifications-mutating").errors[0].contains("--api2-device-token")
    );
    assert_eq!(get("test-api2-upload-report").status, TestStatus::Skip);
}
