//! End-to-end tests of the viewer routes with in-process retrievers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use gtiff_viewer::app::build_router;
use gtiff_viewer::config::ViewerConfig;
use gtiff_viewer::state::AppState;
use retrieval::{RetrievalError, RetrievalJob, RetrievalResult, Retriever};
use serde_json::{json, Value};
use tempfile::TempDir;
use test_utils::{bbox, create_precipitation_grid, form, write_geotiff, GeoTiffSpec};
use tower::ServiceExt;
use viewer_common::BoundingBox;

// ============================================================================
// Stand-in retrievers
// ============================================================================

/// Writes one GeoTIFF per entry of `bounds` (range mode) or just the first.
struct WritingRetriever {
    bounds: Vec<BoundingBox>,
}

#[async_trait]
impl Retriever for WritingRetriever {
    fn name(&self) -> &str {
        "writing"
    }

    async fn retrieve(&self, job: &RetrievalJob) -> RetrievalResult<String> {
        let stem = job.output_filename.trim_end_matches(".tif");
        let names: Vec<String> = if job.range_mode {
            (1..=self.bounds.len()).map(|h| format!("{}_{}.tif", stem, h)).collect()
        } else {
            vec![job.output_filename.clone()]
        };
        for (name, bounds) in names.iter().zip(&self.bounds) {
            let spec = GeoTiffSpec::new(8, 6, *bounds);
            write_geotiff(&job.workdir.join(name), &spec, &create_precipitation_grid(8, 6, 25.0))
                .map_err(|e| RetrievalError::Workspace(std::io::Error::other(e.to_string())))?;
        }
        Ok(format!("saved {} file(s)", names.len()))
    }
}

struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn retrieve(&self, _job: &RetrievalJob) -> RetrievalResult<String> {
        Err(RetrievalError::Failed {
            status: Some(1),
            stderr: "run 00:00 not available".to_string(),
        })
    }
}

struct HangingRetriever;

#[async_trait]
impl Retriever for HangingRetriever {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn retrieve(&self, _job: &RetrievalJob) -> RetrievalResult<String> {
        std::future::pending().await
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Fixture {
    _root: TempDir,
    state: Arc<AppState>,
    app: Router,
}

fn fixture(retriever: impl Retriever + 'static) -> Fixture {
    fixture_with(retriever, |_| {})
}

fn fixture_with(
    retriever: impl Retriever + 'static,
    configure: impl FnOnce(&mut ViewerConfig),
) -> Fixture {
    let root = TempDir::new().unwrap();
    let mut config = ViewerConfig::with_workspace_root(root.path());
    configure(&mut config);
    let state = Arc::new(AppState::with_retriever(config, Arc::new(retriever), None));
    let app = build_router(state.clone());
    Fixture {
        _root: root,
        state,
        app,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body, content_type)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn retrieve_request(session: &str, form: Value) -> Request<Body> {
    Request::post(format!("/sessions/{}/api/retrieve", session))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn retrieve(app: &Router, session: &str, form: Value) -> (StatusCode, Value) {
    let (status, body, _) = send(app, retrieve_request(session, form)).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn default_form_json() -> Value {
    serde_json::to_value(form::default_form()).unwrap()
}

fn range_form_json() -> Value {
    serde_json::to_value(form::range_form()).unwrap()
}

/// Query string for the range form.
const RANGE_QUERY: &str = "dataset=COSMO-2I&varname=tp&bbox=11.9%2C45%2C13.2%2C46&date=&run=00%3A00&start_fc=1&end_fc=3&fc_range=true";

async fn new_session(fx: &Fixture) -> String {
    fx.state.sessions.create().await.unwrap().id.to_string()
}

fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-6, "{} != {}", actual, expected);
}

// ============================================================================
// Page and sessions
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fx = fixture(FailingRetriever);
    let (status, body) = get_json(&fx.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_root_creates_session_and_serves_page() {
    let fx = fixture(FailingRetriever);
    let response = fx
        .app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("/sessions/"));
    assert_eq!(fx.state.sessions.len().await, 1);

    let (status, body, content_type) =
        send(&fx.app, Request::get(&location).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(String::from_utf8(body).unwrap().contains("GeoTIFF Layers Viewer"));
}

#[tokio::test]
async fn test_root_refuses_sessions_past_the_limit() {
    let fx = fixture_with(FailingRetriever, |config| config.max_sessions = Some(1));
    let root = || Request::get("/").body(Body::empty()).unwrap();

    let (status, _, _) = send(&fx.app, root()).await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (status, body, _) = send(&fx.app, root()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "TooManySessions");
    assert_eq!(fx.state.sessions.len().await, 1);
}

#[tokio::test]
async fn test_unknown_session() {
    let fx = fixture(FailingRetriever);
    let (status, body) = get_json(&fx.app, "/sessions/nope/api/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SessionNotFound");
}

#[tokio::test]
async fn test_form_definitions() {
    let fx = fixture(FailingRetriever);
    let session = new_session(&fx).await;
    let (status, body) = get_json(&fx.app, &format!("/sessions/{}/api/form", session)).await;
    assert_eq!(status, StatusCode::OK);

    let fields = body["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 8);
    assert_eq!(fields[0]["name"], "dataset");
    assert_eq!(fields[0]["value"], "COSMO-2I");
    assert_eq!(fields[7]["kind"], "toggle");
    assert_eq!(body["values"]["bbox"], "11.9,45,13.2,46");
}

#[tokio::test]
async fn test_delete_session_removes_workspace() {
    let fx = fixture(FailingRetriever);
    let session = fx.state.sessions.create().await.unwrap();
    let path = session.workspace.path().to_path_buf();
    assert!(path.is_dir());

    let request = Request::delete(format!("/sessions/{}", session.id))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&fx.app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!path.exists());

    let (status, _) = get_json(&fx.app, &format!("/sessions/{}/api/form", session.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Retrieval then render
// ============================================================================

#[tokio::test]
async fn test_layers_before_retrieval_warns() {
    let fx = fixture(FailingRetriever);
    let session = new_session(&fx).await;
    let (status, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "empty");
    assert_eq!(body["warning"], "No GeoTIFF files found.");
    assert!(body.get("layer").is_none());
}

#[tokio::test]
async fn test_single_retrieval_renders_one_layer() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY],
    });
    let session = new_session(&fx).await;

    let (status, body) = retrieve(&fx.app, &session, default_form_json()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "saved 1 file(s)");
    assert_eq!(body["stem"], "COSMO-2I_tp__00:00_1-None");

    let (status, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "map");
    assert_eq!(body["selector"]["max"], 1);
    assert_eq!(body["map"]["zoom"], 7);
    assert_close(&body["map"]["center"][0], 45.5);
    assert_close(&body["map"]["center"][1], 12.55);
    assert_close(&body["layer"]["opacity"], 0.7);
}

#[tokio::test]
async fn test_missing_form_keys_use_configured_defaults() {
    let fx = fixture_with(
        WritingRetriever {
            bounds: vec![bbox::NORTH_ITALY],
        },
        |config| config.form_defaults.dataset = "ICON-2I".to_string(),
    );
    let session = new_session(&fx).await;

    let (status, body) = retrieve(&fx.app, &session, json!({ "varname": "tp" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stem"], "ICON-2I_tp__00:00_1-None");

    let uri = format!("/sessions/{}/api/layers?varname=tp", session);
    let (status, body) = get_json(&fx.app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stem"], "ICON-2I_tp__00:00_1-None");
    assert_eq!(body["layer"]["name"], "ICON-2I_tp__00:00_1-None.tif");

    let image_url = body["layer"]["image_url"].as_str().unwrap();
    let (status, _, content_type) =
        send(&fx.app, Request::get(image_url).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_range_layers_use_their_own_bounds() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY, bbox::ALPS, bbox::SICILY],
    });
    let session = new_session(&fx).await;
    let (status, _) = retrieve(&fx.app, &session, range_form_json()).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/sessions/{}/api/layers?{}&position=2", session, RANGE_QUERY);
    let (status, body) = get_json(&fx.app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selector"]["min"], 1);
    assert_eq!(body["selector"]["max"], 3);
    assert_eq!(body["selector"]["value"], 2);
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 3);

    // Map stays centered on the first artifact
    assert_close(&body["map"]["center"][0], 45.5);
    // Layer sits on the second artifact's bounds
    let layer = &body["layer"];
    assert_eq!(layer["name"], "COSMO-2I_tp__00:00_1-3_2.tif");
    assert_close(&layer["bounds"][0][0], 45.5);
    assert_close(&layer["bounds"][0][1], 6.0);
    assert_close(&layer["bounds"][1][0], 47.5);
    assert_close(&layer["bounds"][1][1], 10.0);

    // The image URL carries the form so the PNG resolves the same stem
    let image_url = layer["image_url"].as_str().unwrap();
    assert!(!image_url.contains("position="));
    let (status, png, content_type) =
        send(&fx.app, Request::get(image_url).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(&png[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
}

#[tokio::test]
async fn test_position_is_clamped_and_image_position_checked() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY, bbox::ALPS],
    });
    let session = new_session(&fx).await;
    retrieve(&fx.app, &session, range_form_json()).await;

    let uri = format!("/sessions/{}/api/layers?{}&position=9", session, RANGE_QUERY);
    let (_, body) = get_json(&fx.app, &uri).await;
    assert_eq!(body["selector"]["value"], 2);

    let uri = format!("/sessions/{}/api/layers/5/image.png?{}", session, RANGE_QUERY);
    let (status, body) = get_json(&fx.app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PositionOutOfRange");
}

#[tokio::test]
async fn test_retrieval_clears_stale_rasters_only() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY],
    });
    let session = fx.state.sessions.create().await.unwrap();
    let dir = session.workspace.path().to_path_buf();
    std::fs::write(dir.join("ICON_old.tif"), b"stale").unwrap();
    std::fs::write(dir.join("OLD.TIFF"), b"stale").unwrap();
    std::fs::write(dir.join("notes.txt"), b"keep").unwrap();

    let (status, _) = retrieve(&fx.app, &session.id.to_string(), default_form_json()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!dir.join("ICON_old.tif").exists());
    assert!(!dir.join("OLD.TIFF").exists());
    assert!(dir.join("notes.txt").exists());
    assert!(dir.join("COSMO-2I_tp__00:00_1-None.tif").exists());
}

#[tokio::test]
async fn test_files_under_other_stems_are_ignored() {
    let fx = fixture(FailingRetriever);
    let session = fx.state.sessions.create().await.unwrap();
    let spec = GeoTiffSpec::new(4, 4, bbox::ALPS);
    write_geotiff(
        &session.workspace.path().join("ICON-2I_tp__00:00_1-None.tif"),
        &spec,
        &create_precipitation_grid(4, 4, 5.0),
    )
    .unwrap();

    let (_, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", session.id)).await;
    assert_eq!(body["status"], "empty");
}

#[tokio::test]
async fn test_sessions_do_not_share_rasters() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY],
    });
    let first = new_session(&fx).await;
    let second = new_session(&fx).await;
    retrieve(&fx.app, &first, default_form_json()).await;

    let (_, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", first)).await;
    assert_eq!(body["status"], "map");
    let (_, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", second)).await;
    assert_eq!(body["status"], "empty");
}

#[tokio::test]
async fn test_invalid_artifact_is_reported_per_position() {
    let fx = fixture(FailingRetriever);
    let session = fx.state.sessions.create().await.unwrap();
    let dir = session.workspace.path();
    std::fs::write(dir.join("COSMO-2I_tp__00:00_1-3_1.tif"), b"not a tiff").unwrap();
    let spec = GeoTiffSpec::new(4, 4, bbox::SICILY);
    write_geotiff(
        &dir.join("COSMO-2I_tp__00:00_1-3_2.tif"),
        &spec,
        &create_precipitation_grid(4, 4, 5.0),
    )
    .unwrap();

    let uri = format!("/sessions/{}/api/layers?{}&position=1", session.id, RANGE_QUERY);
    let (status, body) = get_json(&fx.app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["layer"].is_null());
    assert_eq!(body["error"]["kind"], "decode");
    assert_eq!(body["artifacts"][0]["error"]["kind"], "decode");
    assert!(body["artifacts"][1]["info"].is_object());
    // Centered on the first valid artifact
    assert_close(&body["map"]["center"][0], 37.5);

    let uri = format!("/sessions/{}/api/layers/1/image.png?{}", session.id, RANGE_QUERY);
    let (status, body) = get_json(&fx.app, &uri).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "InvalidArtifact");

    let uri = format!("/sessions/{}/api/layers?{}&position=2", session.id, RANGE_QUERY);
    let (_, body) = get_json(&fx.app, &uri).await;
    assert!(body["layer"].is_object());
}

// ============================================================================
// Retrieval failures
// ============================================================================

#[tokio::test]
async fn test_failed_retrieval() {
    let fx = fixture(FailingRetriever);
    let session = new_session(&fx).await;

    let (status, body) = retrieve(&fx.app, &session, default_form_json()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RetrievalFailed");
    assert!(body["error"].as_str().unwrap().contains("not available"));

    let (_, status) = get_json(&fx.app, &format!("/sessions/{}/api/status", session)).await;
    assert_eq!(status["retrieval"]["state"], "failed");
    assert_eq!(status["retrieval"]["code"], "RetrievalFailed");
    assert_eq!(status["busy"], false);
}

#[tokio::test]
async fn test_malformed_form_is_rejected() {
    let fx = fixture(WritingRetriever {
        bounds: vec![bbox::NORTH_ITALY],
    });
    let session = new_session(&fx).await;
    let mut form = default_form_json();
    form["bbox"] = json!("north italy");

    let (status, body) = retrieve(&fx.app, &session, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidParameterValue");
}

#[tokio::test]
async fn test_busy_session_and_cancellation() {
    let fx = fixture(HangingRetriever);
    let session = new_session(&fx).await;

    let running = tokio::spawn(
        fx.app
            .clone()
            .oneshot(retrieve_request(&session, default_form_json())),
    );

    let status_uri = format!("/sessions/{}/api/status", session);
    let mut started = false;
    for _ in 0..200 {
        let (_, body) = get_json(&fx.app, &status_uri).await;
        if body["retrieval"]["state"] == "running" {
            assert!(body["elapsed_secs"].is_number());
            started = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(started, "retrieval never reported running");

    let (status, body) = retrieve(&fx.app, &session, default_form_json()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "RetrievalBusy");

    let (status, _) = get_json(&fx.app, &format!("/sessions/{}/api/layers", session)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cancel = Request::post(format!("/sessions/{}/api/cancel", session))
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(&fx.app, cancel).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap()["cancelled"], true);

    let response = running.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "Cancelled");

    let (status, body) = get_json(&fx.app, &format!("/sessions/{}/api/layers", session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "empty");
}
