use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::util::ServiceExt;

use biolex_extractor::{AppState, ModelCatalog, router};

const ENTITY_LIST_DE: &str = r#"{
    "metadata": {"name": "Animals (de)", "description": "test list", "date": "2023-05-01"},
    "entity_list": [
        {"name": "Fuchs", "wikidata_id": "Q8331", "category": "animal"},
        {"name": "Dachs", "wikidata_id": "Q26423", "category": "animal"}
    ]
}"#;

fn write_models(root: &Path) {
    let en = root.join("en_core");
    std::fs::create_dir_all(&en).unwrap();
    std::fs::write(
        en.join("lexicon.tsv"),
        "fox\tfox\tn\nplant\tplant\tn\nplant\tplant\tv\nthe\tthe\tx\nthrives\tthrive\tv\n",
    )
    .unwrap();
    std::fs::write(en.join("suffix.rules"), "n\tes\t\nn\ts\t\n").unwrap();

    let de = root.join("de_core");
    std::fs::create_dir_all(&de).unwrap();
    std::fs::write(
        de.join("lexicon.tsv"),
        "Fuchs\tFuchs\tn\nlief\tlaufen\tv\nschlief\tschlafen\tv\nder\tder\tx\n",
    )
    .unwrap();
}

fn make_state() -> (AppState, TempDir) {
    let models = tempfile::tempdir().unwrap();
    write_models(models.path());
    let catalog = Arc::new(ModelCatalog::new(models.path()));
    catalog.preflight().unwrap();
    let state = AppState {
        catalog,
        http: reqwest::Client::new(),
    };
    (state, models)
}

fn post_extractor(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/extractor")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve a fixed response at `/list.json` on an ephemeral port.
async fn spawn_stub(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route("/list.json", get(move || async move { (status, body) }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/list.json")
}

#[tokio::test]
async fn healthz_ok() {
    let (state, _models) = make_state();
    let app = router(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn root_reports_service_identity() {
    let (state, _models) = make_state();
    let app = router(state);
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "biolex-extractor");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn extractor_counts_nouns_from_inline_list() {
    let (state, _models) = make_state();
    let app = router(state);

    let body = format!(
        r#"{{
            "segments": [{{"segment_id": "s1", "text": "Der Fuchs lief. Der Fuchs schlief."}}],
            "language": "de",
            "entity_list": {ENTITY_LIST_DE}
        }}"#
    );
    let response = app.oneshot(post_extractor(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["metadata"]["name"], "Animals (de)");
    let rows = body["entity_list"].as_array().unwrap();
    // Dachs never occurs, so only the fox row survives.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Fuchs");
    assert_eq!(rows[0]["wikidata_id"], "Q8331");
    assert_eq!(rows[0]["segment_frequencies"]["s1"], 2);
    assert_eq!(rows[0]["overall_frequency"], 2);
}

#[tokio::test]
async fn extractor_ignores_verb_readings() {
    let (state, _models) = make_state();
    let app = router(state);

    // "plant" is listed noun-first in the lexicon, so the bare form counts;
    // a vocabulary entry that only ever shows up as a verb would not.
    let body = r#"{
        "segments": [{"segment_id": "s1", "text": "The plant thrives."}],
        "language": "en",
        "entity_list": {
            "metadata": {"name": "Plants (en)", "description": "test", "date": "2023-05-01"},
            "entity_list": [
                {"name": "plant", "wikidata_id": "Q756", "category": "plant"},
                {"name": "thrive", "wikidata_id": "Q0", "category": "plant"}
            ]
        }
    }"#;
    let response = app.oneshot(post_extractor(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rows = body["entity_list"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "plant");
    assert_eq!(rows[0]["overall_frequency"], 1);
}

#[tokio::test]
async fn extractor_rejects_unsupported_language() {
    let (state, _models) = make_state();
    let app = router(state);

    let body = r#"{"segments": [], "language": "fr"}"#;
    let response = app.oneshot(post_extractor(body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn extractor_fetches_remote_entity_list() {
    let (state, _models) = make_state();
    let app = router(state);
    let url = spawn_stub(StatusCode::OK, ENTITY_LIST_DE).await;

    let body = format!(
        r#"{{
            "segments": [{{"segment_id": "s1", "text": "Der Fuchs lief."}}],
            "language": "de",
            "entity_list": {{"url": "{url}"}}
        }}"#
    );
    let response = app.oneshot(post_extractor(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rows = body["entity_list"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["segment_frequencies"]["s1"], 1);
}

#[tokio::test]
async fn remote_failure_maps_to_bad_gateway() {
    let (state, _models) = make_state();
    let app = router(state);
    let url = spawn_stub(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;

    let body = format!(
        r#"{{"segments": [], "language": "de", "entity_list": {{"url": "{url}"}}}}"#
    );
    let response = app.oneshot(post_extractor(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("retrieval")
    );
}

#[tokio::test]
async fn remote_schema_mismatch_maps_to_unprocessable() {
    let (state, _models) = make_state();
    let app = router(state);
    let url = spawn_stub(StatusCode::OK, r#"{"words": ["Fuchs"]}"#).await;

    let body = format!(
        r#"{{"segments": [], "language": "de", "entity_list": {{"url": "{url}"}}}}"#
    );
    let response = app.oneshot(post_extractor(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("schema")
    );
}
