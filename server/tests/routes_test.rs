//! Route tests for the record protocol, driven through the router directly.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use mirror_server::{app, config::Config, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn people() -> (Router, AppState) {
    let state = AppState::new(Config::default());
    state
        .store
        .seed(vec![
            json!({"Id": 0, "FirstName": "Antonio", "City": "Varna"})
                .as_object()
                .cloned()
                .unwrap(),
            json!({"Id": 1, "FirstName": "Mihaela", "City": "Ruse"})
                .as_object()
                .cloned()
                .unwrap(),
        ])
        .unwrap();
    (app(state.clone()), state)
}

async fn post(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn health_reports_store_size() {
    let (router, _) = people();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["idAttribute"], "Id");
    assert_eq!(body["records"], 2);
}

#[tokio::test]
async fn read_returns_all_records() {
    let (router, _) = people();

    let (status, body) = post(router, "/read", json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["FirstName"], "Antonio");
}

#[tokio::test]
async fn read_ignores_paging_and_applies_sort() {
    let (router, _) = people();

    let (_, body) = post(
        router,
        "/read",
        json!({"page": 2, "pageSize": 1, "sort": [{"field": "City", "direction": "asc"}]}),
    )
    .await;

    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["City"], "Ruse");
}

#[tokio::test]
async fn read_filters_by_argument() {
    let (router, _) = people();

    let (_, body) = post(router, "/read", json!({"args": [{"City": "Varna"}]})).await;

    assert_eq!(body, json!([{"Id": 0, "FirstName": "Antonio", "City": "Varna"}]));
}

#[tokio::test]
async fn create_assigns_next_identity() {
    let (router, state) = people();

    let (status, body) = post(router, "/create", json!({"Id": 40, "FirstName": "Test"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Id": 2, "FirstName": "Test"}));
    assert_eq!(state.store.len(), 3);
}

#[tokio::test]
async fn create_rejects_non_objects() {
    let (router, _) = people();

    let (status, body) = post(router, "/create", json!([1, 2])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid record");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (router, _) = people();
    let request = Request::builder()
        .method("POST")
        .uri("/create")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn update_replaces_record() {
    let (router, state) = people();

    let (status, body) = post(
        router,
        "/update",
        json!({"Id": 0, "FirstName": "Antonio", "City": "Sofia"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["City"], "Sofia");
    assert_eq!(state.store.get(0).unwrap()["City"], "Sofia");
}

#[tokio::test]
async fn update_unknown_record_is_not_found() {
    let (router, _) = people();

    let (status, body) = post(router, "/update", json!({"Id": 9, "City": "Sofia"})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "record not found: 9");
}

#[tokio::test]
async fn destroy_by_identity_and_by_record() {
    let (router, state) = people();

    let (status, _) = post(router.clone(), "/destroy", json!(1)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(router.clone(), "/destroy", json!({"Id": 0, "FirstName": "Antonio"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.store.is_empty());

    let (status, _) = post(router, "/destroy", json!(0)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn destroy_without_identity_is_a_bad_request() {
    let (router, _) = people();

    let (status, body) = post(router, "/destroy", json!({"FirstName": "Antonio"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "record has no Id field");
}
