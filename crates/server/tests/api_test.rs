//! HTTP API tests against an in-process (local mode) deployment.

use actix_web::{test, web, App};
use reco_engine::{Hyperparams, InteractionQueue, LocalCoordinator, Model};
use reco_server::{routes, ApiKeyAuth, AppState, Coordinator};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_state(dir: &tempfile::TempDir) -> web::Data<AppState> {
    let model = Model::new(Hyperparams {
        factors: 8,
        learning_rate: 0.1,
        regularization: 0.02,
        seed: 1,
    });
    let coordinator = Coordinator::Local(Arc::new(LocalCoordinator::new(
        model,
        dir.path().join("model.snapshot"),
    )));
    // never connected in these tests; the async ingest path needs live Redis
    let queue = InteractionQueue::new("redis://127.0.0.1:6379", "reco:test:interactions")
        .expect("valid redis url");
    web::Data::new(AppState::with_coordinator(coordinator, queue))
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data($state.clone())
                .route("/health", web::get().to(routes::health))
                .service(web::scope("/v1").configure(routes::configure)),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
}

#[actix_rt::test]
async fn test_recommend_unknown_user_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 999, "top_n": 5}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["user_id"], 999);
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_interact_then_recommend() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/interact")
        .set_json(json!({
            "user_id": 101,
            "item_id": 201,
            "like": true,
            "watch_time": 600.0,
            "duration": 600.0
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["applied"], 1);
    let score = body["results"][0]["score"].as_f64().unwrap();
    assert!((score - 1.0).abs() < 1e-6);

    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 101, "top_n": 5}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let recs = body["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["item_id"], 201);
}

#[actix_rt::test]
async fn test_interact_batch_and_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/interact")
        .set_json(json!([
            {"user_id": 101, "item_id": 201, "watch_time": 600.0, "duration": 600.0},
            {"user_id": 101, "item_id": 202, "watch_time": 300.0, "duration": 600.0}
        ]))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["applied"], 2);

    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 101, "top_n": 5, "exclude": [201, 202]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_interact_rejects_invalid_payload() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/v1/interact")
        .set_json(json!({"user_id": 1, "item_id": 2, "watch_time": -5.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_invalid_batch_applies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    // the second interaction is invalid; the first must not be applied
    let req = test::TestRequest::post()
        .uri("/v1/interact")
        .set_json(json!([
            {"user_id": 101, "item_id": 201, "watch_time": 600.0, "duration": 600.0},
            {"user_id": 101, "item_id": 202, "watch_time": -5.0}
        ]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 101, "top_n": 5}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
}

#[actix_rt::test]
async fn test_missing_api_key_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let auth = ApiKeyAuth::new("redis://127.0.0.1:6379", "reco:test:api_key:")
        .expect("valid redis url");
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(web::scope("/v1").wrap(auth).configure(routes::configure)),
    )
    .await;

    // rejected before any Redis lookup happens
    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_disabled_api_key_auth_passes_through() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .service(
                web::scope("/v1")
                    .wrap(ApiKeyAuth::disabled())
                    .configure(routes::configure),
            ),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/recommend")
        .set_json(json!({"user_id": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
}

#[actix_rt::test]
async fn test_admin_reset_completes() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post().uri("/v1/admin/reset").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "completed");
}
