//! Free-text extraction endpoint with a scripted completion model

mod helpers;

use axum::http::StatusCode;
use hamlog_server::services::CompletionModel;
use helpers::{json_request, register_and_login, FakeDirectory, FakeModel, TestApp};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn app_with_model(model: Option<Arc<FakeModel>>) -> (TestApp, String) {
    let model = model.map(|m| m as Arc<dyn CompletionModel>);
    let app = TestApp::with_upstreams(Arc::new(FakeDirectory::default()), model).await;
    let token = register_and_login(&app, "op@example.com").await;
    (app, token)
}

fn parse_request(token: &str, text: &str) -> axum::http::Request<axum::body::Body> {
    json_request("POST", "/parse", Some(token), json!({ "text": text }))
}

#[tokio::test]
async fn test_parse_without_model_is_unavailable() {
    let (app, token) = app_with_model(None).await;

    let (status, body) = app.send(parse_request(&token, "worked W1AW on 20m")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_parse_fenced_reply() {
    let reply = "```json\n{\"call\": \"w1aw\", \"band\": \"20m\", \"mode\": \"ssb\", \
                 \"rst_sent\": 59, \"qso_date\": \"2025-06-15\", \"time_on\": \"14:32\", \
                 \"confidence\": 0.9}\n```";
    let model = Arc::new(FakeModel::replying(reply));
    let (app, token) = app_with_model(Some(model.clone())).await;

    let text = "Worked W1AW on 20m SSB at 1432z, gave 59";
    let (status, body) = app.send(parse_request(&token, text)).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["parsed"]["call"], "W1AW");
    assert_eq!(body["parsed"]["mode"], "SSB");
    assert_eq!(body["parsed"]["rst_sent"], "59");
    assert_eq!(body["parsed"]["qso_date"], "2025-06-15");
    assert_eq!(body["parsed"]["time_on"], "14:32:00");
    assert!(body["parsed"]["freq"].is_null());
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(body["raw_text"], text);

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.last_user_text.lock().unwrap().as_deref(), Some(text));
}

#[tokio::test]
async fn test_parse_clamps_confidence_and_defaults() {
    let model = Arc::new(FakeModel::replying(r#"{"call": "K1ABC", "confidence": 3}"#));
    let (app, token) = app_with_model(Some(model)).await;

    let (status, body) = app.send(parse_request(&token, "K1ABC")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confidence"], 1.0);

    let model = Arc::new(FakeModel::replying(r#"{"call": "K1ABC"}"#));
    let (app, token) = app_with_model(Some(model)).await;

    let (_, body) = app.send(parse_request(&token, "K1ABC")).await;
    assert_eq!(body["confidence"], 0.5);
}

#[tokio::test]
async fn test_parse_malformed_reply_is_bad_gateway() {
    let model = Arc::new(FakeModel::replying("Sure! The callsign is W1AW."));
    let (app, token) = app_with_model(Some(model)).await;

    let (status, body) = app.send(parse_request(&token, "worked W1AW")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("malformed"));
}

#[tokio::test]
async fn test_parse_model_error_is_bad_gateway() {
    let model = Arc::new(FakeModel::failing(529));
    let (app, token) = app_with_model(Some(model)).await;

    let (status, _) = app.send(parse_request(&token, "worked W1AW")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_parse_rejects_blank_and_oversized_text() {
    let model = Arc::new(FakeModel::replying(r#"{"call": "W1AW"}"#));
    let (app, token) = app_with_model(Some(model.clone())).await;

    let (status, _) = app.send(parse_request(&token, "   \n ")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.send(parse_request(&token, &"x".repeat(2001))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.send(parse_request(&token, &"x".repeat(2000))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_parse_requires_token() {
    let model = Arc::new(FakeModel::replying(r#"{"call": "W1AW"}"#));
    let (app, _) = app_with_model(Some(model.clone())).await;

    let (status, _) = app
        .send(json_request("POST", "/parse", None, json!({"text": "W1AW"})))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}
