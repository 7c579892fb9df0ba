// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod common;

use std::sync::Arc;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use common::{bearer, state, test_app, token, FakeMailClient};

#[actix_web::test]
async fn test_add_then_remove_account() {
    let mail = Arc::new(FakeMailClient::default());
    let state = state(mail.clone());
    let token = token(&state);
    let app = test::init_service(test_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&token))
        .set_json(json!({
            "host": "imap.example.com",
            "port": 993,
            "user": "a@example.com",
            "secret": "x"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let raw = test::read_body(resp).await;
    let body: Value = serde_json::from_slice(&raw).unwrap();
    let id = body["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(body["imap_host"], "imap.example.com");
    assert_eq!(body["imap_port"], 993);
    assert_eq!(body["username"], "a@example.com");
    assert!(body.get("secret").is_none());
    assert!(!String::from_utf8_lossy(&raw).contains("secret"));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/accounts/{}", id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], id.as_str());

    let req = test::TestRequest::get()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["accounts"], json!([]));

    assert_eq!(mail.calls(), 0);
}

#[actix_web::test]
async fn test_listing_and_fetching_never_returns_secret() {
    let mail = Arc::new(FakeMailClient::default());
    let state = state(mail);
    let token = token(&state);
    let account = common::add_account(&state).await;
    let app = test::init_service(test_app(state)).await;

    for uri in ["/api/v1/accounts".to_string(), format!("/api/v1/accounts/{}", account.id)] {
        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let raw = test::read_body(resp).await;
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("imap.example.com"));
        assert!(!text.contains("secret"), "{} leaked a secret: {}", uri, text);
    }
}

#[actix_web::test]
async fn test_missing_fields_are_validation_errors() {
    let state = state(Arc::new(FakeMailClient::default()));
    let token = token(&state);
    let app = test::init_service(test_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&token))
        .set_json(json!({ "label": "Work" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["details"]["validation_errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    for field in ["imap_host", "imap_port", "username", "secret"] {
        assert!(fields.contains(&field), "missing {} in {:?}", field, fields);
    }
}

#[actix_web::test]
async fn test_malformed_account_fields_rejected() {
    let state = state(Arc::new(FakeMailClient::default()));
    let token = token(&state);
    let app = test::init_service(test_app(state)).await;

    for payload in [
        json!({ "imap_host": "imap.example.com", "imap_port": 0, "username": "a", "secret": "x" }),
        json!({ "imap_host": "imap.example.com", "imap_port": 993, "smtp_port": 587, "username": "a", "secret": "x" }),
        json!({ "imap_host": "not a host", "imap_port": 993, "username": "a", "secret": "x" }),
        json!({ "imap_host": "imap.example.com", "imap_port": 993, "username": "   ", "secret": "x" }),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/accounts")
            .insert_header(bearer(&token))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "accepted {}", payload);
    }
}

#[actix_web::test]
async fn test_remove_unknown_account_is_not_found() {
    let state = state(Arc::new(FakeMailClient::default()));
    let token = token(&state);
    let app = test::init_service(test_app(state)).await;

    let req = test::TestRequest::delete()
        .uri("/api/v1/accounts/does-not-exist")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn test_update_account() {
    let state = state(Arc::new(FakeMailClient::default()));
    let token = token(&state);
    let account = common::add_account(&state).await;
    let app = test::init_service(test_app(state.clone())).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/accounts/{}", account.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "label": "Work", "secret": "rotated" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["label"], "Work");
    assert_eq!(body["id"], account.id.as_str());
    assert!(body.get("secret").is_none());

    let stored = state.accounts.get(&account.id).await.unwrap();
    assert_eq!(stored.secret.expose(), "rotated");
}

#[actix_web::test]
async fn test_malformed_json_body() {
    let state = state(Arc::new(FakeMailClient::default()));
    let token = token(&state);
    let app = test::init_service(test_app(state)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&token))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
