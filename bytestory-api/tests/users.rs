mod common;

use axum::http::{Method, StatusCode};
use bytestory_common::model::auth::{AUTH_TOKEN_CORE_LEN, AUTH_TOKEN_SALT_LEN, AuthToken};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn signup_issues_a_working_token() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;

    assert!(ada.token.starts_with(&format!("{}:", ada.id)));

    let (status, body) = app.get(&format!("/api/users/{}", ada.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handle"], "ada");
    assert_eq!(body["role"], "member");

    app.create_post(&ada, "Token works").await;
}

#[tokio::test]
async fn handles_are_unique() {
    let app = TestApp::new();
    app.signup("ada").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/users/create",
            None,
            Some(json!({ "handle": "ada" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn invalid_handles_are_rejected() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/users/create",
            None,
            Some(json!({ "handle": "has space" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_can_not_grant_admin() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/users/create",
            None,
            Some(json!({ "handle": "sneaky", "role": "admin" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "member");
}

#[tokio::test]
async fn unknown_users_are_not_found() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/users/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/users/4242/posts", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let forged = AuthToken {
        user_id: ada.id.into(),
        core: [0; AUTH_TOKEN_CORE_LEN],
        salt: [0; AUTH_TOKEN_SALT_LEN],
    }
    .as_token_str();

    let (status, _) = app.get("/api/posts/recycle", Some(&forged)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
