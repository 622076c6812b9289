mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ids};
use serde_json::{Value, json};

#[tokio::test]
async fn created_posts_carry_author_details() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let post = app.create_post(&ada, "Hello").await;

    let (status, body) = app.get(&format!("/api/posts/{post}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorId"], ada.id);
    assert_eq!(body["authorName"], "ada");
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["tags"], json!(["rust"]));
    assert_eq!(body["isDeleted"], false);
    assert_eq!(body["deletedAt"], Value::Null);
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn feed_is_newest_first() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let first = app.create_post(&ada, "First").await;
    let second = app.create_post(&bob, "Second").await;
    let third = app.create_post(&ada, "Third").await;

    assert_eq!(ids(&app.feed().await), vec![third, second, first]);

    let (status, body) = app.get(&format!("/api/users/{}/posts", ada.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(body.as_array().unwrap()), vec![third, first]);
}

#[tokio::test]
async fn creating_posts_requires_authentication() {
    let app = TestApp::new();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/posts/create",
            None,
            Some(json!({ "title": "Hi", "content": "There" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_posts_are_rejected() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/posts/create",
            Some(&ada.token),
            Some(json!({ "title": "   ", "content": "There" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/posts/create",
            Some(&ada.token),
            Some(json!({ "content": "No title" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.feed().await.is_empty());
}

#[tokio::test]
async fn owners_update_their_posts() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let post = app.create_post(&ada, "Draft").await;
    let uri = format!("/api/posts/{post}");

    let (status, body) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&ada.token),
            Some(json!({ "title": "Final" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Final");
    assert_eq!(body["content"], "Some content");

    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&bob.token),
            Some(json!({ "title": "Stolen" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleted_posts_are_hidden() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let post = app.create_post(&ada, "Hidden").await;
    let uri = format!("/api/posts/{post}");

    let (status, body) = app
        .request(Method::DELETE, &uri, Some(&ada.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isDeleted"], true);
    assert!(body["deletedAt"].is_string());

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&ada.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(
            Method::PATCH,
            &uri,
            Some(&ada.token),
            Some(json!({ "title": "Edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(
            Method::POST,
            &format!("{uri}/likes"),
            Some(&ada.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(
            Method::POST,
            &format!("{uri}/comments"),
            Some(&ada.token),
            Some(json!({ "content": "Anyone?" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&format!("/api/users/{}/posts", ada.id), None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_owners_delete_posts() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let root = app.admin("root").await;
    let post = app.create_post(&ada, "Mine").await;
    let uri = format!("/api/posts/{post}");

    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::DELETE, &uri, Some(&root.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&app.recycle_bin(&ada).await), vec![post]);
}

#[tokio::test]
async fn reactions_toggle() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let post = app.create_post(&ada, "Likeable").await;
    let likes = format!("/api/posts/{post}/likes");
    let loves = format!("/api/posts/{post}/loves");

    let (status, body) = app
        .request(Method::POST, &likes, Some(&bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], json!([bob.id]));
    assert_eq!(body["loves"], json!([]));

    let (_, body) = app
        .request(Method::POST, &loves, Some(&bob.token), None)
        .await;
    assert_eq!(body["loves"], json!([bob.id]));

    let (_, body) = app
        .request(Method::POST, &likes, Some(&bob.token), None)
        .await;
    assert_eq!(body["likes"], json!([]));
    assert_eq!(body["loves"], json!([bob.id]));
}

#[tokio::test]
async fn comments_are_attached_to_posts() {
    let app = TestApp::new();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let post = app.create_post(&ada, "Discuss").await;

    let (status, comment) = app
        .request(
            Method::POST,
            &format!("/api/posts/{post}/comments"),
            Some(&bob.token),
            Some(json!({ "content": "Nice post" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["postId"], post);
    assert_eq!(comment["authorName"], "bob");

    let (_, body) = app.get(&format!("/api/posts/{post}"), None).await;
    assert_eq!(body["comments"][0]["content"], "Nice post");

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/posts/{post}/comments"),
            Some(&bob.token),
            Some(json!({ "content": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/nothing/here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, _) = app.get("/api/posts/not-a-number", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
