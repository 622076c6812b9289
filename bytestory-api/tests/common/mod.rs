#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use bytestory_api::server;
use bytestory_common::model::{
    Id,
    auth::AuthToken,
    post::PostMarker,
    user::{CreateUser, Role, User, UserHandle},
};
use bytestory_db::{memory::MemoryStore, store::SharedStore};
use serde_json::{Value, json};
use std::sync::Arc;
use time::UtcDateTime;
use tower::ServiceExt;

pub struct TestApp {
    pub store: SharedStore,
    app: Router,
}

pub struct TestUser {
    pub id: u64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let store: SharedStore = Arc::new(MemoryStore::default());
        let app = server::app(store.clone());

        Self { store, app }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn signup(&self, handle: &str) -> TestUser {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/users/create",
                None,
                Some(json!({ "handle": handle })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        TestUser {
            id: body["user"]["id"].as_u64().unwrap(),
            token: body["token"].as_str().unwrap().to_owned(),
        }
    }

    /// Admins can not be created through the API.
    pub async fn admin(&self, handle: &str) -> TestUser {
        let user: User = self
            .store
            .create_user(&CreateUser {
                handle: UserHandle::new(handle.to_owned()).unwrap(),
                image_url: None,
                role: Role::Admin,
            })
            .await
            .unwrap();
        let token = AuthToken::generate_random(user.id);
        let authentication = token.authentication(UtcDateTime::now(), None).unwrap();
        self.store.create_auth(&authentication).await.unwrap();

        TestUser {
            id: user.id.snowflake().get(),
            token: token.as_token_str(),
        }
    }

    pub async fn create_post(&self, author: &TestUser, title: &str) -> u64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/posts/create",
                Some(&author.token),
                Some(json!({ "title": title, "content": "Some content", "tags": ["rust"] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body["id"].as_u64().unwrap()
    }

    pub async fn delete_post(&self, author: &TestUser, post_id: u64) {
        let (status, body) = self
            .request(
                Method::DELETE,
                &format!("/api/posts/{post_id}"),
                Some(&author.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    /// Puts the post into the recycle bin as if it had been deleted `at`.
    pub async fn delete_post_at(&self, post_id: u64, at: UtcDateTime) {
        let deleted = self
            .store
            .soft_delete_post(Id::<PostMarker>::from(post_id), at)
            .await
            .unwrap();
        assert!(deleted);
    }

    pub async fn recycle_bin(&self, user: &TestUser) -> Vec<Value> {
        let (status, body) = self.get("/api/posts/recycle", Some(&user.token)).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body.as_array().unwrap().clone()
    }

    pub async fn feed(&self) -> Vec<Value> {
        let (status, body) = self.get("/api/posts", None).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        body.as_array().unwrap().clone()
    }
}

pub fn ids(posts: &[Value]) -> Vec<u64> {
    posts.iter().map(|post| post["id"].as_u64().unwrap()).collect()
}
