use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bytestory_common::{
    model::{
        Id,
        auth::AuthToken,
        post::Post,
        user::{CreateUser, User, UserMarker},
    },
    util::PositiveDuration,
};
use bytestory_db::store::SharedStore;
use serde::{Deserialize, Serialize};
use time::{Duration, UtcDateTime};
use tracing::info;

const TOKEN_LIFETIME: Duration = Duration::days(30);

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_user)
        .typed_get(get_user)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/create", rejection(ServerError))]
struct CreateUserPath();

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct CreatedUser {
    user: User,
    token: String,
}

async fn create_user(
    CreateUserPath(): CreateUserPath,
    State(store): State<SharedStore>,
    Json(user): Json<CreateUser>,
) -> Result<Json<CreatedUser>> {
    let user = store.create_user(&user).await?;

    let token = AuthToken::generate_random(user.id);
    let authentication =
        token.authentication(UtcDateTime::now(), PositiveDuration::new(TOKEN_LIFETIME))?;
    store.create_auth(&authentication).await?;

    info!(user_id = %user.id, handle = %user.handle, "Created user");

    Ok(Json(CreatedUser {
        user,
        token: token.as_token_str(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct GetUserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    GetUserPath { id }: GetUserPath,
    State(store): State<SharedStore>,
) -> Result<Json<User>> {
    let user = store
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts", rejection(ServerError))]
struct GetUserPostsPath {
    id: Id<UserMarker>,
}

async fn get_user_posts(
    GetUserPostsPath { id }: GetUserPostsPath,
    State(store): State<SharedStore>,
) -> Result<Json<Vec<Post>>> {
    if store.fetch_user(id).await?.is_none() {
        return Err(ServerError::UserByIdNotFound(id));
    }

    Ok(Json(store.fetch_user_posts(id).await?))
}
