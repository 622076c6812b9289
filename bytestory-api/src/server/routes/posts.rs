use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bytestory_common::model::{
    Id,
    post::{Comment, CommentDraft, Post, PostDraft, PostMarker, PostUpdate, Reaction},
    user::User,
};
use bytestory_db::store::SharedStore;
use serde::Deserialize;
use time::UtcDateTime;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_feed)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
        .typed_post(toggle_like)
        .typed_post(toggle_love)
        .typed_post(add_comment)
}

/// Fetches a post that is visible outside the recycle bin.
async fn active_post(store: &SharedStore, id: Id<PostMarker>) -> Result<Post> {
    store
        .fetch_post(id)
        .await?
        .filter(|post| !post.is_deleted())
        .ok_or(ServerError::PostByIdNotFound(id))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct FeedPath();

async fn get_feed(
    FeedPath(): FeedPath,
    State(store): State<SharedStore>,
) -> Result<Json<Vec<Post>>> {
    Ok(Json(store.fetch_feed().await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>> {
    draft.validate()?;
    let post = store.create_post(draft, &user, UtcDateTime::now()).await?;

    info!(post_id = %post.id, user_id = %user.id, "Created post");

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(store): State<SharedStore>,
) -> Result<Json<Post>> {
    Ok(Json(active_post(&store, id).await?))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(update): Json<PostUpdate>,
) -> Result<Json<Post>> {
    update.validate()?;

    let post = active_post(&store, id).await?;
    if post.author_id != user.id {
        return Err(ServerError::PostNotOwned(id));
    }

    let post = store
        .update_post(id, update)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

/// Moves the post into its author's recycle bin.
async fn delete_post(
    PostPath { id }: PostPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Post>> {
    let post = active_post(&store, id).await?;
    if !user.can_manage_posts_of(post.author_id) {
        return Err(ServerError::PostNotOwned(id));
    }

    if !store.soft_delete_post(id, UtcDateTime::now()).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }
    info!(post_id = %id, user_id = %user.id, "Moved post to recycle bin");

    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/likes", rejection(ServerError))]
struct LikesPath {
    id: Id<PostMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/loves", rejection(ServerError))]
struct LovesPath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    LikesPath { id }: LikesPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Post>> {
    toggle_reaction(&store, id, Reaction::Like, &user).await
}

async fn toggle_love(
    LovesPath { id }: LovesPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Post>> {
    toggle_reaction(&store, id, Reaction::Love, &user).await
}

async fn toggle_reaction(
    store: &SharedStore,
    id: Id<PostMarker>,
    reaction: Reaction,
    user: &User,
) -> Result<Json<Post>> {
    let post = store
        .toggle_reaction(id, reaction, user.id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

async fn add_comment(
    CommentsPath { id }: CommentsPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(draft): Json<CommentDraft>,
) -> Result<Json<Comment>> {
    draft.validate()?;

    let comment = store
        .add_comment(id, &user, draft, UtcDateTime::now())
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(comment))
}
