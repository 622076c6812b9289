//! Recycle bin routes.
//!
//! Soft-deleted posts stay here until their owner restores or purges them.
//! Admins may act on every user's recycle bin; everyone else only on their
//! own.

use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Empty, Json},
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use bytestory_common::{
    model::{
        Id,
        post::{Post, PostMarker},
        user::{User, UserMarker},
    },
    recycle::RecycledPost,
};
use bytestory_db::store::SharedStore;
use serde::Deserialize;
use time::UtcDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_recycle_bin)
        .typed_post(restore_post)
        .typed_delete(purge_post)
}

/// Fetches a post in any state, as long as `user` may manage it.
async fn managed_post(store: &SharedStore, id: Id<PostMarker>, user: &User) -> Result<Post> {
    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !user.can_manage_posts_of(post.author_id) {
        return Err(ServerError::PostNotOwned(id));
    }

    Ok(post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/recycle", rejection(ServerError))]
struct RecycleBinPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct RecycleBinQuery {
    user: Option<Id<UserMarker>>,
}

async fn get_recycle_bin(
    RecycleBinPath(): RecycleBinPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<RecycleBinQuery>,
) -> Result<Json<Vec<RecycledPost>>> {
    let owner = query.user.unwrap_or(user.id);
    if !user.can_manage_posts_of(owner) {
        return Err(ServerError::AdminRequired(owner));
    }

    let now = UtcDateTime::now();
    let posts = store
        .fetch_deleted_posts(owner)
        .await?
        .into_iter()
        .filter_map(|post| RecycledPost::new(post, now))
        .collect();

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/recycle/{id}", rejection(ServerError))]
struct RecycledPostPath {
    id: Id<PostMarker>,
}

/// Makes the post active again. Restoring an active post changes nothing.
async fn restore_post(
    RecycledPostPath { id }: RecycledPostPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Post>> {
    let post = managed_post(&store, id, &user).await?;

    if !post.is_deleted() {
        debug!(post_id = %id, "Post is already active");
        return Ok(Json(post));
    }

    if !store.restore_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }
    info!(post_id = %id, user_id = %user.id, "Restored post");

    let post = store
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

/// Permanently removes a post from the recycle bin.
async fn purge_post(
    RecycledPostPath { id }: RecycledPostPath,
    State(store): State<SharedStore>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Empty>> {
    let post = managed_post(&store, id, &user).await?;

    // A concurrent restore can take the post out of the bin between the two calls.
    if !post.is_deleted() || !store.purge_post(id).await? {
        return Err(ServerError::PostNotInRecycleBin(id));
    }
    info!(post_id = %id, user_id = %user.id, "Purged post");

    Ok(Json(Empty {}))
}
