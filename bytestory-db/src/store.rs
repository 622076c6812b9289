use async_trait::async_trait;
use bytestory_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication},
        post::{Comment, CommentDraft, Post, PostDraft, PostMarker, PostUpdate, Reaction},
        user::{CreateUser, User, UserHandle, UserMarker},
    },
    snowflake::{ProcessId, SnowflakeError, SnowflakeGenerator, WorkerId},
};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use time::UtcDateTime;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

pub type SharedStore = Arc<dyn PostStore>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("Could not generate an id: {0}")]
    IdGeneration(#[from] SnowflakeError),
    #[error("The handle {0} is already taken")]
    UserHandleTaken(UserHandle),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Snowflake source shared by all writes of one store.
#[derive(Debug)]
pub struct IdGenerator(Mutex<SnowflakeGenerator>);

impl IdGenerator {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self(Mutex::new(SnowflakeGenerator::new(worker_id, process_id)))
    }

    pub fn generate<Marker>(&self) -> Result<Id<Marker>> {
        let snowflake = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()?;

        Ok(snowflake.into())
    }
}

/// Persistence for users, sessions and posts.
///
/// Every post lifecycle transition is a single conditional write, so
/// concurrent callers never observe `is_deleted` and `deleted_at` out of sync.
/// Queries named "active" never return posts that sit in the recycle bin.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_user(&self, user: &CreateUser) -> Result<User>;

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>>;

    async fn create_auth(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn create_post(
        &self,
        draft: PostDraft,
        author: &User,
        created_at: UtcDateTime,
    ) -> Result<Post>;

    /// Fetches a post regardless of its lifecycle state.
    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>>;

    /// All active posts, newest first.
    async fn fetch_feed(&self) -> Result<Vec<Post>>;

    /// Active posts of one author, newest first.
    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>>;

    /// Returns `None` if the post does not exist or is deleted.
    async fn update_post(&self, post_id: Id<PostMarker>, update: PostUpdate)
    -> Result<Option<Post>>;

    /// Adds the reaction if `user_id` has not given it yet, removes it
    /// otherwise. Returns `None` if the post does not exist or is deleted.
    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        reaction: Reaction,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Post>>;

    /// Returns `None` if the post does not exist or is deleted.
    async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        author: &User,
        draft: CommentDraft,
        created_at: UtcDateTime,
    ) -> Result<Option<Comment>>;

    /// Moves an active post into the recycle bin. Returns whether the post
    /// was active before.
    async fn soft_delete_post(&self, post_id: Id<PostMarker>, deleted_at: UtcDateTime)
    -> Result<bool>;

    /// Posts of one author in the recycle bin, most recently deleted first.
    async fn fetch_deleted_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>>;

    /// Makes the post active again. Returns whether the post exists.
    async fn restore_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    /// Permanently removes a post that is in the recycle bin, together with
    /// its comments and reactions. Returns whether a post was removed.
    async fn purge_post(&self, post_id: Id<PostMarker>) -> Result<bool>;

    /// Permanently removes every post deleted at or before `cutoff`.
    async fn purge_expired_posts(&self, cutoff: UtcDateTime) -> Result<u64>;
}
