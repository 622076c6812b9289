//! In-memory [`PostStore`].
//!
//! Used when no database is configured, and by the test suites. Everything is
//! lost when the process exits.

use crate::store::{DbError, IdGenerator, PostStore, Result};
use async_trait::async_trait;
use bytestory_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        post::{Comment, CommentDraft, Post, PostDraft, PostMarker, PostUpdate, Reaction},
        user::{CreateUser, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use std::collections::{BTreeMap, HashMap};
use time::UtcDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<Id<UserMarker>, User>,
    authentications: HashMap<AuthTokenHash, Authentication>,
    posts: BTreeMap<Id<PostMarker>, Post>,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    ids: IdGenerator,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            state: RwLock::default(),
            ids: IdGenerator::new(worker_id, process_id),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

fn active_post(
    posts: &mut BTreeMap<Id<PostMarker>, Post>,
    post_id: Id<PostMarker>,
) -> Option<&mut Post> {
    posts.get_mut(&post_id).filter(|post| !post.is_deleted())
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|existing| existing.handle == user.handle) {
            return Err(DbError::UserHandleTaken(user.handle.clone()));
        }

        let created = User {
            id: self.ids.generate()?,
            handle: user.handle.clone(),
            image_url: user.image_url.clone(),
            role: user.role,
        };
        state.users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        self.state
            .write()
            .await
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self
            .state
            .read()
            .await
            .authentications
            .get(token_hash)
            .cloned())
    }

    async fn create_post(
        &self,
        draft: PostDraft,
        author: &User,
        created_at: UtcDateTime,
    ) -> Result<Post> {
        let post = Post::from_draft(self.ids.generate()?, author, draft, created_at);
        self.state.write().await.posts.insert(post.id, post.clone());

        Ok(post)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn fetch_feed(&self) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        Ok(state
            .posts
            .values()
            .rev()
            .filter(|post| !post.is_deleted())
            .cloned()
            .collect())
    }

    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        Ok(state
            .posts
            .values()
            .rev()
            .filter(|post| post.author_id == user_id && !post.is_deleted())
            .cloned()
            .collect())
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: PostUpdate,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        Ok(active_post(&mut state.posts, post_id).map(|post| {
            post.apply(update);
            post.clone()
        }))
    }

    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        reaction: Reaction,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;

        Ok(active_post(&mut state.posts, post_id).map(|post| {
            let reactions = match reaction {
                Reaction::Like => &mut post.likes,
                Reaction::Love => &mut post.loves,
            };
            if let Some(position) = reactions.iter().position(|id| *id == user_id) {
                reactions.remove(position);
            } else {
                reactions.push(user_id);
            }
            post.clone()
        }))
    }

    async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        author: &User,
        draft: CommentDraft,
        created_at: UtcDateTime,
    ) -> Result<Option<Comment>> {
        let mut state = self.state.write().await;
        let Some(post) = active_post(&mut state.posts, post_id) else {
            return Ok(None);
        };

        let comment = Comment {
            id: self.ids.generate()?,
            post_id,
            author_id: author.id,
            author_name: author.handle.clone(),
            content: draft.content,
            created_at,
        };
        post.comments.push(comment.clone());

        Ok(Some(comment))
    }

    async fn soft_delete_post(
        &self,
        post_id: Id<PostMarker>,
        deleted_at: UtcDateTime,
    ) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(active_post(&mut state.posts, post_id)
            .map(|post| post.deleted_at = Some(deleted_at))
            .is_some())
    }

    async fn fetch_deleted_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let state = self.state.read().await;

        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|post| post.author_id == user_id && post.is_deleted())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(b.id.cmp(&a.id)));

        Ok(posts)
    }

    async fn restore_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.write().await;

        Ok(state
            .posts
            .get_mut(&post_id)
            .map(|post| post.deleted_at = None)
            .is_some())
    }

    async fn purge_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut state = self.state.write().await;

        let in_recycle_bin = state.posts.get(&post_id).is_some_and(Post::is_deleted);
        if in_recycle_bin {
            state.posts.remove(&post_id);
        }

        Ok(in_recycle_bin)
    }

    async fn purge_expired_posts(&self, cutoff: UtcDateTime) -> Result<u64> {
        let mut state = self.state.write().await;

        let before = state.posts.len();
        state
            .posts
            .retain(|_, post| post.deleted_at.is_none_or(|deleted_at| deleted_at > cutoff));

        Ok((before - state.posts.len()) as u64)
    }
}
