use crate::{
    record::{AuthenticationRecord, CommentRecord, PostRecord, ReactionRecord, UserRecord},
    store::{DbError, IdGenerator, PostStore, Result},
};
use async_trait::async_trait;
use bytestory_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        post::{
            Comment, CommentDraft, CommentMarker, Post, PostDraft, PostMarker, PostUpdate, Reaction,
        },
        user::{CreateUser, User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
    util::to_primitive,
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use std::collections::HashMap;
use time::UtcDateTime;
use tracing::debug;

/// PostgreSQL backed [`PostStore`].
pub struct DbClient {
    pool: PgPool,
    ids: IdGenerator,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            ids: IdGenerator::new(worker_id, process_id),
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool, worker_id, process_id))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        debug!("Database migrations applied");

        Ok(())
    }

    /// Attaches reactions and comments to the given post rows, keeping their
    /// order.
    async fn hydrate(&self, records: Vec<PostRecord>) -> Result<Vec<Post>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let post_snowflakes: Vec<i64> = records.iter().map(|record| record.post_snowflake).collect();

        let reaction_records = query_as::<_, ReactionRecord>(
            "
            SELECT
                reactions.post_snowflake,
                reactions.user_snowflake,
                reactions.kind
            FROM
                posts.reactions
            WHERE
                reactions.post_snowflake = ANY($1)
            ORDER BY
                reactions.user_snowflake
            ",
        )
        .bind(&post_snowflakes[..])
        .fetch_all(&self.pool)
        .await?;

        let comment_records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.user_snowflake,
                comments.author_name,
                comments.content,
                comments.created_at
            FROM
                posts.comments
            WHERE
                comments.post_snowflake = ANY($1)
            ORDER BY
                comments.comment_snowflake
            ",
        )
        .bind(&post_snowflakes[..])
        .fetch_all(&self.pool)
        .await?;

        let mut reactions: HashMap<i64, Vec<ReactionRecord>> = HashMap::new();
        for record in reaction_records {
            reactions.entry(record.post_snowflake).or_default().push(record);
        }
        let mut comments: HashMap<i64, Vec<Comment>> = HashMap::new();
        for record in comment_records {
            comments
                .entry(record.post_snowflake)
                .or_default()
                .push(Comment::try_from(record)?);
        }

        records
            .into_iter()
            .map(|record| {
                let post_reactions = reactions.remove(&record.post_snowflake).unwrap_or_default();
                let post_comments = comments.remove(&record.post_snowflake).unwrap_or_default();
                record
                    .into_post(&post_reactions, post_comments)
                    .map_err(DbError::from)
            })
            .collect()
    }

    async fn fetch_post_records(
        &self,
        filter: &'static str,
        snowflake: Option<i64>,
    ) -> Result<Vec<PostRecord>> {
        let sql = format!(
            "
            SELECT
                posts.post_snowflake,
                posts.user_snowflake,
                posts.author_name,
                posts.author_image,
                posts.title,
                posts.content,
                posts.image_url,
                posts.tags,
                posts.created_at,
                posts.is_deleted,
                posts.deleted_at
            FROM
                posts.posts
            {filter}
            "
        );

        let mut records_query = query_as::<_, PostRecord>(&sql);
        if let Some(snowflake) = snowflake {
            records_query = records_query.bind(snowflake);
        }

        let records = records_query.fetch_all(&self.pool).await?;
        Ok(records)
    }

    async fn is_active(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let active = query_scalar::<_, bool>(
            "
            SELECT NOT posts.is_deleted
            FROM posts.posts
            WHERE posts.post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(active == Some(true))
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let user_id: Id<UserMarker> = self.ids.generate()?;

        let record = query_as::<_, UserRecord>(
            "
            INSERT INTO users.users (user_snowflake, handle, image_url, role)
            VALUES ($1, $2, $3, $4)
            RETURNING
                users.user_snowflake,
                users.handle,
                users.image_url,
                users.role
            ",
        )
        .bind(user_id.to_db())
        .bind(user.handle.get())
        .bind(user.image_url.as_deref())
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                DbError::UserHandleTaken(user.handle.clone())
            }
            err => DbError::from(err),
        })?;

        Ok(User::try_from(record)?)
    }

    async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_snowflake,
                users.handle,
                users.image_url,
                users.role
            FROM
                users.users
            WHERE
                users.user_snowflake = $1
            ",
        )
        .bind(user_id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO users.authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.to_db())
        .bind(to_primitive(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_snowflake,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                users.authentications
            WHERE
                authentications.token_hash = $1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    async fn create_post(
        &self,
        draft: PostDraft,
        author: &User,
        created_at: UtcDateTime,
    ) -> Result<Post> {
        let post = Post::from_draft(self.ids.generate()?, author, draft, created_at);

        query(
            "
            INSERT INTO posts.posts (
                post_snowflake, user_snowflake, author_name, author_image,
                title, content, image_url, tags, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(post.id.to_db())
        .bind(post.author_id.to_db())
        .bind(post.author_name.get())
        .bind(post.author_image.as_deref())
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.image_url.as_deref())
        .bind(&post.tags[..])
        .bind(to_primitive(post.created_at))
        .execute(&self.pool)
        .await?;

        Ok(post)
    }

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let records = self
            .fetch_post_records("WHERE posts.post_snowflake = $1", Some(post_id.to_db()))
            .await?;

        Ok(self.hydrate(records).await?.pop())
    }

    async fn fetch_feed(&self) -> Result<Vec<Post>> {
        let records = self
            .fetch_post_records(
                "WHERE NOT posts.is_deleted ORDER BY posts.post_snowflake DESC",
                None,
            )
            .await?;

        self.hydrate(records).await
    }

    async fn fetch_user_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = self
            .fetch_post_records(
                "WHERE posts.user_snowflake = $1 AND NOT posts.is_deleted
                ORDER BY posts.post_snowflake DESC",
                Some(user_id.to_db()),
            )
            .await?;

        self.hydrate(records).await
    }

    async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        update: PostUpdate,
    ) -> Result<Option<Post>> {
        let updated = query(
            "
            UPDATE posts.posts
            SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                image_url = COALESCE($4, image_url),
                tags = COALESCE($5, tags)
            WHERE
                post_snowflake = $1 AND NOT is_deleted
            ",
        )
        .bind(post_id.to_db())
        .bind(update.title)
        .bind(update.content)
        .bind(update.image_url)
        .bind(update.tags)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(None);
        }
        self.fetch_post(post_id).await
    }

    async fn toggle_reaction(
        &self,
        post_id: Id<PostMarker>,
        reaction: Reaction,
        user_id: Id<UserMarker>,
    ) -> Result<Option<Post>> {
        if !self.is_active(post_id).await? {
            return Ok(None);
        }

        let removed = query(
            "
            DELETE FROM posts.reactions
            WHERE post_snowflake = $1 AND user_snowflake = $2 AND kind = $3
            ",
        )
        .bind(post_id.to_db())
        .bind(user_id.to_db())
        .bind(reaction.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if removed == 0 {
            query(
                "
                INSERT INTO posts.reactions (post_snowflake, user_snowflake, kind)
                SELECT $1, $2, $3
                WHERE EXISTS (
                    SELECT 1 FROM posts.posts
                    WHERE post_snowflake = $1 AND NOT is_deleted
                )
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(post_id.to_db())
            .bind(user_id.to_db())
            .bind(reaction.as_str())
            .execute(&self.pool)
            .await?;
        }

        self.fetch_post(post_id).await
    }

    async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        author: &User,
        draft: CommentDraft,
        created_at: UtcDateTime,
    ) -> Result<Option<Comment>> {
        let comment_id: Id<CommentMarker> = self.ids.generate()?;

        let record = query_as::<_, CommentRecord>(
            "
            INSERT INTO posts.comments (
                comment_snowflake, post_snowflake, user_snowflake,
                author_name, content, created_at
            )
            SELECT $1, $2, $3, $4, $5, $6
            WHERE EXISTS (
                SELECT 1 FROM posts.posts
                WHERE post_snowflake = $2 AND NOT is_deleted
            )
            RETURNING
                comments.comment_snowflake,
                comments.post_snowflake,
                comments.user_snowflake,
                comments.author_name,
                comments.content,
                comments.created_at
            ",
        )
        .bind(comment_id.to_db())
        .bind(post_id.to_db())
        .bind(author.id.to_db())
        .bind(author.handle.get())
        .bind(draft.content)
        .bind(to_primitive(created_at))
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    async fn soft_delete_post(
        &self,
        post_id: Id<PostMarker>,
        deleted_at: UtcDateTime,
    ) -> Result<bool> {
        let deleted = query(
            "
            UPDATE posts.posts
            SET is_deleted = TRUE, deleted_at = $2
            WHERE post_snowflake = $1 AND NOT is_deleted
            ",
        )
        .bind(post_id.to_db())
        .bind(to_primitive(deleted_at))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted > 0)
    }

    async fn fetch_deleted_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let records = self
            .fetch_post_records(
                "WHERE posts.user_snowflake = $1 AND posts.is_deleted
                ORDER BY posts.deleted_at DESC, posts.post_snowflake DESC",
                Some(user_id.to_db()),
            )
            .await?;

        self.hydrate(records).await
    }

    async fn restore_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let restored = query(
            "
            UPDATE posts.posts
            SET is_deleted = FALSE, deleted_at = NULL
            WHERE post_snowflake = $1
            ",
        )
        .bind(post_id.to_db())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(restored > 0)
    }

    async fn purge_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let purged = query(
            "
            DELETE FROM posts.posts
            WHERE post_snowflake = $1 AND is_deleted
            ",
        )
        .bind(post_id.to_db())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(purged > 0)
    }

    async fn purge_expired_posts(&self, cutoff: UtcDateTime) -> Result<u64> {
        let purged = query(
            "
            DELETE FROM posts.posts
            WHERE is_deleted AND deleted_at <= $1
            ",
        )
        .bind(to_primitive(cutoff))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(purged)
    }
}
