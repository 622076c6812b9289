use bytestory_common::{
    model::{
        Id, ModelValidationError,
        auth::Authentication,
        post::{Comment, Post, Reaction},
        user::{Role, User, UserHandle},
    },
    util::from_primitive,
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub handle: String,
    pub image_url: Option<String>,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub author_name: String,
    pub author_image: Option<String>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: PrimitiveDateTime,
    pub is_deleted: bool,
    pub deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, FromRow)]
pub(crate) struct ReactionRecord {
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub kind: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.user_snowflake),
            handle: UserHandle::new(value.handle)?,
            image_url: value.image_url,
            role: value.role.parse::<Role>()?,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.comment_snowflake),
            post_id: Id::from_db(value.post_snowflake),
            author_id: Id::from_db(value.user_snowflake),
            author_name: UserHandle::new(value.author_name)?,
            content: value.content,
            created_at: from_primitive(value.created_at),
        })
    }
}

impl PostRecord {
    /// Assembles the post from its row and the reaction and comment rows
    /// belonging to it.
    pub fn into_post(
        self,
        reactions: &[ReactionRecord],
        comments: Vec<Comment>,
    ) -> Result<Post, ModelValidationError> {
        let id = Id::from_db(self.post_snowflake);
        if self.is_deleted != self.deleted_at.is_some() {
            return Err(ModelValidationError::InconsistentDeletion(id));
        }

        let mut likes = Vec::new();
        let mut loves = Vec::new();
        for reaction in reactions {
            match reaction.kind.parse::<Reaction>()? {
                Reaction::Like => likes.push(Id::from_db(reaction.user_snowflake)),
                Reaction::Love => loves.push(Id::from_db(reaction.user_snowflake)),
            }
        }

        Ok(Post {
            id,
            author_id: Id::from_db(self.user_snowflake),
            author_name: UserHandle::new(self.author_name)?,
            author_image: self.author_image,
            title: self.title,
            content: self.content,
            image_url: self.image_url,
            tags: self.tags,
            likes,
            loves,
            comments,
            created_at: from_primitive(self.created_at),
            deleted_at: self.deleted_at.map(from_primitive),
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: from_primitive(value.created_at),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}
