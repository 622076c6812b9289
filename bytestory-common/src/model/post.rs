use crate::{
    model::{
        Id,
        user::{User, UserHandle, UserMarker},
    },
    util::rfc3339_utc,
};
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 200;
pub const POST_CONTENT_MAX_LEN: usize = 20_000;
pub const POST_MAX_TAGS: usize = 10;
pub const TAG_MAX_LEN: usize = 30;
pub const COMMENT_MAX_LEN: usize = 2_000;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A post together with its reactions and comments.
///
/// Whether the post sits in the recycle bin is derived from `deleted_at`, so a
/// deleted post always knows when it was deleted.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub author_name: UserHandle,
    pub author_image: Option<String>,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub likes: Vec<Id<UserMarker>>,
    pub loves: Vec<Id<UserMarker>>,
    pub comments: Vec<Comment>,
    #[serde(with = "rfc3339_utc")]
    pub created_at: UtcDateTime,
    #[serde(with = "rfc3339_utc::option", default)]
    pub deleted_at: Option<UtcDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post_id: Id<PostMarker>,
    pub author_id: Id<UserMarker>,
    pub author_name: UserHandle,
    pub content: String,
    #[serde(with = "rfc3339_utc")]
    pub created_at: UtcDateTime,
}

/// User supplied fields of a new post.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update of an active post; absent fields stay unchanged.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CommentDraft {
    pub content: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Love,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("Title must be between 1 and 200 characters")]
    Title,
    #[error("Content must be between 1 and 20000 characters")]
    Content,
    #[error("At most 10 tags of 1 to 30 characters are allowed")]
    Tags,
    #[error("Comments must be between 1 and 2000 characters")]
    Comment,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown reaction: {0}")]
pub struct InvalidReactionError(String);

impl Post {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    #[must_use]
    pub fn reactions(&self, reaction: Reaction) -> &[Id<UserMarker>] {
        match reaction {
            Reaction::Like => &self.likes,
            Reaction::Love => &self.loves,
        }
    }

    /// Builds a fresh, active post with the author fields copied from `author`.
    #[must_use]
    pub fn from_draft(
        id: Id<PostMarker>,
        author: &User,
        draft: PostDraft,
        created_at: UtcDateTime,
    ) -> Self {
        Self {
            id,
            author_id: author.id,
            author_name: author.handle.clone(),
            author_image: author.image_url.clone(),
            title: draft.title,
            content: draft.content,
            image_url: draft.image_url,
            tags: draft.tags,
            likes: Vec::new(),
            loves: Vec::new(),
            comments: Vec::new(),
            created_at,
            deleted_at: None,
        }
    }

    pub fn apply(&mut self, update: PostUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(image_url) = update.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
    }
}

impl Serialize for Post {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PostJson<'a> {
            id: Id<PostMarker>,
            author_id: Id<UserMarker>,
            author_name: &'a UserHandle,
            author_image: Option<&'a str>,
            title: &'a str,
            content: &'a str,
            image_url: Option<&'a str>,
            tags: &'a [String],
            likes: &'a [Id<UserMarker>],
            loves: &'a [Id<UserMarker>],
            comments: &'a [Comment],
            #[serde(with = "rfc3339_utc")]
            created_at: UtcDateTime,
            is_deleted: bool,
            #[serde(with = "rfc3339_utc::option")]
            deleted_at: Option<UtcDateTime>,
        }

        PostJson {
            id: self.id,
            author_id: self.author_id,
            author_name: &self.author_name,
            author_image: self.author_image.as_deref(),
            title: &self.title,
            content: &self.content,
            image_url: self.image_url.as_deref(),
            tags: &self.tags,
            likes: &self.likes,
            loves: &self.loves,
            comments: &self.comments,
            created_at: self.created_at,
            is_deleted: self.is_deleted(),
            deleted_at: self.deleted_at,
        }
        .serialize(serializer)
    }
}

fn valid_len(value: &str, max: usize) -> bool {
    !value.trim().is_empty() && value.chars().count() <= max
}

fn validate_title(title: &str) -> Result<(), InvalidPostError> {
    valid_len(title, POST_TITLE_MAX_LEN)
        .then_some(())
        .ok_or(InvalidPostError::Title)
}

fn validate_content(content: &str) -> Result<(), InvalidPostError> {
    valid_len(content, POST_CONTENT_MAX_LEN)
        .then_some(())
        .ok_or(InvalidPostError::Content)
}

fn validate_tags(tags: &[String]) -> Result<(), InvalidPostError> {
    let valid = tags.len() <= POST_MAX_TAGS && tags.iter().all(|tag| valid_len(tag, TAG_MAX_LEN));
    valid.then_some(()).ok_or(InvalidPostError::Tags)
}

impl PostDraft {
    pub fn validate(&self) -> Result<(), InvalidPostError> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        validate_tags(&self.tags)
    }
}

impl PostUpdate {
    pub fn validate(&self) -> Result<(), InvalidPostError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }
}

impl CommentDraft {
    pub fn validate(&self) -> Result<(), InvalidPostError> {
        valid_len(&self.content, COMMENT_MAX_LEN)
            .then_some(())
            .ok_or(InvalidPostError::Comment)
    }
}

impl Reaction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Love => "love",
        }
    }
}

impl Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reaction {
    type Err = InvalidReactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Reaction::Like),
            "love" => Ok(Reaction::Love),
            other => Err(InvalidReactionError(other.to_owned())),
        }
    }
}
