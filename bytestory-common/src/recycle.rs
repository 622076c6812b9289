//! Retention policy for soft-deleted posts.
//!
//! A deleted post stays in its author's recycle bin for [`RETENTION_DAYS`]
//! days. The remaining time is computed whenever the bin is read; once it
//! reaches zero the post is shown as expired until it is purged.

use crate::model::post::Post;
use serde::{Deserialize, Serialize};
use time::{Duration, UtcDateTime};

pub const RETENTION_DAYS: i64 = 7;
/// Posts with at most this many days left are about to expire.
pub const EXPIRING_SOON_DAYS: i64 = 3;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryTier {
    Safe,
    ExpiringSoon,
    Expired,
}

impl ExpiryTier {
    #[must_use]
    pub fn from_days_left(days_left: i64) -> Self {
        if days_left > EXPIRING_SOON_DAYS {
            ExpiryTier::Safe
        } else if days_left > 0 {
            ExpiryTier::ExpiringSoon
        } else {
            ExpiryTier::Expired
        }
    }
}

/// Whole days elapsed between `since` and `now`, rounded down.
#[must_use]
pub fn days_since(since: UtcDateTime, now: UtcDateTime) -> i64 {
    (now - since).whole_seconds().div_euclid(SECONDS_PER_DAY)
}

#[must_use]
pub fn days_left(deleted_at: UtcDateTime, now: UtcDateTime) -> i64 {
    RETENTION_DAYS - days_since(deleted_at, now)
}

/// Posts deleted at or before the returned instant have expired.
#[must_use]
pub fn expiry_cutoff(now: UtcDateTime) -> UtcDateTime {
    now - Duration::days(RETENTION_DAYS)
}

/// A recycle bin entry.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecycledPost {
    #[serde(flatten)]
    pub post: Post,
    pub days_left: i64,
    pub tier: ExpiryTier,
}

impl RecycledPost {
    /// Returns `None` for posts that are not in the recycle bin.
    #[must_use]
    pub fn new(post: Post, now: UtcDateTime) -> Option<Self> {
        let days_left = days_left(post.deleted_at?, now);

        Some(Self {
            post,
            days_left,
            tier: ExpiryTier::from_days_left(days_left),
        })
    }
}
