pub mod auth;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        post::{InvalidPostError, InvalidReactionError},
        user::{InvalidRoleError, InvalidUserHandleError},
    },
    snowflake::Snowflake,
    util::NonPositiveDurationError,
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    UserHandle(#[from] InvalidUserHandleError),
    #[error(transparent)]
    Role(#[from] InvalidRoleError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    Post(#[from] InvalidPostError),
    #[error(transparent)]
    Reaction(#[from] InvalidReactionError),
    #[error("Post {0} has is_deleted and deleted_at out of sync")]
    InconsistentDeletion(Id<post::PostMarker>),
}

/// Typed snowflake id. The marker only exists at the type level, so ids of
/// different entities can not be mixed up.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(Snowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: Snowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> Snowflake {
        self.0
    }

    /// Representation used for `BIGINT` columns.
    #[must_use]
    pub fn to_db(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        value.cast_unsigned().into()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<Snowflake> for Id<Marker> {
    fn from(value: Snowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for Snowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(Snowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Id, post::PostMarker};

    #[test]
    fn db_representation_round_trips_high_bit() {
        let id = Id::<PostMarker>::from(u64::MAX - 5);

        assert_eq!(id.to_db(), -6);
        assert_eq!(Id::<PostMarker>::from_db(id.to_db()), id);
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let id = Id::<PostMarker>::from(1_234_567);

        assert_eq!(serde_json::to_string(&id).unwrap(), "1234567");
        assert_eq!(serde_json::from_str::<Id<PostMarker>>("1234567").unwrap(), id);
    }
}
