use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use bytestory_common::model::{auth::AuthToken, user::User};
use bytestory_db::store::SharedStore;
use headers::{Authorization, authorization::Bearer};
use time::UtcDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The user behind the bearer token of the request.
///
/// Rejects requests without a token, with a token that is unknown or expired,
/// or whose user no longer exists.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    SharedStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;
        let store = SharedStore::from_ref(state);

        let authentication = store
            .fetch_auth(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.is_expired_at(UtcDateTime::now()) {
            debug!(user_id = %authentication.user, "Rejecting expired token");
            return Err(ServerError::InvalidToken);
        }

        let user = store
            .fetch_user(authentication.user)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        Ok(Self(user))
    }
}
