use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use bytestory_common::model::{
    Id,
    auth::{AuthTokenDecodeError, AuthTokenHashError},
    post::{InvalidPostError, PostMarker},
    user::UserMarker,
};
use bytestory_db::store::{DbError, SharedStore};
use json::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub mod auth;
pub mod json;
pub mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub store: SharedStore,
}

/// The complete application, with every route nested under `/api`.
pub fn app(store: SharedStore) -> Router {
    Router::new()
        .nest("/api", routes::routes())
        .fallback(fallback)
        .with_state(ServerState { store })
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Request contents were invalid: {0}")]
    InvalidInput(#[from] InvalidPostError),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Post with id {0} belongs to another user.")]
    PostNotOwned(Id<PostMarker>),
    #[error("Only admins may access posts of user {0}.")]
    AdminRequired(Id<UserMarker>),
    #[error("Post with id {0} is not in the recycle bin.")]
    PostNotInRecycleBin(Id<PostMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken => StatusCode::UNAUTHORIZED,
            ServerError::PostNotOwned(_) | ServerError::AdminRequired(_) => StatusCode::FORBIDDEN,
            ServerError::PostNotInRecycleBin(_)
            | ServerError::Database(DbError::UserHandleTaken(_)) => StatusCode::CONFLICT,
            ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::InvalidInput(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::ServerError;
    use axum::http::StatusCode;
    use bytestory_common::model::user::UserHandle;
    use bytestory_db::store::DbError;

    #[test]
    fn taken_handles_conflict() {
        let taken = ServerError::Database(DbError::UserHandleTaken(
            UserHandle::new("ada".to_owned()).unwrap(),
        ));

        assert_eq!(taken.status(), StatusCode::CONFLICT);
        assert_eq!(ServerError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::PostNotOwned(1.into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServerError::PostNotInRecycleBin(1.into()).status(),
            StatusCode::CONFLICT
        );
    }
}
