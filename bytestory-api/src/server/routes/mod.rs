use crate::server::ServerRouter;
use axum::Router;

mod posts;
mod recycle;
mod users;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(recycle::routes())
        .merge(users::routes())
}
