use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

mod error;
mod handlers;
mod routes;

pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let body_limit = state.upload_max_bytes;
    Router::new()
        .merge(routes::health())
        .merge(routes::pages())
        .merge(routes::batches())
        .merge(routes::downloads())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
