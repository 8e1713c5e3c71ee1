use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn pages() -> Router<AppState> {
    Router::new().route("/", get(handlers::index))
}

pub fn batches() -> Router<AppState> {
    Router::new().route("/process", post(handlers::process_batch))
}

pub fn downloads() -> Router<AppState> {
    Router::new().route("/download/:filename", get(handlers::download))
}
