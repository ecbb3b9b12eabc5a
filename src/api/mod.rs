//! HTTP surface: the GitLab webhook endpoint and a liveness endpoint.

pub mod handlers;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

pub use handlers::root;
pub use webhook::handle_webhook;

pub const WEBHOOK_PATH: &str = "/hook";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route(WEBHOOK_PATH, routing::post(handle_webhook))
        .with_state(state)
}
