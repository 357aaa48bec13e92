pub mod electrical;
pub mod health;
mod historical;
pub mod ingest;
pub mod physical;
pub mod root;

use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let data = Router::new()
        .merge(electrical::router())
        .merge(physical::router())
        .merge(ingest::router())
        .merge(crate::openapi::router());

    let prefix = state.config.api_prefix.clone();
    let app = Router::new().merge(root::router()).merge(health::router());
    // axum refuses to nest at the root, so an empty prefix merges instead.
    let app = if prefix.is_empty() {
        app.merge(data)
    } else {
        app.nest(&prefix, data)
    };
    app.with_state(state)
}
