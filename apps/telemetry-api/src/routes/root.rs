use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses((status = 200, description = "Welcome message", body = WelcomeResponse))
)]
pub(crate) async fn welcome(State(state): State<AppState>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!(
            "Welcome to the {}. See {}/openapi.json for the API description.",
            state.config.project_name, state.config.api_prefix
        ),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(welcome))
}
