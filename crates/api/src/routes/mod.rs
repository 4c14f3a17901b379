pub mod health;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /scripts                                         script executions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/scripts", scripts::router())
}
