//! Route definitions for script executions.
//!
//! Mounted at `/scripts` by `api_routes()`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// Script routes.
///
/// ```text
/// POST   /                  -> create_script
/// GET    /                  -> list_scripts
/// GET    /{id}              -> get_script
/// DELETE /{id}              -> delete_script
/// POST   /{id}/stop         -> stop_script
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(scripts::create_script).get(scripts::list_scripts),
        )
        .route(
            "/{id}",
            get(scripts::get_script).delete(scripts::delete_script),
        )
        .route("/{id}/stop", post(scripts::stop_script))
}
