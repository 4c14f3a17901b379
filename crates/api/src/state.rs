use std::sync::Arc;

use scriptd_core::scripting::orchestrator::ExecutionOrchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Script execution orchestrator (owns the store and process registry).
    pub orchestrator: Arc<ExecutionOrchestrator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
