use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptd_api::config::ServerConfig;
use scriptd_api::router::build_app_router;
use scriptd_api::state::AppState;
use scriptd_core::scripting::config::ExecutionConfig;
use scriptd_core::scripting::memory_store::MemoryScriptStore;
use scriptd_core::scripting::orchestrator::ExecutionOrchestrator;
use scriptd_core::scripting::registry::ProcessRegistry;
use scriptd_core::scripting::store::ScriptStore;
use scriptd_db::repositories::ScriptRepo;
use scriptd_db::PgScriptStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let execution = ExecutionConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "scriptd_api=debug,scriptd_core=debug,scriptd_db=debug,tower_http=debug".into()
    });
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        shell = %execution.shell.display(),
        script_dir = %execution.script_dir.display(),
        batch_size = execution.batch_size,
        "Loaded execution configuration"
    );

    // --- Store ---
    let store: Arc<dyn ScriptStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = scriptd_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            scriptd_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            scriptd_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            let reset = ScriptRepo::reset_running(&pool)
                .await
                .expect("Failed to reset stale running scripts");
            if reset > 0 {
                tracing::warn!(
                    count = reset,
                    "Marked scripts left running by a previous instance as stopped"
                );
            }

            Arc::new(PgScriptStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; scripts are kept in memory and lost on restart");
            Arc::new(MemoryScriptStore::new())
        }
    };

    // --- Orchestrator ---
    let orchestrator = Arc::new(ExecutionOrchestrator::new(
        store,
        Arc::new(ProcessRegistry::new()),
        execution,
    ));

    // --- App state ---
    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping running scripts");

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, orchestrator.shutdown())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Timed out stopping running scripts"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
