mod handlers;
mod routes;

use axum::Router;
use solver_common::config::SolverConfig;
use solver_common::store::RunStore;
use solver_engine::llm::OpenAiGenerator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub config: SolverConfig,
    pub store: RunStore,
    pub generator: OpenAiGenerator,
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Solver API booting...");

    let config = SolverConfig::from_env();

    let store = RunStore::new(&config.runs_dir).expect("Failed to open run store");
    info!("Run store at {}", store.runs_dir().display());

    let generator = OpenAiGenerator::new(config.generator.clone())
        .expect("Failed to create code generator");
    info!("Code generator model: {}", config.generator.model);

    let state = Arc::new(AppState {
        config,
        store,
        generator,
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    // Start server
    let addr = std::env::var("SOLVER_API_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind to address");

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept problems");

    axum::serve(listener, app).await.expect("Server error");
}
