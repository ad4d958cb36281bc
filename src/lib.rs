// Iconograph - AI agent service surveying historical artwork depicting biblical narratives

pub mod agents;
pub mod browser;
pub mod config;
pub mod llm;
pub mod models;
pub mod routes;
pub mod stats;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
