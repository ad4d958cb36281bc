use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iconograph::browser::WebDriverBrowser;
use iconograph::config::Config;
use iconograph::llm::LLM;
use iconograph::models::AppState;
use iconograph::routes::create_router;
use iconograph::stats::{spawn_daily_report, StatsStorage, StatsTracker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iconograph=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // Text generation provider
    let llm = LLM::from_config(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to configure LLM provider: {e}"))?;
    info!(provider = llm.provider_name(), model = %config.llm.model, "Text generation provider ready");

    // Browser automation endpoint for image lookups
    let browser = WebDriverBrowser::new(&config.browser);

    // Durable query stats
    let storage = match &config.stats.data_dir {
        Some(dir) => StatsStorage::with_path(dir.into()),
        None => StatsStorage::new(),
    };
    let stats = StatsTracker::with_storage(storage).await;

    // Daily top-queries report
    spawn_daily_report(stats.clone());

    // Create shared state
    let state = AppState {
        config: config.clone(),
        llm: Arc::new(llm),
        browser: Arc::new(browser),
        stats,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
