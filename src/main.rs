use std::sync::Arc;

use tracing::info;

use news_signals::config::{Config, ServiceEnv};
use news_signals::db::Database;
use news_signals::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_signals::init_tracing();

    // Load configuration
    let config = Config::load_or_default(Config::path_from_env())?;
    let env = ServiceEnv::from_env()?;

    // Initialize database
    let database_url = env
        .database_url
        .clone()
        .unwrap_or_else(|| config.server.database_url.clone());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    info!("Database initialized ({} records)", db.count().await?);

    let state = Arc::new(AppState {
        db: Arc::new(db),
        api_key: env.api_key,
        dashboard_refresh_secs: config.server.refresh_secs(),
    });

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!("Server starting on http://{}", config.server.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
