//! Terminal dashboard: prints the news log and flags new arrivals.

use std::sync::Arc;

use news_signals::config::{Config, DashboardEnv};
use news_signals::dashboard::watch;
use news_signals::db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_signals::init_tracing();

    let config = Config::load_or_default(Config::path_from_env())?;
    let database_url = DashboardEnv::from_env()
        .database_url
        .unwrap_or_else(|| config.server.database_url.clone());

    let db = Database::new(&database_url).await?;
    db.initialize().await?;

    watch(Arc::new(db), config.server.dashboard_refresh(), |tick, cursor| {
        if tick.new_content {
            println!("*** New articles have been added! ***");
        }
        println!("== News Service ({} records, cursor {}) ==", tick.records.len(), cursor.get());
        for record in &tick.records {
            println!("{}", record.title);
            println!("  Published: {}", record.published);
            println!("  Trading Decision: {}", record.trading_decision);
        }
        println!();
    })
    .await;

    Ok(())
}
