//! News Signals - trading decisions from financial headlines
//!
//! A feed poller turns fresh headlines into trading decisions and posts them
//! to an ingestion endpoint; the service stores them in SQLite and shows them
//! on a dashboard that flags newly arrived records.

pub mod analyst;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod extract;
pub mod poller;
pub mod routes;

/// Install the tracing subscriber shared by all binaries.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_signals=info,poller=info,watch=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
