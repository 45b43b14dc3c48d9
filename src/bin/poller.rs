use std::sync::Arc;

use tracing::info;

use news_signals::analyst::ClaudeAnalyst;
use news_signals::config::{Config, PollerEnv};
use news_signals::poller::{run_forever, Poller, PollerSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    news_signals::init_tracing();

    let config = Config::load_or_default(Config::path_from_env())?;
    let env = PollerEnv::from_env()?;
    let poller_config = config.poller;

    let analyst = ClaudeAnalyst::new(
        env.anthropic_api_key,
        &poller_config.anthropic_base_url,
        &poller_config.model,
        poller_config.max_tokens,
        poller_config.request_timeout(),
    )?;

    let settings = PollerSettings {
        feed_url: env.feed_url,
        feed_base_url: env.feed_base_url,
        api_endpoint: env.api_endpoint,
        api_key: env.api_key,
        window: poller_config.window(),
        request_timeout: poller_config.request_timeout(),
    };
    info!(
        "Polling every {}s, trailing window {} minutes",
        poller_config.poll_interval_secs, poller_config.window_minutes
    );

    let poller = Poller::new(settings, Arc::new(analyst))?;
    run_forever(poller, poller_config.poll_interval()).await;

    Ok(())
}
