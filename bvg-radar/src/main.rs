use tracing_subscriber::EnvFilter;

use bvg_radar::bvg::{BvgClient, Stop, StopsQuery};
use bvg_radar::config::AppConfig;
use bvg_radar::poller::Poller;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the environment's default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = BvgClient::new(config.bvg_config()).expect("Failed to create BVG client");

    // Fail fast if the API is unreachable
    match client.get_stops(&StopsQuery::all()).await {
        Ok(Some(body)) => match serde_json::from_value::<Vec<Stop>>(body) {
            Ok(stops) => tracing::info!(count = stops.len(), "loaded stops"),
            Err(e) => tracing::warn!(error = %e, "unexpected stop list payload"),
        },
        Ok(None) => tracing::warn!("stop list unavailable, polling anyway"),
        Err(e) => {
            tracing::error!(error = %e, "BVG API unreachable");
            std::process::exit(1);
        }
    }

    tracing::info!(
        environment = ?config.environment,
        bbox = ?config.bbox,
        interval_secs = config.poll_interval_secs,
        "starting radar poller"
    );

    let poller = Poller::new(client, config.bbox, config.poll_interval());
    poller.run().await;
}
