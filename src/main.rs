use gitlab_mr_build_trigger::api::{WEBHOOK_PATH, router};
use gitlab_mr_build_trigger::config::{BridgeConfig, DEFAULT_CONFIG_PATH};
use gitlab_mr_build_trigger::error::Result;
use gitlab_mr_build_trigger::logging::setup_logging;
use gitlab_mr_build_trigger::{AppState, SharedState};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("MR_TRIGGER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match BridgeConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match setup_logging(config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("Using config at {:?}", config_path);
    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: BridgeConfig) -> Result<()> {
    if config.private_token.is_none() {
        warn!("GITLAB_PRIVATE_TOKEN is not set; webhooks must pass ?private_token=");
    }

    let bind_address = config.bind_address();
    info!(
        "Triggering pipelines on {} ({} trigger selection, {}s request timeout)",
        config.base_url,
        config.trigger_selection,
        config.request_timeout.as_secs()
    );

    let state: SharedState = Arc::new(AppState::new(config)?);
    let app = router(state);

    info!("Listening on {} (webhook path {})", bind_address, WEBHOOK_PATH);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
