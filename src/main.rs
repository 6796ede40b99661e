use anyhow::{Context, Result};
use load_shortfall_service::{api, config, telemetry, ShortfallService};
use config::Config;
use telemetry::init_tracing;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(cfg.logging.format, cfg.logging.filter.as_deref());

    let service = match ShortfallService::from_config(&cfg.model) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, path = %cfg.model.artifact_path.display(), "cannot start without a model artifact");
            return Err(e).context("failed to load model artifact");
        }
    };

    let app = api::router(api::AppState::new(service), &cfg.server);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "Server binding to 0.0.0.0 - predictions will be reachable from the network. \
            Bind to 127.0.0.1 unless behind a firewall/reverse proxy."
        );
    }

    info!(%addr, "starting load shortfall prediction service");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}
