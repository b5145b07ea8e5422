pub mod accounts;
pub mod admission;
pub mod api;
pub mod authorization;
pub mod config;
pub mod converter;
pub mod core_state;
pub mod crypto;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod session_cache;
pub mod stock;
pub mod vitals;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// How often idle sessions are swept from the cache.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the ward service and serve until Ctrl-C.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Prontuario starting v{}", config::APP_VERSION);

    let app_config = config::AppConfig::from_env();
    tracing::info!(db = %app_config.db_path.display(), bind = %app_config.bind_addr, "Configuration loaded");
    let bind_addr = app_config.bind_addr;

    let core = Arc::new(core_state::CoreState::new(app_config));
    core.bootstrap()?;

    let server = api::start_server(core.clone(), bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    let sweeper = {
        let core = core.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                match core.write_sessions() {
                    Ok(mut sessions) => {
                        let purged = sessions.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Expired sessions removed");
                        }
                    }
                    Err(e) => tracing::warn!("Session sweep skipped: {e}"),
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    sweeper.abort();
    server.stop().await;

    if let Err(e) = core.flush_and_prune_audit() {
        tracing::warn!("Final audit flush failed: {e}");
    }
    tracing::info!("Prontuario stopped");
    Ok(())
}
