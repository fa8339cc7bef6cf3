//! Cinema booker server binary
//!
//! Reads configuration from a TOML file
//! (`~/.config/cinema-booker/config.toml`, or `$CINEMA_BOOKER_CONFIG`).

use tracing::{error, info};

use cinema_booker::config::{config_path_from_env, AppConfig};
use cinema_booker::server::{init_tracing, ServerHandle, ServerOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = config_path_from_env();
    let loaded = AppConfig::load(&config_path);
    let app_cfg = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => {
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            cfg
        }
    };

    init_tracing(&app_cfg);
    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => error!("Failed to load config: {}. Using defaults.", e),
    }

    let handle = match ServerHandle::start(ServerOptions {
        config: app_cfg,
        auto_migrate: true,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e);
        }
    };

    handle.install_signal_handler();
    handle.wait().await;
    Ok(())
}
