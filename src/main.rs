//! Multimodal PD Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server, wiring config, shared state, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pd_multimodal_analyzer::api::{create_router, AppState};
use pd_multimodal_analyzer::config::{self, ConfigHandle, FusionConfig};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ANALYSIS_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ANALYSIS_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("analysis=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // FUSION_CONFIG_PATH / FUSION_HOT_RELOAD from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // --- Initialize fusion config (fail closed on invalid file) ---
    let cfg = FusionConfig::load_default().expect("Failed to load fusion config");
    let handle = ConfigHandle::new(cfg);

    // If hot reload is enabled, spawn background watcher
    config::start_hot_reload_thread(handle.clone(), config::config_path());

    // Build AppState and pass it into the router
    let router = create_router(AppState::new(handle));

    Ok(router.into())
}
