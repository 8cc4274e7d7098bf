use std::sync::Arc;

use chanrelay_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), chanrelay_core::Error> {
    let cfg = Arc::new(Config::load()?);
    chanrelay_core::logging::init("chanrelay", cfg.log_file.as_deref())?;

    tracing::info!("bot starting, token: set");
    if cfg.super_admins.is_empty() {
        tracing::warn!("SUPER_ADMIN_LIST is empty; nobody can add admins");
    } else {
        tracing::info!("super admins: {}", cfg.super_admins.join(", "));
    }
    tracing::info!(
        transform_mode = ?cfg.transform_mode,
        delivery_timeout_ms = cfg.delivery_timeout.as_millis() as u64,
        "initial status: running"
    );

    chanrelay_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| chanrelay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
