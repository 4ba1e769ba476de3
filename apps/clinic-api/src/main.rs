use anyhow::{Context, Result};
use clinic_api::config::LogFormat;
use clinic_api::{app, AppConfig, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    info!("Clinic API starting v{}", env!("CARGO_PKG_VERSION"));

    let pool = clinic_db::init_db_pool(&config.db).await?;
    let state = AppState::new(pool, &config);
    let router = app(state, &config);

    info!("Listening on http://{}/api", config.bind_addr);
    axum::Server::bind(&config.bind_addr)
        .serve(router.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
        .context("Server error")?;

    info!("Clinic API stopped");
    Ok(())
}
