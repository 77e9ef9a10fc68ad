use tracing_subscriber::EnvFilter;

use courtbook::app;
use courtbook::config::AppConfig;
use courtbook::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    tracing::info!(
        database = %config.database_url,
        slot_price = config.slot_price,
        offset = %config.reporting_offset(),
        "booking store ready"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let router = app::router(app::build_state(config, conn));

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
