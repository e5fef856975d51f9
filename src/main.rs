use gabinete::config::Config;
use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::from_optional_toml();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        loglevel = %cfg.basic.loglevel,
        busy_timeout_secs = cfg.storage.busy_timeout_secs,
        max_connections = cfg.storage.max_connections,
        "configuration loaded"
    );

    let db = gabinete::db::spawn_with_options(&cfg.basic.database_url, &cfg.storage).await?;

    for (table, rows) in db.table_counts().await? {
        info!(table, rows, "table ready");
    }

    info!("database initialized");
    Ok(())
}
