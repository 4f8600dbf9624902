use std::sync::Arc;

use hnb_core::{config::Config, ports::Persistence};
use hnb_sqlite::SqliteStore;
use hnb_upstream::Upstream;

#[tokio::main]
async fn main() -> Result<(), hnb_core::Error> {
    hnb_core::logging::init("hnb")?;

    let cfg = Arc::new(Config::load()?);

    let store = SqliteStore::open(&cfg.database_path).await?;
    tracing::info!(path = %cfg.database_path.display(), "database ready");
    let persistence: Arc<dyn Persistence> = Arc::new(store);

    let upstream = Arc::new(Upstream::new(cfg.endpoints.clone())?);

    hnb_telegram::router::run_polling(cfg, persistence, upstream)
        .await
        .map_err(|e| hnb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
