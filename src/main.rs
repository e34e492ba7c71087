use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use sentilytics_backend::app;
use sentilytics_backend::logging::{init_logging, LoggingConfig};
use sentilytics_backend::services::{OverviewService, SummarizerService};
use sentilytics_backend::state::AppState;
use sentilytics_backend::store::PgRecordStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgRecordStore::new(pool));
    let state = AppState {
        overview: Arc::new(OverviewService::new(store)),
        summarizer: Arc::new(SummarizerService::from_env()),
    };
    let app = app::create_app(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Sentilytics backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
