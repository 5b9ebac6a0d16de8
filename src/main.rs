use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use quiz_backend::{
    config::{get_config, init_config, LogFormat},
    database::{pool::create_pool, InMemoryStorage, PgStorage, TestStorage},
    routes, AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let storage: Arc<dyn TestStorage> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using PostgreSQL storage");
            Arc::new(PgStorage::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, tests are kept in memory only");
            Arc::new(InMemoryStorage::default())
        }
    };

    let app_state = AppState::new(storage, config);

    let app = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(DefaultBodyLimit::max(config.max_body_bytes));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
