use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;

use creation_crawler::api::{self, AppState};
use creation_crawler::config::AppConfig;
use creation_crawler::db;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    let db_url = config.database_url.clone().context("DATABASE_URL must be set")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&db_url)
        .await
        .context("failed to connect to the database")?;

    db::init_db(&pool).await?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(pool, config));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}
