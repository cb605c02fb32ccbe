//! crudgen server: reads settings from the environment (and `.env`), checks the database once,
//! then serves the API, management and common routes.
//!
//! Run from repo root: `cargo run -p crudgen-server`

use crudgen::{app, sql::probe, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crudgen=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let state = AppState::from_settings(&settings)?;

    let mut conn = state.db.connect().await?;
    conn.fetch_rows(&probe()).await?;
    conn.close().await?;
    tracing::info!(
        schema = %settings.schema,
        policy_dir = %settings.policy_dir.display(),
        mode = ?settings.mode,
        "database reachable"
    );

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("crudgen listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
