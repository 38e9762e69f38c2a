use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use notare_api::auth::{AppState, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notare=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("NOTARE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("NOTARE_DB_PATH").unwrap_or_else(|_| "notare.db".into());
    let upload_dir = std::env::var("NOTARE_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("NOTARE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("NOTARE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and upload storage
    let db = notare_db::Database::open(&PathBuf::from(&db_path))?;
    let upload_dir = PathBuf::from(upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;
    info!("Upload directory: {}", upload_dir.display());

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        upload_dir,
    });

    let app = notare_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Notare server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
