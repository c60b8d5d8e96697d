use axum::http::{HeaderValue, Method};
use gridsnake::http::{router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let default_path = base.join("data").join("scores.db");
    format!("sqlite://{}", default_path.display())
  });
  ensure_db_dir(&database_url)?;

  let db = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&database_url)
    .await?;
  sqlx::migrate!("./migrations").run(&db).await?;

  let state = Arc::new(AppState { db });
  let app = router(state, cors_layer());

  let port: u16 = env::var("PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(3000);

  let address = format!("0.0.0.0:{port}");
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

fn cors_layer() -> CorsLayer {
  let cors = CorsLayer::new()
    .allow_methods([Method::GET, Method::POST])
    .allow_headers(Any);

  let origins: Vec<HeaderValue> = env::var("CORS_ORIGIN")
    .map(|value| {
      value
        .split(',')
        .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
        .collect()
    })
    .unwrap_or_default();

  if origins.is_empty() {
    cors.allow_origin(Any)
  } else {
    cors.allow_origin(AllowOrigin::list(origins))
  }
}

fn ensure_db_dir(database_url: &str) -> anyhow::Result<()> {
  if database_url.starts_with("sqlite::memory:") {
    return Ok(());
  }
  let path = database_url
    .strip_prefix("sqlite://")
    .or_else(|| database_url.strip_prefix("sqlite:"));
  let Some(path) = path else { return Ok(()) };
  if path.is_empty() || path == ":memory:" {
    return Ok(());
  }
  let db_path = PathBuf::from(path);
  if let Some(parent) = db_path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  if !db_path.exists() {
    std::fs::File::create(&db_path)?;
  }
  Ok(())
}
