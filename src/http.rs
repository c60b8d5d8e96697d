use crate::leaderboard::{self, LeaderboardError, ScoreSubmission};
use axum::{
  extract::rejection::JsonRejection,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post},
  Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
  pub db: SqlitePool,
}

#[derive(Debug, Serialize)]
struct OkResponse {
  ok: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
  error: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
  pub limit: Option<i64>,
  #[serde(rename = "countryCode")]
  pub country_code: Option<String>,
}

pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/scores", post(submit_score))
    .route("/leaderboard", get(get_leaderboard))
    .route("/countries", get(get_countries))
    .layer(cors)
    .with_state(state)
}

async fn health() -> impl IntoResponse {
  Json(OkResponse { ok: true })
}

async fn submit_score(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ScoreSubmission>, JsonRejection>,
) -> impl IntoResponse {
  let Json(submission) = match payload {
    Ok(payload) => payload,
    Err(_) => {
      return (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
          error: "Invalid JSON".to_string(),
        }),
      )
        .into_response();
    }
  };

  match leaderboard::submit_score(&state.db, submission).await {
    Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
    Err(error) => error_response(error),
  }
}

async fn get_leaderboard(
  State(state): State<Arc<AppState>>,
  Query(params): Query<LeaderboardQuery>,
) -> impl IntoResponse {
  match leaderboard::fetch_leaderboard(&state.db, params.limit, params.country_code.as_deref())
    .await
  {
    Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
    Err(error) => error_response(error),
  }
}

async fn get_countries(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  match leaderboard::country_stats(&state.db).await {
    Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
    Err(error) => error_response(error),
  }
}

fn error_response(error: LeaderboardError) -> axum::response::Response {
  match error {
    LeaderboardError::Validation(message) => {
      (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
    }
    LeaderboardError::Internal(error) => {
      tracing::error!(%error, "leaderboard storage failure");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
          error: "Internal server error".to_string(),
        }),
      )
        .into_response()
    }
  }
}
