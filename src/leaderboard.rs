use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub const MAX_PLAYER_NAME_LENGTH: usize = 50;
pub const MAX_SCORE: i64 = 1_000_000;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Failures surfaced by the ranking service. Validation failures carry a
/// message for the caller and persist nothing; internal failures are
/// persistence-layer errors passed through unchanged, never retried here.
#[derive(Debug)]
pub enum LeaderboardError {
  Validation(String),
  Internal(sqlx::Error),
}

impl std::fmt::Display for LeaderboardError {
  fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      LeaderboardError::Validation(message) => write!(formatter, "{message}"),
      LeaderboardError::Internal(error) => write!(formatter, "storage failure: {error}"),
    }
  }
}

impl std::error::Error for LeaderboardError {}

impl From<sqlx::Error> for LeaderboardError {
  fn from(error: sqlx::Error) -> Self {
    LeaderboardError::Internal(error)
  }
}

#[derive(Debug, Deserialize)]
pub struct ScoreSubmission {
  #[serde(rename = "playerName")]
  pub player_name: Option<String>,
  pub score: Option<i64>,
  #[serde(rename = "countryCode")]
  pub country_code: Option<String>,
}

/// A persisted score. Immutable once written; a player may submit any number
/// of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "playerName")]
  pub player_name: String,
  pub score: i64,
  #[serde(rename = "countryCode")]
  pub country_code: String,
  #[serde(rename = "createdAt")]
  pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedScore {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "playerName")]
  pub player_name: String,
  pub score: i64,
  #[serde(rename = "countryCode")]
  pub country_code: String,
  #[serde(rename = "createdAt")]
  pub created_at: i64,
  pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryStats {
  pub country_code: String,
  pub total_games: i64,
  pub highest_score: i64,
  pub average_score: i64,
}

/// Validate and persist a submission. Returns the stored record with its
/// server-assigned id and creation timestamp.
pub async fn submit_score(
  db: &SqlitePool,
  submission: ScoreSubmission,
) -> Result<ScoreRecord, LeaderboardError> {
  submit_score_at(db, submission, current_time_millis()).await
}

async fn submit_score_at(
  db: &SqlitePool,
  submission: ScoreSubmission,
  created_at: i64,
) -> Result<ScoreRecord, LeaderboardError> {
  let (player_name, score, country_code) = validate_submission(submission)?;

  let record = ScoreRecord {
    id: Uuid::new_v4().to_string(),
    player_name,
    score,
    country_code,
    created_at,
  };

  sqlx::query(
    "INSERT INTO scores (id, player_name, score, country_code, created_at) VALUES (?, ?, ?, ?, ?)",
  )
  .bind(&record.id)
  .bind(&record.player_name)
  .bind(record.score)
  .bind(&record.country_code)
  .bind(record.created_at)
  .execute(db)
  .await?;

  tracing::debug!(
    player = %record.player_name,
    score = record.score,
    country = %record.country_code,
    "score stored"
  );
  Ok(record)
}

fn validate_submission(
  submission: ScoreSubmission,
) -> Result<(String, i64, String), LeaderboardError> {
  let Some(player_name) = submission.player_name else {
    return Err(LeaderboardError::Validation("Missing required fields".to_string()));
  };
  let Some(score) = submission.score else {
    return Err(LeaderboardError::Validation("Missing required fields".to_string()));
  };
  let Some(country_code) = submission.country_code else {
    return Err(LeaderboardError::Validation("Missing required fields".to_string()));
  };

  let player_name = player_name.trim().to_string();
  if player_name.is_empty() {
    return Err(LeaderboardError::Validation("Player name must not be empty".to_string()));
  }
  if player_name.chars().count() > MAX_PLAYER_NAME_LENGTH {
    return Err(LeaderboardError::Validation(format!(
      "Player name must be at most {MAX_PLAYER_NAME_LENGTH} characters"
    )));
  }

  if score < 0 || score > MAX_SCORE {
    return Err(LeaderboardError::Validation("Score out of range".to_string()));
  }

  let country_code = country_code.trim();
  if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
    return Err(LeaderboardError::Validation(
      "Country code must be exactly 2 letters".to_string(),
    ));
  }

  Ok((player_name, score, country_code.to_ascii_uppercase()))
}

/// Top-N ranked view over all stored scores, optionally filtered by country.
/// Ordered by score descending; equal scores rank the earlier submission
/// first. Rank is 1-based within the returned ordering. Pure read.
pub async fn fetch_leaderboard(
  db: &SqlitePool,
  limit: Option<i64>,
  country_code: Option<&str>,
) -> Result<Vec<RankedScore>, LeaderboardError> {
  let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

  let rows = match country_code {
    Some(code) => {
      sqlx::query(
        "SELECT id, player_name, score, country_code, created_at FROM scores \
         WHERE country_code = ? ORDER BY score DESC, created_at ASC LIMIT ?",
      )
      .bind(code.trim().to_ascii_uppercase())
      .bind(limit)
      .fetch_all(db)
      .await?
    }
    None => {
      sqlx::query(
        "SELECT id, player_name, score, country_code, created_at FROM scores \
         ORDER BY score DESC, created_at ASC LIMIT ?",
      )
      .bind(limit)
      .fetch_all(db)
      .await?
    }
  };

  let entries = rows
    .into_iter()
    .enumerate()
    .filter_map(|(index, row)| {
      Some(RankedScore {
        id: row.try_get("id").ok()?,
        player_name: row.try_get("player_name").ok()?,
        score: row.try_get("score").ok()?,
        country_code: row.try_get("country_code").ok()?,
        created_at: row.try_get("created_at").ok()?,
        rank: index as i64 + 1,
      })
    })
    .collect();

  Ok(entries)
}

/// Per-country aggregates over every stored score, ordered by highest score
/// descending; countries tied on highest score are ordered by code ascending.
/// Average is rounded to the nearest integer.
pub async fn country_stats(db: &SqlitePool) -> Result<Vec<CountryStats>, LeaderboardError> {
  let rows = sqlx::query(
    "SELECT country_code, COUNT(*) AS total_games, MAX(score) AS highest_score, \
     CAST(ROUND(AVG(score)) AS INTEGER) AS average_score \
     FROM scores GROUP BY country_code \
     ORDER BY highest_score DESC, country_code ASC",
  )
  .fetch_all(db)
  .await?;

  let stats = rows
    .into_iter()
    .filter_map(|row| {
      Some(CountryStats {
        country_code: row.try_get("country_code").ok()?,
        total_games: row.try_get("total_games").ok()?,
        highest_score: row.try_get("highest_score").ok()?,
        average_score: row.try_get("average_score").ok()?,
      })
    })
    .collect();

  Ok(stats)
}

fn current_time_millis() -> i64 {
  use std::time::{SystemTime, UNIX_EPOCH};
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}

#[cfg(test)]
mod tests {
  use super::*;
  use sqlx::sqlite::SqlitePoolOptions;

  async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
      .max_connections(1)
      .connect("sqlite::memory:")
      .await
      .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .expect("migrations apply");
    pool
  }

  fn submission(name: &str, score: i64, country: &str) -> ScoreSubmission {
    ScoreSubmission {
      player_name: Some(name.to_string()),
      score: Some(score),
      country_code: Some(country.to_string()),
    }
  }

  async fn count_rows(db: &SqlitePool) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM scores")
      .fetch_one(db)
      .await
      .expect("count query")
      .try_get("n")
      .expect("count column")
  }

  async fn seed_example_scores(db: &SqlitePool) {
    submit_score_at(db, submission("A", 50, "US"), 1_000).await.expect("A");
    submit_score_at(db, submission("B", 80, "US"), 2_000).await.expect("B");
    submit_score_at(db, submission("C", 80, "FR"), 3_000).await.expect("C");
  }

  #[tokio::test]
  async fn submitted_record_round_trips_with_normalized_country() {
    let db = test_pool().await;
    let record = submit_score(&db, submission("  Ada  ", 12, "tr")).await.expect("stored");

    assert_eq!(record.player_name, "Ada");
    assert_eq!(record.score, 12);
    assert_eq!(record.country_code, "TR");

    let entries = fetch_leaderboard(&db, None, None).await.expect("read");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, record.id);
    assert_eq!(entries[0].rank, 1);
  }

  #[tokio::test]
  async fn ranking_orders_by_score_then_earlier_submission() {
    let db = test_pool().await;
    seed_example_scores(&db).await;

    let entries = fetch_leaderboard(&db, Some(10), None).await.expect("read");
    let names: Vec<&str> = entries.iter().map(|e| e.player_name.as_str()).collect();
    let ranks: Vec<i64> = entries.iter().map(|e| e.rank).collect();

    assert_eq!(names, vec!["B", "C", "A"]);
    assert_eq!(ranks, vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn ranking_is_idempotent_without_new_submissions() {
    let db = test_pool().await;
    seed_example_scores(&db).await;

    let first = fetch_leaderboard(&db, Some(10), None).await.expect("read");
    let second = fetch_leaderboard(&db, Some(10), None).await.expect("read");

    let project = |entries: &[RankedScore]| {
      entries
        .iter()
        .map(|e| (e.id.clone(), e.rank))
        .collect::<Vec<_>>()
    };
    assert_eq!(project(&first), project(&second));
  }

  #[tokio::test]
  async fn country_filter_ranks_within_the_filtered_set() {
    let db = test_pool().await;
    seed_example_scores(&db).await;

    let entries = fetch_leaderboard(&db, Some(10), Some("us")).await.expect("read");
    let names: Vec<&str> = entries.iter().map(|e| e.player_name.as_str()).collect();

    assert_eq!(names, vec!["B", "A"]);
    assert_eq!(entries[1].rank, 2);
  }

  #[tokio::test]
  async fn limit_defaults_to_twenty_and_clamps_to_one_hundred() {
    let db = test_pool().await;
    for index in 0..30 {
      submit_score_at(&db, submission(&format!("p{index}"), index, "US"), index)
        .await
        .expect("stored");
    }

    let defaulted = fetch_leaderboard(&db, None, None).await.expect("read");
    assert_eq!(defaulted.len(), DEFAULT_LIMIT as usize);

    let clamped = fetch_leaderboard(&db, Some(10_000), None).await.expect("read");
    assert_eq!(clamped.len(), 30);

    let floor = fetch_leaderboard(&db, Some(-5), None).await.expect("read");
    assert_eq!(floor.len(), 1);
  }

  #[tokio::test]
  async fn country_stats_aggregate_and_order_by_highest_score() {
    let db = test_pool().await;
    seed_example_scores(&db).await;

    let stats = country_stats(&db).await.expect("stats");
    assert_eq!(
      stats,
      vec![
        CountryStats {
          country_code: "FR".to_string(),
          total_games: 1,
          highest_score: 80,
          average_score: 80,
        },
        CountryStats {
          country_code: "US".to_string(),
          total_games: 2,
          highest_score: 80,
          average_score: 65,
        },
      ]
    );
  }

  #[tokio::test]
  async fn missing_fields_fail_validation_and_persist_nothing() {
    let db = test_pool().await;
    let cases = [
      ScoreSubmission {
        player_name: None,
        score: Some(10),
        country_code: Some("US".to_string()),
      },
      ScoreSubmission {
        player_name: Some("A".to_string()),
        score: None,
        country_code: Some("US".to_string()),
      },
      ScoreSubmission {
        player_name: Some("A".to_string()),
        score: Some(10),
        country_code: None,
      },
    ];
    for case in cases {
      let result = submit_score(&db, case).await;
      assert!(matches!(result, Err(LeaderboardError::Validation(_))));
    }
    assert_eq!(count_rows(&db).await, 0);
  }

  #[tokio::test]
  async fn malformed_fields_fail_validation_and_persist_nothing() {
    let db = test_pool().await;
    let cases = [
      submission("", 10, "US"),
      submission("   ", 10, "US"),
      submission(&"x".repeat(MAX_PLAYER_NAME_LENGTH + 1), 10, "US"),
      submission("A", -1, "US"),
      submission("A", MAX_SCORE + 1, "US"),
      submission("A", 10, "USA"),
      submission("A", 10, "U"),
      submission("A", 10, "1F"),
    ];
    for case in cases {
      let result = submit_score(&db, case).await;
      assert!(matches!(result, Err(LeaderboardError::Validation(_))));
    }
    assert_eq!(count_rows(&db).await, 0);
  }

  #[tokio::test]
  async fn zero_score_is_a_valid_submission() {
    let db = test_pool().await;
    let record = submit_score(&db, submission("A", 0, "US")).await.expect("stored");
    assert_eq!(record.score, 0);
    assert_eq!(count_rows(&db).await, 1);
  }

  #[tokio::test]
  async fn name_at_exact_limit_is_accepted() {
    let db = test_pool().await;
    let name = "x".repeat(MAX_PLAYER_NAME_LENGTH);
    let record = submit_score(&db, submission(&name, 1, "US")).await.expect("stored");
    assert_eq!(record.player_name.chars().count(), MAX_PLAYER_NAME_LENGTH);
  }
}
