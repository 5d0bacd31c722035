//! Tetris highscore lookup.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::info;

use crate::common::error::ScoresError;

/// Best score of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highscore {
    pub name: String,
    pub score: i64,
}

impl Highscore {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

/// Source of leaderboard rows.
#[async_trait]
pub trait ScoresStore: Send + Sync {
    /// Best score per player, highest first, at most `limit` rows.
    async fn top_scores(&self, limit: u32) -> Result<Vec<Highscore>, ScoresError>;
}

const TOP_SCORES_SQL: &str =
    "SELECT MAX(score) AS highscore, name FROM highscore GROUP BY name ORDER BY highscore DESC LIMIT ?";

/// Scores store backed by the tetris MySQL database.
#[derive(Debug, Clone)]
pub struct SqlScoresStore {
    pool: MySqlPool,
}

impl SqlScoresStore {
    /// Connection acquire timeout.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

    /// Create the pool without connecting; the first query opens a connection.
    pub fn connect_lazy(url: &str) -> Result<Self, ScoresError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Self::IDLE_TIMEOUT)
            .test_before_acquire(true)
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    async fn query(&self, limit: u32) -> Result<Vec<Highscore>, sqlx::Error> {
        let rows: Vec<(i64, String)> = sqlx::query_as(TOP_SCORES_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(score, name)| Highscore { name, score })
            .collect())
    }
}

/// The server went away under an open connection; worth one retry on a
/// fresh connection.
fn is_connection_lost(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Io(_) | sqlx::Error::Protocol(_))
}

#[async_trait]
impl ScoresStore for SqlScoresStore {
    async fn top_scores(&self, limit: u32) -> Result<Vec<Highscore>, ScoresError> {
        let rows = (|| self.query(limit))
            .retry(
                ConstantBuilder::default()
                    .with_delay(Duration::from_millis(100))
                    .with_max_times(1),
            )
            .when(is_connection_lost)
            .notify(|e, _| info!("Scores store: got error {}, retrying operation", e))
            .await?;
        Ok(rows)
    }
}
