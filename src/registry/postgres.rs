//! PostgreSQL registry backend
//!
//! Stores stream status in a `streams` table. Enabled with the `postgres`
//! feature.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::RegistryError;
use super::key::StreamKey;
use super::status::{StreamRecord, StreamStatus};
use super::StreamRegistry;
use crate::stats::StatsSnapshot;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS streams (
    id          BIGSERIAL PRIMARY KEY,
    stream_key  TEXT NOT NULL UNIQUE,
    status      TEXT NOT NULL DEFAULT 'inactive',
    started_at  TIMESTAMPTZ,
    stopped_at  TIMESTAMPTZ,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

/// Registry backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStreamRegistry {
    pool: PgPool,
}

impl PgStreamRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and build a registry
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let pool = PgPool::connect(url).await?;
        tracing::info!("Connected to stream registry database");
        Ok(Self::new(pool))
    }

    /// Create the `streams` table if it does not exist
    pub async fn migrate(&self) -> Result<(), RegistryError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_status(
        &self,
        key: &StreamKey,
        status: StreamStatus,
    ) -> Result<(), RegistryError> {
        // Active stamps started_at, the terminal states stamp stopped_at.
        let query = match status {
            StreamStatus::Active => {
                r#"
                INSERT INTO streams (stream_key, status, started_at, created_at, updated_at)
                VALUES ($1, $2, NOW(), NOW(), NOW())
                ON CONFLICT (stream_key) DO UPDATE
                SET status = EXCLUDED.status, started_at = NOW(), updated_at = NOW()
                "#
            }
            StreamStatus::Inactive | StreamStatus::Error => {
                r#"
                INSERT INTO streams (stream_key, status, stopped_at, created_at, updated_at)
                VALUES ($1, $2, NOW(), NOW(), NOW())
                ON CONFLICT (stream_key) DO UPDATE
                SET status = EXCLUDED.status, stopped_at = NOW(), updated_at = NOW()
                "#
            }
        };

        sqlx::query(query)
            .bind(key.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        tracing::debug!(stream = %key, status = %status, "Stream status updated");
        Ok(())
    }
}

fn record_from_row(row: &PgRow) -> Result<StreamRecord, RegistryError> {
    let key: String = row.try_get("stream_key")?;
    let status: String = row.try_get("status")?;

    Ok(StreamRecord {
        id: row.try_get("id")?,
        stream_key: StreamKey::parse(key)
            .map_err(|e| RegistryError::InvalidRecord(e.to_string()))?,
        status: status.parse()?,
        started_at: row.try_get("started_at")?,
        stopped_at: row.try_get("stopped_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl StreamRegistry for PgStreamRegistry {
    async fn create_if_absent(&self, key: &StreamKey) -> Result<StreamRecord, RegistryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO streams (stream_key, status, created_at, updated_at)
            VALUES ($1, 'inactive', NOW(), NOW())
            ON CONFLICT (stream_key) DO UPDATE SET stream_key = EXCLUDED.stream_key
            RETURNING id, stream_key, status, started_at, stopped_at, created_at, updated_at
            "#,
        )
        .bind(key.as_str())
        .fetch_one(&self.pool)
        .await?;

        record_from_row(&row)
    }

    async fn set_active(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.upsert_status(key, StreamStatus::Active).await
    }

    async fn set_inactive(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.upsert_status(key, StreamStatus::Inactive).await
    }

    async fn set_error(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.upsert_status(key, StreamStatus::Error).await
    }

    async fn get(&self, key: &StreamKey) -> Result<Option<StreamRecord>, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT id, stream_key, status, started_at, stopped_at, created_at, updated_at
            FROM streams
            WHERE stream_key = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<StreamRecord>, RegistryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, stream_key, status, started_at, stopped_at, created_at, updated_at
            FROM streams
            WHERE status = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(StreamStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut streams = Vec::with_capacity(rows.len());
        for row in &rows {
            match record_from_row(row) {
                Ok(record) => streams.push(record),
                Err(e) => tracing::error!(error = %e, "Failed to decode stream row"),
            }
        }

        Ok(streams)
    }

    async fn stats(&self) -> Result<StatsSnapshot, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_streams,
                COUNT(*) FILTER (WHERE status = 'active') AS active_streams,
                COUNT(*) FILTER (WHERE status = 'inactive') AS inactive_streams,
                COUNT(*) FILTER (WHERE status = 'error') AS error_streams
            FROM streams
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let count = |column: &str| -> Result<u64, RegistryError> {
            let value: i64 = row.try_get(column)?;
            Ok(value.max(0) as u64)
        };

        Ok(StatsSnapshot {
            total_streams: count("total_streams")?,
            active_streams: count("active_streams")?,
            inactive_streams: count("inactive_streams")?,
            error_streams: count("error_streams")?,
        })
    }
}
