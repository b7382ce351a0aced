//! SQLite persistence: the processed-file ledger, quality records, and
//! the upload-stability debounce table.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use reelvault_model::{LedgerEntry, MediaKind, ProcessedStatus, QualityRecord};

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS processed_files (
    remote TEXT NOT NULL,
    original_path TEXT NOT NULL,
    destination_path TEXT,
    tmdb_id INTEGER,
    kind TEXT,
    title TEXT NOT NULL DEFAULT '',
    year INTEGER,
    season INTEGER,
    episode INTEGER,
    quality TEXT NOT NULL DEFAULT '',
    content_class TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    error_message TEXT,
    processed_at TEXT NOT NULL,
    PRIMARY KEY (remote, original_path)
);

CREATE TABLE IF NOT EXISTS quality_records (
    tmdb_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    season INTEGER,
    episode INTEGER,
    quality TEXT NOT NULL,
    remote TEXT NOT NULL,
    path TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_quality_key
    ON quality_records(tmdb_id, kind, COALESCE(season, -1), COALESCE(episode, -1));

CREATE TABLE IF NOT EXISTS file_stability (
    remote TEXT NOT NULL,
    path TEXT NOT NULL,
    size INTEGER NOT NULL,
    first_seen TEXT NOT NULL,
    last_size_change TEXT NOT NULL,
    last_checked TEXT NOT NULL,
    PRIMARY KEY (remote, path)
);
"#;

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn open(path: &str) -> Result<Store> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    /// In-memory database for tests. A single pooled connection keeps
    /// the database alive for the pool's lifetime.
    pub async fn open_in_memory() -> Result<Store> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(sqlx::Error::from)?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Store> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Store { pool })
    }

    // ---- processed-file ledger -------------------------------------

    /// Record a terminal outcome, overwriting any previous row for the
    /// same source path.
    pub async fn record_ledger(&self, entry: &LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO processed_files
                (remote, original_path, destination_path, tmdb_id, kind,
                 title, year, season, episode, quality, content_class,
                 status, error_message, processed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.remote)
        .bind(&entry.original_path)
        .bind(&entry.destination_path)
        .bind(entry.tmdb_id)
        .bind(entry.kind.map(|k| k.as_str()))
        .bind(&entry.title)
        .bind(entry.year)
        .bind(entry.season.map(|s| s as i64))
        .bind(entry.episode.map(|e| e as i64))
        .bind(&entry.quality)
        .bind(&entry.content_class)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(entry.processed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether a source path has already reached an outcome that keeps
    /// it out of future scans. Failed rows do not count: those paths
    /// are re-offered.
    pub async fn is_processed(&self, remote: &str, path: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM processed_files
            WHERE remote = ? AND original_path = ?
              AND status IN ('success', 'skipped', 'duplicate_deleted')
            "#,
        )
        .bind(remote)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Per-status row counts, for the status report.
    pub async fn ledger_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM processed_files GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>("status"), r.get::<i64, _>("n")))
            .collect())
    }

    /// Most recently processed entries, newest first.
    pub async fn recent_entries(&self, limit: i64) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT remote, original_path, destination_path, tmdb_id, kind,
                   title, year, season, episode, quality, content_class,
                   status, error_message, processed_at
            FROM processed_files
            ORDER BY processed_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(ledger_entry_from_row).collect())
    }

    // ---- quality records -------------------------------------------

    /// Insert or overwrite the single filed-copy row for a catalog key.
    pub async fn upsert_quality(&self, record: &QualityRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO quality_records
                (tmdb_id, kind, season, episode, quality, remote, path)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.tmdb_id)
        .bind(record.kind.as_str())
        .bind(record.season)
        .bind(record.episode)
        .bind(&record.quality)
        .bind(&record.remote)
        .bind(&record.path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_quality(
        &self,
        tmdb_id: i64,
        kind: MediaKind,
        season: Option<i64>,
        episode: Option<i64>,
    ) -> Result<Option<QualityRecord>> {
        let row = sqlx::query(
            r#"
            SELECT tmdb_id, kind, season, episode, quality, remote, path
            FROM quality_records
            WHERE tmdb_id = ? AND kind = ? AND season IS ? AND episode IS ?
            "#,
        )
        .bind(tmdb_id)
        .bind(kind.as_str())
        .bind(season)
        .bind(episode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| QualityRecord {
            tmdb_id: r.get("tmdb_id"),
            kind: MediaKind::from_str_opt(&r.get::<String, _>("kind"))
                .unwrap_or(MediaKind::Movie),
            season: r.get("season"),
            episode: r.get("episode"),
            quality: r.get("quality"),
            remote: r.get("remote"),
            path: r.get("path"),
        }))
    }

    pub async fn quality_record_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM quality_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ---- stability debounce ----------------------------------------

    /// Record an observation of a file's size and return when the size
    /// last changed. The first observation counts as a change.
    pub async fn observe_file(
        &self,
        remote: &str,
        path: &str,
        size: i64,
    ) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let existing = sqlx::query(
            "SELECT size, last_size_change FROM file_stability WHERE remote = ? AND path = ?",
        )
        .bind(remote)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO file_stability
                        (remote, path, size, first_seen, last_size_change, last_checked)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(remote)
                .bind(path)
                .bind(size)
                .bind(now)
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;
                Ok(now)
            }
            Some(row) => {
                let known_size: i64 = row.get("size");
                let last_change: DateTime<Utc> = if known_size == size {
                    row.get("last_size_change")
                } else {
                    now
                };
                sqlx::query(
                    r#"
                    UPDATE file_stability
                    SET size = ?, last_size_change = ?, last_checked = ?
                    WHERE remote = ? AND path = ?
                    "#,
                )
                .bind(size)
                .bind(last_change)
                .bind(now)
                .bind(remote)
                .bind(path)
                .execute(&self.pool)
                .await?;
                Ok(last_change)
            }
        }
    }

    pub async fn clear_stability(&self, remote: &str, path: &str) -> Result<()> {
        sqlx::query("DELETE FROM file_stability WHERE remote = ? AND path = ?")
            .bind(remote)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn ledger_entry_from_row(row: &sqlx::sqlite::SqliteRow) -> LedgerEntry {
    let status: String = row.get("status");
    LedgerEntry {
        remote: row.get("remote"),
        original_path: row.get("original_path"),
        destination_path: row.get("destination_path"),
        tmdb_id: row.get("tmdb_id"),
        kind: row
            .get::<Option<String>, _>("kind")
            .and_then(|k| MediaKind::from_str_opt(&k)),
        title: row.get("title"),
        year: row.get("year"),
        season: row.get::<Option<i64>, _>("season").map(|s| s as u32),
        episode: row.get::<Option<i64>, _>("episode").map(|e| e as u32),
        quality: row.get("quality"),
        content_class: row.get("content_class"),
        status: match status.as_str() {
            "success" => ProcessedStatus::Success,
            "skipped" => ProcessedStatus::Skipped,
            "duplicate_deleted" => ProcessedStatus::DuplicateDeleted,
            _ => ProcessedStatus::Failed,
        },
        error_message: row.get("error_message"),
        processed_at: row.get("processed_at"),
    }
}
