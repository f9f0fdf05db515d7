use crate::sink::Severity;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IncidentError {
    #[error("incident store error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("failed to prepare incident store directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt incident record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Record of an automatic action taken against a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    pub action_taken: String,
    pub severity: Severity,
    pub file_hash: String,
    pub file_size: u64,
}

impl IncidentReport {
    pub fn quarantined(
        original_path: &Path,
        quarantine_path: &Path,
        file_hash: &str,
        file_size: u64,
    ) -> Self {
        IncidentReport {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            original_path: original_path.to_path_buf(),
            quarantine_path: quarantine_path.to_path_buf(),
            action_taken: "quarantined".to_owned(),
            severity: Severity::Critical,
            file_hash: file_hash.to_owned(),
            file_size,
        }
    }
}

/// SQLite-backed incident log.
#[derive(Debug, Clone)]
pub struct IncidentStore {
    pool: SqlitePool,
    retry_delay: Duration,
}

impl IncidentStore {
    /// Opens (or creates) the incident database at `db_path`.
    pub async fn open(db_path: &Path, retry_delay: Duration) -> Result<Self, IncidentError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let connection_path = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&connection_path).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY NOT NULL,
                timestamp TEXT NOT NULL,
                original_path TEXT NOT NULL,
                quarantine_path TEXT NOT NULL,
                action_taken TEXT NOT NULL,
                severity TEXT NOT NULL,
                file_hash TEXT NOT NULL DEFAULT '',
                file_size INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await?;

        Ok(IncidentStore { pool, retry_delay })
    }

    /// Writes a report, retrying once after the configured delay.
    pub async fn record(&self, report: &IncidentReport) -> Result<(), IncidentError> {
        match self.insert(report).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(id = %report.id, error = %e, "incident write failed, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                self.insert(report).await.inspect_err(|e| {
                    error!(id = %report.id, error = %e, "incident write failed permanently");
                })
            }
        }
    }

    /// All reports, oldest first.
    pub async fn list(&self) -> Result<Vec<IncidentReport>, IncidentError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, original_path, quarantine_path, action_taken, severity, file_hash, file_size
             FROM incidents ORDER BY timestamp ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.get(0);
                let timestamp: String = row.get(1);
                let severity: String = row.get(5);
                let file_size: i64 = row.get(7);

                let corrupt = |reason: String| IncidentError::Corrupt {
                    id: id.clone(),
                    reason,
                };

                Ok(IncidentReport {
                    id: Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| corrupt(e.to_string()))?
                        .with_timezone(&Utc),
                    original_path: PathBuf::from(row.get::<String, _>(2)),
                    quarantine_path: PathBuf::from(row.get::<String, _>(3)),
                    action_taken: row.get(4),
                    severity: parse_severity(&severity)
                        .ok_or_else(|| corrupt(format!("unknown severity {severity}")))?,
                    file_hash: row.get(6),
                    file_size: u64::try_from(file_size).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn insert(&self, report: &IncidentReport) -> Result<(), IncidentError> {
        sqlx::query(
            "INSERT INTO incidents
             (id, timestamp, original_path, quarantine_path, action_taken, severity, file_hash, file_size)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(report.id.to_string())
        .bind(report.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .bind(report.original_path.display().to_string())
        .bind(report.quarantine_path.display().to_string())
        .bind(&report.action_taken)
        .bind(report.severity.to_string())
        .bind(&report.file_hash)
        .bind(i64::try_from(report.file_size).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw {
        "critical" => Some(Severity::Critical),
        "high" => Some(Severity::High),
        _ => None,
    }
}
