use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{output_preview, ElementStats, ElementStore, ElementSummary, SaveAck, SaveAction, SavedElement};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::lineage::{SaveRecord, VersionSummary};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed element store
#[derive(Clone)]
pub struct SqliteElementStore {
    pool: SqlitePool,
}

impl SqliteElementStore {
    /// Create a new SQLite element store
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ElementStore for SqliteElementStore {
    async fn save_element(&self, record: &SaveRecord) -> StorageResult<SaveAck> {
        let full_chat_history =
            serde_json::to_string(&record.full_chat_history).map_err(json_error)?;
        let all_versions = serde_json::to_string(&record.all_versions).map_err(json_error)?;

        let exists: Option<(String,)> =
            sqlx::query_as("SELECT element_id FROM elements WHERE element_id = ?")
                .bind(&record.element_id)
                .fetch_optional(&self.pool)
                .await?;

        let action = if exists.is_some() {
            sqlx::query(
                r#"
                UPDATE elements
                SET element_name = ?, saved_version = ?, output = ?,
                    full_chat_history = ?, context_used = ?, saved_at = ?,
                    updated_at = ?, all_versions = ?
                WHERE element_id = ?
                "#,
            )
            .bind(&record.element_name)
            .bind(record.saved_version as i64)
            .bind(&record.output)
            .bind(&full_chat_history)
            .bind(&record.context_used)
            .bind(record.saved_at.to_rfc3339())
            .bind(Utc::now().to_rfc3339())
            .bind(&all_versions)
            .bind(&record.element_id)
            .execute(&self.pool)
            .await?;

            SaveAction::Updated
        } else {
            sqlx::query(
                r#"
                INSERT INTO elements (
                    element_id, element_name, saved_version, output,
                    full_chat_history, context_used, created_at, saved_at,
                    updated_at, all_versions
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?)
                "#,
            )
            .bind(&record.element_id)
            .bind(&record.element_name)
            .bind(record.saved_version as i64)
            .bind(&record.output)
            .bind(&full_chat_history)
            .bind(&record.context_used)
            .bind(record.created_at.to_rfc3339())
            .bind(record.saved_at.to_rfc3339())
            .bind(&all_versions)
            .execute(&self.pool)
            .await?;

            SaveAction::Created
        };

        info!(
            element_id = %record.element_id,
            name = %record.element_name,
            version = record.saved_version,
            action = %action,
            "Element saved"
        );

        Ok(SaveAck {
            element_id: record.element_id.clone(),
            action,
        })
    }

    async fn get_element(&self, element_id: &str) -> StorageResult<Option<SavedElement>> {
        let row: Option<ElementRow> = sqlx::query_as(
            r#"
            SELECT element_id, element_name, saved_version, output,
                   full_chat_history, context_used, created_at, saved_at,
                   updated_at, all_versions
            FROM elements
            WHERE element_id = ?
            "#,
        )
        .bind(element_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SavedElement::try_from).transpose()
    }

    async fn list_elements(&self) -> StorageResult<Vec<ElementSummary>> {
        let rows: Vec<ElementRow> = sqlx::query_as(
            r#"
            SELECT element_id, element_name, saved_version, output,
                   full_chat_history, context_used, created_at, saved_at,
                   updated_at, all_versions
            FROM elements
            ORDER BY saved_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ElementSummary::try_from).collect()
    }

    async fn delete_element(&self, element_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM elements WHERE element_id = ?")
            .bind(element_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self) -> StorageResult<ElementStats> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT full_chat_history, all_versions, saved_at FROM elements")
                .fetch_all(&self.pool)
                .await?;

        let mut stats = ElementStats {
            total_elements: rows.len(),
            ..Default::default()
        };

        for (chat_history, all_versions, saved_at) in rows {
            let chat: Vec<String> = serde_json::from_str(&chat_history).map_err(json_error)?;
            let versions: Vec<VersionSummary> =
                serde_json::from_str(&all_versions).map_err(json_error)?;
            let saved_at = parse_timestamp(&saved_at)?;

            stats.total_chat_messages += chat.len();
            stats.total_versions += versions.len();
            stats.latest_save = match stats.latest_save {
                Some(latest) if latest >= saved_at => Some(latest),
                _ => Some(saved_at),
            };
        }

        Ok(stats)
    }
}

/// Raw database row for an element
#[derive(Debug, sqlx::FromRow)]
struct ElementRow {
    element_id: String,
    element_name: String,
    saved_version: i64,
    output: String,
    full_chat_history: String,
    context_used: String,
    created_at: String,
    saved_at: String,
    updated_at: Option<String>,
    all_versions: String,
}

impl TryFrom<ElementRow> for SavedElement {
    type Error = StorageError;

    fn try_from(row: ElementRow) -> StorageResult<Self> {
        let updated_at = row
            .updated_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(SavedElement {
            record: SaveRecord {
                element_id: row.element_id,
                element_name: row.element_name,
                saved_version: row.saved_version as u32,
                output: row.output,
                full_chat_history: serde_json::from_str(&row.full_chat_history)
                    .map_err(json_error)?,
                context_used: row.context_used,
                created_at: parse_timestamp(&row.created_at)?,
                saved_at: parse_timestamp(&row.saved_at)?,
                all_versions: serde_json::from_str(&row.all_versions).map_err(json_error)?,
            },
            updated_at,
        })
    }
}

impl TryFrom<ElementRow> for ElementSummary {
    type Error = StorageError;

    fn try_from(row: ElementRow) -> StorageResult<Self> {
        let chat: Vec<String> =
            serde_json::from_str(&row.full_chat_history).map_err(json_error)?;
        let versions: Vec<VersionSummary> =
            serde_json::from_str(&row.all_versions).map_err(json_error)?;

        Ok(ElementSummary {
            element_id: row.element_id,
            element_name: row.element_name,
            saved_version: row.saved_version as u32,
            created_at: parse_timestamp(&row.created_at)?,
            saved_at: parse_timestamp(&row.saved_at)?,
            output_preview: output_preview(&row.output),
            chat_count: chat.len(),
            version_count: versions.len(),
        })
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Query {
            message: format!("Invalid timestamp '{}': {}", value, e),
        })
}

fn json_error(e: serde_json::Error) -> StorageError {
    StorageError::Query {
        message: format!("JSON encoding failed: {}", e),
    }
}
