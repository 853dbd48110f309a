//! SQLite-backed document store
//!
//! Documents are kept as JSON text, one row per (owner, namespace). The
//! `is_public` and `display_name` columns of `public_profiles` duplicate
//! fields of the JSON body so the public directory can be filtered and
//! ordered in SQL.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

use super::{CrownDocument, CrownStore, Namespace, ProfileEntry, PublicProfile, SCHEMA_VERSION};
use crate::time::now_millis;
use crate::Result;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its tables
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = init_database(db_path).await?;
        Ok(Self { pool })
    }

    /// Private in-memory database, mainly for tests
    pub async fn in_memory() -> Result<Self> {
        // Each in-memory connection is its own database, so pin the pool to one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        create_tables(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Concurrent readers alongside a single writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION as i64)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS crown_documents (
            owner_uid TEXT NOT NULL,
            namespace TEXT NOT NULL CHECK (namespace IN ('private', 'public')),
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (owner_uid, namespace)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS public_profiles (
            owner_uid TEXT PRIMARY KEY,
            is_public INTEGER NOT NULL DEFAULT 0,
            display_name TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_public_profiles_listing
         ON public_profiles (is_public, display_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Unreadable JSON bodies decode like an empty document
fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| {
        debug!("Stored body is not valid JSON ({}), reading as empty", e);
        Value::Null
    })
}

#[async_trait]
impl CrownStore for SqliteStore {
    async fn load_document(&self, uid: &str, namespace: Namespace) -> Result<Option<CrownDocument>> {
        let row = sqlx::query(
            "SELECT body, created_at FROM crown_documents WHERE owner_uid = ? AND namespace = ?",
        )
        .bind(uid)
        .bind(namespace.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let body: String = row.get(0);
            let mut doc = CrownDocument::from_value(&parse_body(&body));
            doc.created_at = Some(row.get::<i64, _>(1));
            doc
        }))
    }

    async fn save_document(&self, uid: &str, namespace: Namespace, doc: &CrownDocument) -> Result<()> {
        let body = serde_json::to_string(&doc.to_value()?)?;
        let updated_at = doc.updated_at.unwrap_or_else(now_millis);
        let created_at = doc.created_at.unwrap_or(updated_at);

        sqlx::query(
            r#"
            INSERT INTO crown_documents (owner_uid, namespace, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (owner_uid, namespace) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(uid)
        .bind(namespace.as_str())
        .bind(body)
        .bind(created_at)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        debug!(uid, namespace = namespace.as_str(), rows = doc.rows.len(), "Saved crown document");
        Ok(())
    }

    async fn load_profile(&self, uid: &str) -> Result<Option<PublicProfile>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM public_profiles WHERE owner_uid = ?")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(body.map(|body| PublicProfile::from_value(&parse_body(&body))))
    }

    async fn save_profile(&self, uid: &str, profile: &PublicProfile) -> Result<()> {
        let body = serde_json::to_string(&profile.to_value()?)?;

        sqlx::query(
            r#"
            INSERT INTO public_profiles (owner_uid, is_public, display_name, body, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (owner_uid) DO UPDATE SET
                is_public = excluded.is_public,
                display_name = excluded.display_name,
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(uid)
        .bind(profile.is_public)
        .bind(&profile.display_name)
        .bind(body)
        .bind(profile.updated_at.unwrap_or_else(now_millis))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_public_profiles(&self) -> Result<Vec<ProfileEntry>> {
        let rows = sqlx::query(
            "SELECT owner_uid, body FROM public_profiles
             WHERE is_public = 1
             ORDER BY display_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ProfileEntry {
                uid: row.get(0),
                profile: PublicProfile::from_value(&parse_body(&row.get::<String, _>(1))),
            })
            // The column can drift from a hand-edited body; the body decides
            .filter(|entry| entry.profile.is_public)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
