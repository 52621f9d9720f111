//! Record storage for the vault's SQLite file.
//!
//! All queries are runtime-bound; the schema is created on first connect so a
//! fresh data directory is immediately usable.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use tidegate_core::{Email, RecordId};

use super::AuthRecord;
use super::error::VaultError;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS auth_records (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
)
";

/// SQLite-backed storage for auth records.
pub(crate) struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Open (creating if missing) the store at the given file path.
    pub(crate) async fn connect(path: &Path) -> Result<Self, VaultError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Open an in-memory store (tests).
    ///
    /// A single connection keeps the in-memory database alive for the pool's
    /// lifetime.
    pub(crate) async fn connect_in_memory() -> Result<Self, VaultError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Check storage connectivity.
    pub(crate) async fn ping(&self) -> Result<(), VaultError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Find a record by email.
    pub(crate) async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AuthRecord>, VaultError> {
        let row = sqlx::query(
            "SELECT id, email, created_at, updated_at FROM auth_records WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Find a record by email, returning its password hash alongside.
    pub(crate) async fn find_by_email_with_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AuthRecord, String)>, VaultError> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at, updated_at
             FROM auth_records WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let hash: String = row.try_get("password_hash")?;
                Ok(Some((record_from_row(&row)?, hash)))
            }
            None => Ok(None),
        }
    }

    /// Find a record by ID.
    pub(crate) async fn find_by_id(&self, id: RecordId) -> Result<Option<AuthRecord>, VaultError> {
        let row =
            sqlx::query("SELECT id, email, created_at, updated_at FROM auth_records WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Insert a new record.
    ///
    /// A unique-constraint violation on the email column maps to
    /// `DuplicateEmail`.
    pub(crate) async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<AuthRecord, VaultError> {
        let id = RecordId::random();
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO auth_records (id, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(AuthRecord {
                id,
                email: email.clone(),
                created_at: now,
                updated_at: now,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(VaultError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a record's password hash.
    pub(crate) async fn update_password(
        &self,
        id: RecordId,
        password_hash: &str,
    ) -> Result<(), VaultError> {
        let result =
            sqlx::query("UPDATE auth_records SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(VaultError::RecordNotFound);
        }

        Ok(())
    }
}

/// Map a row onto an `AuthRecord`.
fn record_from_row(row: &SqliteRow) -> Result<AuthRecord, VaultError> {
    Ok(AuthRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

async fn init_schema(pool: &SqlitePool) -> Result<(), VaultError> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
