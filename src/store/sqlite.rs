//! SQLite-backed user directory.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{FieldQuery, NewAttachment, UserId, UserStore, UserUpdate};
use crate::error::StoreError;
use crate::synth::{AccountIdentity, FieldDefinition, FieldOption};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    username        TEXT    NOT NULL UNIQUE,
    email           TEXT    NOT NULL UNIQUE,
    password_hash   TEXT    NOT NULL,
    first_name      TEXT    NOT NULL DEFAULT '',
    last_name       TEXT    NOT NULL DEFAULT '',
    display_name    TEXT    NOT NULL DEFAULT '',
    registered_at   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS usermeta (
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    meta_key        TEXT    NOT NULL,
    meta_value      TEXT    NOT NULL,
    PRIMARY KEY (user_id, meta_key)
);

CREATE TABLE IF NOT EXISTS custom_fields (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT    NOT NULL,
    field_type      TEXT    NOT NULL,
    metakey         TEXT    NOT NULL UNIQUE,
    options         TEXT    NOT NULL DEFAULT '[]',
    is_default      INTEGER NOT NULL DEFAULT 0,
    position        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS attachments (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    path            TEXT    NOT NULL,
    mime_type       TEXT    NOT NULL,
    source_url      TEXT    NOT NULL,
    created_at      TEXT    NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS site_options (
    option_key      TEXT PRIMARY KEY,
    option_value    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_custom_fields_position ON custom_fields(position);
CREATE INDEX IF NOT EXISTS idx_attachments_user ON attachments(user_id);
"#;

const MULTISITE_OPTION: &str = "multisite";

/// A stored account, as read back from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub registered_at: DateTime<Utc>,
}

/// Salted SHA-256 in the form `sha256$<salt>$<hex digest>`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("sha256${}${}", salt, digest(&salt, password))
}

/// Checks a password against a hash produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split('$').collect::<Vec<_>>().as_slice() {
        ["sha256", salt, expected] => digest(salt, password) == *expected,
        _ => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// User directory stored in a single SQLite database.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Opens (creating if needed) the directory at `url`.
    ///
    /// Accepts either a `sqlite:` URL or a bare file path.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let url = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite://{}", url)
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        tracing::debug!(url = %url, "User directory opened");
        Ok(Self { pool })
    }

    /// Turns the multisite flag on or off.
    pub async fn set_multisite(&self, enabled: bool) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO site_options (option_key, option_value) VALUES (?1, ?2)
             ON CONFLICT(option_key) DO UPDATE SET option_value = excluded.option_value",
        )
        .bind(MULTISITE_OPTION)
        .bind(if enabled { "1" } else { "0" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds a custom field definition, or replaces the one with the same metakey.
    ///
    /// New fields are appended to the end of the catalog; replaced fields keep their position.
    pub async fn register_field(&self, field: &FieldDefinition) -> Result<(), StoreError> {
        if field.metakey.trim().is_empty() {
            return Err(StoreError::InvalidField {
                metakey: field.metakey.clone(),
                reason: "metakey must not be empty".to_string(),
            });
        }

        let options = serde_json::to_string(&field.options)?;
        sqlx::query(
            "INSERT INTO custom_fields (name, field_type, metakey, options, is_default, position)
             VALUES (?1, ?2, ?3, ?4, ?5, (SELECT COALESCE(MAX(position) + 1, 0) FROM custom_fields))
             ON CONFLICT(metakey) DO UPDATE SET
                name = excluded.name,
                field_type = excluded.field_type,
                options = excluded.options,
                is_default = excluded.is_default",
        )
        .bind(&field.name)
        .bind(&field.field_type)
        .bind(&field.metakey)
        .bind(options)
        .bind(field.is_default)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| UserRecord {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            display_name: row.get("display_name"),
            registered_at: row.get("registered_at"),
        }))
    }

    /// Number of attachments registered for a user.
    pub async fn attachment_count(&self, user_id: UserId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {} = ?1)", column);
        let found: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}

fn map_write_error(err: sqlx::Error, user_id: UserId) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => StoreError::UserNotFound(user_id),
        _ => StoreError::QueryFailed(err),
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn is_multisite(&self) -> Result<bool, StoreError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT option_value FROM site_options WHERE option_key = ?1")
                .bind(MULTISITE_OPTION)
                .fetch_optional(&self.pool)
                .await?;
        Ok(matches!(value.as_deref(), Some("1") | Some("true")))
    }

    async fn create_user(&self, identity: &AccountIdentity) -> Result<UserId, StoreError> {
        for (field, value) in [("username", &identity.username), ("email", &identity.email)] {
            if self.exists(field, value).await? {
                return Err(StoreError::Duplicate {
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        }

        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, display_name, registered_at)
             VALUES (?1, ?2, ?3, ?1, ?4)",
        )
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(hash_password(&identity.password))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::Duplicate {
                field: "username or email".to_string(),
                value: identity.username.clone(),
            },
            _ => StoreError::QueryFailed(e),
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET
                first_name = COALESCE(?1, first_name),
                last_name = COALESCE(?2, last_name),
                display_name = COALESCE(?3, display_name)
             WHERE id = ?4",
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.display_name)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    async fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO usermeta (user_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
        )
        .bind(id)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, id))?;
        Ok(())
    }

    async fn get_user_meta(&self, id: UserId, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar(
            "SELECT meta_value FROM usermeta WHERE user_id = ?1 AND meta_key = ?2",
        )
        .bind(id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn custom_fields(&self, query: FieldQuery) -> Result<Vec<FieldDefinition>, StoreError> {
        let rows = sqlx::query(
            "SELECT name, field_type, metakey, options, is_default FROM custom_fields
             WHERE ?1 OR is_default = 0
             ORDER BY position, id",
        )
        .bind(query.include_default)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<FieldDefinition, StoreError> {
                let options: Vec<FieldOption> =
                    serde_json::from_str(&row.get::<String, _>("options"))?;
                Ok(FieldDefinition {
                    name: row.get("name"),
                    field_type: row.get("field_type"),
                    metakey: row.get("metakey"),
                    options,
                    is_default: row.get::<i64, _>("is_default") != 0,
                })
            })
            .collect()
    }

    async fn all_user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        let ids = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn add_attachment(&self, attachment: &NewAttachment) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO attachments (user_id, path, mime_type, source_url) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(attachment.user_id)
        .bind(&attachment.path)
        .bind(&attachment.mime_type)
        .bind(&attachment.source_url)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, attachment.user_id))?;
        Ok(result.last_insert_rowid())
    }
}
