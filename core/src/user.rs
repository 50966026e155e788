use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::db::Database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
}

/// Deterministic fallback address for provider payloads that carry no email.
/// The email column is NOT NULL, so every user row gets one.
pub fn synthetic_email(user_id: &str) -> String {
    format!("{user_id}@placeholder.invalid")
}

#[derive(Clone)]
pub struct UserStore {
    pool: Pool<Sqlite>,
}

impl UserStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Insert a user, keeping the existing row untouched on conflict
    /// (first-writer-wins). Returns `true` when a row was inserted.
    pub async fn insert_if_absent(
        &self,
        id: &str,
        email: &str,
        name: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, image_url, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(image_url)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert user {id}"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert-or-refresh: creates the user when missing and overwrites
    /// email/name/image when it already exists.
    pub async fn upsert_refresh(
        &self,
        id: &str,
        email: &str,
        name: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, image_url, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 email = excluded.email,
                 name = excluded.name,
                 image_url = excluded.image_url",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(image_url)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert user {id}"))?;

        Ok(())
    }

    /// Guarantee a row exists for `id` so membership rows can reference it.
    /// Existing rows are left untouched.
    pub async fn ensure_placeholder(&self, id: &str) -> Result<()> {
        self.insert_if_absent(id, &synthetic_email(id), None, None)
            .await?;
        Ok(())
    }

    /// Delete a user; absence is not an error. Returns `true` when a row
    /// was removed.
    pub async fn delete_if_exists(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete user {id}"))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let row =
            sqlx::query("SELECT id, email, name, image_url, created_at FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Self::map_row))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row =
            sqlx::query("SELECT id, email, name, image_url, created_at FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Self::map_row))
    }

    fn map_row(row: SqliteRow) -> UserRecord {
        UserRecord {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get::<Option<String>, _>("name"),
            image_url: row.get::<Option<String>, _>("image_url"),
            created_at: row.get::<i64, _>("created_at"),
        }
    }
}
