use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::db::Database;

pub const DEFAULT_WORKSPACE_NAME: &str = "Untitled Workspace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRecord {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub owner_id: Option<String>,
    pub image_url: Option<String>,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct WorkspaceStore {
    pool: Pool<Sqlite>,
}

impl WorkspaceStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Insert a workspace, keeping the existing row untouched on conflict
    /// (first-writer-wins). Returns `true` when a row was inserted.
    pub async fn insert_if_absent(
        &self,
        id: &str,
        name: &str,
        slug: Option<&str>,
        owner_id: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO workspaces (id, name, slug, owner_id, image_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(owner_id)
        .bind(image_url)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert workspace {id}"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert-or-refresh: creates the workspace when missing (heal-on-update)
    /// and refreshes the supplied fields when it exists. Fields absent from
    /// the payload never overwrite stored values.
    pub async fn upsert_refresh(
        &self,
        id: &str,
        name: Option<&str>,
        slug: Option<&str>,
        owner_id: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO workspaces (id, name, slug, owner_id, image_url, created_at)
             VALUES (?, COALESCE(?, ?), ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = COALESCE(?, name),
                 slug = COALESCE(?, slug),
                 owner_id = COALESCE(?, owner_id),
                 image_url = COALESCE(?, image_url)",
        )
        .bind(id)
        .bind(name)
        .bind(DEFAULT_WORKSPACE_NAME)
        .bind(slug)
        .bind(owner_id)
        .bind(image_url)
        .bind(Utc::now().timestamp())
        .bind(name)
        .bind(slug)
        .bind(owner_id)
        .bind(image_url)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert workspace {id}"))?;

        Ok(())
    }

    /// Guarantee a row exists for `id` so membership rows can reference it.
    /// Existing rows are left untouched.
    pub async fn ensure_placeholder(&self, id: &str) -> Result<()> {
        self.insert_if_absent(id, DEFAULT_WORKSPACE_NAME, None, None, None)
            .await?;
        Ok(())
    }

    /// Delete a workspace; absence is not an error. Membership rows cascade
    /// through the schema's foreign keys. Returns `true` when a row was
    /// removed.
    pub async fn delete_if_exists(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete workspace {id}"))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<WorkspaceRecord>> {
        let row = sqlx::query(
            "SELECT id, name, slug, owner_id, image_url, created_at
             FROM workspaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_row))
    }

    /// Workspaces the given user is a member of, most recent first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<WorkspaceRecord>> {
        let rows = sqlx::query(
            "SELECT w.id, w.name, w.slug, w.owner_id, w.image_url, w.created_at
             FROM workspaces w
             JOIN workspace_members m ON m.workspace_id = w.id
             WHERE m.user_id = ?
             ORDER BY w.created_at DESC, w.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    fn map_row(row: SqliteRow) -> WorkspaceRecord {
        WorkspaceRecord {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get::<Option<String>, _>("slug"),
            owner_id: row.get::<Option<String>, _>("owner_id"),
            image_url: row.get::<Option<String>, _>("image_url"),
            created_at: row.get::<i64, _>("created_at"),
        }
    }
}
