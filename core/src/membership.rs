use std::fmt;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::db::Database;

/// Closed role enumeration. Provider payloads are normalized against it;
/// anything else is a validation failure, never coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Case-insensitive parse; provider role names arrive in mixed case
    /// ("member", "org:admin" is not accepted).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceMemberRecord {
    pub workspace_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub message: Option<String>,
    pub created_at: i64,
}

/// Membership row joined with its user, for the workspace read paths.
#[derive(Debug, Clone)]
pub struct WorkspaceMemberWithUser {
    pub workspace_id: String,
    pub user_id: String,
    pub role: MemberRole,
    pub message: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct MembershipStore {
    pool: Pool<Sqlite>,
}

impl MembershipStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Upsert by the (workspace_id, user_id) composite key. The role always
    /// takes the incoming value; a duplicate delivery therefore converges on
    /// the last event applied.
    pub async fn upsert(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: MemberRole,
        message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role, message, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(workspace_id, user_id) DO UPDATE SET
                 role = excluded.role,
                 message = COALESCE(excluded.message, message)",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(message)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert member {user_id} in {workspace_id}"))?;

        Ok(())
    }

    /// Insert only when no row exists for the composite key. Returns `false`
    /// on conflict so callers can report an already-member condition without
    /// a separate read.
    pub async fn insert_if_absent(
        &self,
        workspace_id: &str,
        user_id: &str,
        role: MemberRole,
        message: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO workspace_members (workspace_id, user_id, role, message, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(workspace_id, user_id) DO NOTHING",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(message)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert member {user_id} in {workspace_id}"))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<WorkspaceMemberRecord>> {
        let row = sqlx::query(
            "SELECT workspace_id, user_id, role, message, created_at
             FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    pub async fn list_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<WorkspaceMemberRecord>> {
        let rows = sqlx::query(
            "SELECT workspace_id, user_id, role, message, created_at
             FROM workspace_members WHERE workspace_id = ?
             ORDER BY created_at ASC, user_id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::map_row).collect()
    }

    pub async fn list_members_with_users(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<WorkspaceMemberWithUser>> {
        let rows = sqlx::query(
            "SELECT m.workspace_id, m.user_id, m.role, m.message,
                    u.email, u.name, u.image_url
             FROM workspace_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.workspace_id = ?
             ORDER BY m.created_at ASC, m.user_id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(WorkspaceMemberWithUser {
                    workspace_id: row.get("workspace_id"),
                    user_id: row.get("user_id"),
                    role: parse_stored_role(&row)?,
                    message: row.get::<Option<String>, _>("message"),
                    email: row.get("email"),
                    name: row.get::<Option<String>, _>("name"),
                    image_url: row.get::<Option<String>, _>("image_url"),
                })
            })
            .collect()
    }

    fn map_row(row: SqliteRow) -> Result<WorkspaceMemberRecord> {
        Ok(WorkspaceMemberRecord {
            workspace_id: row.get("workspace_id"),
            user_id: row.get("user_id"),
            role: parse_stored_role(&row)?,
            message: row.get::<Option<String>, _>("message"),
            created_at: row.get::<i64, _>("created_at"),
        })
    }
}

fn parse_stored_role(row: &SqliteRow) -> Result<MemberRole> {
    let raw: String = row.get("role");
    MemberRole::parse(&raw).ok_or_else(|| anyhow!("unknown role `{raw}` in workspace_members"))
}
