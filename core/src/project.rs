//! Projects, their tasks, and task comments. These are application-owned
//! rows (identifiers minted by the caller, not the identity provider); the
//! workspace read path returns them nested under each workspace.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite, sqlite::SqliteRow};

use crate::db::Database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// Task row with its assignee joined in. The assignee is optional both in
/// the schema and because a deleted user SET NULLs the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithAssignee {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub status: String,
    pub created_at: i64,
    pub assignee: Option<TaskAssignee>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAssignee {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentWithAuthor {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: i64,
    pub author_email: String,
    pub author_name: Option<String>,
}

#[derive(Clone)]
pub struct ProjectStore {
    pool: Pool<Sqlite>,
}

impl ProjectStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    pub async fn create(
        &self,
        id: &str,
        workspace_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO projects (id, workspace_id, name, description, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(workspace_id)
        .bind(name)
        .bind(description)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create project {id} in {workspace_id}"))?;

        Ok(())
    }

    pub async fn create_task(
        &self,
        id: &str,
        project_id: &str,
        title: &str,
        status: &str,
        assignee_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, status, assignee_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(project_id)
        .bind(title)
        .bind(status)
        .bind(assignee_id)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to create task {id} in project {project_id}"))?;

        Ok(())
    }

    pub async fn add_comment(
        &self,
        id: &str,
        task_id: &str,
        user_id: &str,
        body: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, task_id, user_id, body, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(task_id)
        .bind(user_id)
        .bind(body)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to add comment {id} to task {task_id}"))?;

        Ok(())
    }

    pub async fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<ProjectRecord>> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, name, description, created_at
             FROM projects WHERE workspace_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(map_project_row).collect())
    }

    /// All tasks under a workspace's projects in one query, so the read
    /// path stays at a fixed number of statements per workspace.
    pub async fn list_tasks_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<TaskWithAssignee>> {
        let rows = sqlx::query(
            "SELECT t.id, t.project_id, t.title, t.status, t.created_at,
                    u.id AS assignee_id, u.email AS assignee_email,
                    u.name AS assignee_name, u.image_url AS assignee_image_url
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             LEFT JOIN users u ON u.id = t.assignee_id
             WHERE p.workspace_id = ?
             ORDER BY t.created_at ASC, t.id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(map_task_row).collect())
    }

    pub async fn list_comments_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<CommentWithAuthor>> {
        let rows = sqlx::query(
            "SELECT c.id, c.task_id, c.user_id, c.body, c.created_at,
                    u.email AS author_email, u.name AS author_name
             FROM comments c
             JOIN users u ON u.id = c.user_id
             JOIN tasks t ON t.id = c.task_id
             JOIN projects p ON p.id = t.project_id
             WHERE p.workspace_id = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(map_comment_row).collect())
    }
}

fn map_project_row(row: SqliteRow) -> ProjectRecord {
    ProjectRecord {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        name: row.get("name"),
        description: row.get::<Option<String>, _>("description"),
        created_at: row.get::<i64, _>("created_at"),
    }
}

fn map_task_row(row: SqliteRow) -> TaskWithAssignee {
    let assignee = row
        .get::<Option<String>, _>("assignee_id")
        .map(|id| TaskAssignee {
            id,
            email: row.get("assignee_email"),
            name: row.get::<Option<String>, _>("assignee_name"),
            image_url: row.get::<Option<String>, _>("assignee_image_url"),
        });

    TaskWithAssignee {
        id: row.get("id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        status: row.get("status"),
        created_at: row.get::<i64, _>("created_at"),
        assignee,
    }
}

fn map_comment_row(row: SqliteRow) -> CommentWithAuthor {
    CommentWithAuthor {
        id: row.get("id"),
        task_id: row.get("task_id"),
        user_id: row.get("user_id"),
        body: row.get("body"),
        created_at: row.get::<i64, _>("created_at"),
        author_email: row.get("author_email"),
        author_name: row.get::<Option<String>, _>("author_name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, user::UserStore, workspace::WorkspaceStore};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database, ProjectStore) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let config = AppConfig {
            database_path: temp_dir
                .path()
                .join("project-test.db")
                .to_string_lossy()
                .into_owned(),
            ..AppConfig::default()
        };

        let database = Database::connect(&config).await.expect("connect database");
        database.migrate().await.expect("apply migrations");

        let store = ProjectStore::new(&database);
        (temp_dir, database, store)
    }

    async fn seed_workspace(database: &Database, workspace_id: &str, user_id: &str) {
        UserStore::new(database)
            .insert_if_absent(user_id, &format!("{user_id}@example.com"), Some("Alice"), None)
            .await
            .expect("seed user");
        WorkspaceStore::new(database)
            .insert_if_absent(workspace_id, "Acme", None, Some(user_id), None)
            .await
            .expect("seed workspace");
    }

    #[tokio::test]
    async fn lists_projects_tasks_and_comments_scoped_to_workspace() {
        let (_tmp, database, store) = setup().await;
        seed_workspace(&database, "org_1", "user_1").await;
        seed_workspace(&database, "org_2", "user_1").await;

        store
            .create("proj_1", "org_1", "Launch", Some("Q3 launch"))
            .await
            .expect("create project");
        store
            .create("proj_other", "org_2", "Elsewhere", None)
            .await
            .expect("create other project");
        store
            .create_task("task_1", "proj_1", "Ship it", "TODO", Some("user_1"))
            .await
            .expect("create task");
        store
            .add_comment("comment_1", "task_1", "user_1", "on it")
            .await
            .expect("add comment");

        let projects = store
            .list_for_workspace("org_1")
            .await
            .expect("list projects");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Launch");
        assert_eq!(projects[0].description.as_deref(), Some("Q3 launch"));

        let tasks = store
            .list_tasks_for_workspace("org_1")
            .await
            .expect("list tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Ship it");
        let assignee = tasks[0].assignee.as_ref().expect("assignee joined");
        assert_eq!(assignee.email, "user_1@example.com");
        assert_eq!(assignee.name.as_deref(), Some("Alice"));

        let comments = store
            .list_comments_for_workspace("org_1")
            .await
            .expect("list comments");
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "on it");
        assert_eq!(comments[0].author_email, "user_1@example.com");

        // The neighbouring workspace sees none of it.
        assert!(
            store
                .list_tasks_for_workspace("org_2")
                .await
                .expect("list tasks")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn deleted_assignee_leaves_task_unassigned() {
        let (_tmp, database, store) = setup().await;
        seed_workspace(&database, "org_1", "user_1").await;

        store
            .create("proj_1", "org_1", "Launch", None)
            .await
            .expect("create project");
        store
            .create_task("task_1", "proj_1", "Ship it", "TODO", Some("user_1"))
            .await
            .expect("create task");

        UserStore::new(&database)
            .delete_if_exists("user_1")
            .await
            .expect("delete user");

        let tasks = store
            .list_tasks_for_workspace("org_1")
            .await
            .expect("list tasks");
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].assignee.is_none());
    }
}
