// Shared fixtures for handler tests.

use taskhive_core::{config::AppConfig, db::Database, membership::MemberRole};
use tempfile::TempDir;

use crate::state::{AppState, build_state};

/// Fresh on-disk database with migrations applied. The TempDir must stay
/// alive for the duration of the test.
pub async fn setup_state() -> (TempDir, Database, AppState) {
    let tmp = TempDir::new().expect("create temp dir");
    let config = AppConfig {
        database_path: tmp
            .path()
            .join("taskhive.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };

    let database = Database::connect(&config).await.expect("connect database");
    database.migrate().await.expect("migrate");
    let state = build_state(&database);

    (tmp, database, state)
}

pub async fn seed_user(state: &AppState, id: &str, email: &str) {
    state
        .user_store
        .insert_if_absent(id, email, None, None)
        .await
        .expect("seed user");
}

/// Workspace plus an admin member, the shape the reconciler leaves behind
/// after an organization.created event.
pub async fn seed_workspace_with_admin(state: &AppState, workspace_id: &str, admin_id: &str) {
    seed_user(state, admin_id, &format!("{admin_id}@example.com")).await;
    state
        .workspace_store
        .insert_if_absent(workspace_id, "Acme", None, Some(admin_id), None)
        .await
        .expect("seed workspace");
    state
        .membership_store
        .upsert(workspace_id, admin_id, MemberRole::Admin, None)
        .await
        .expect("seed admin membership");
}
