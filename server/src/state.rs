use std::sync::Arc;

use taskhive_core::{
    db::Database, membership::MembershipStore, project::ProjectStore, reconcile::ReconcileEngine,
    user::UserStore, workspace::WorkspaceStore,
};

#[derive(Clone)]
pub struct AppState {
    pub user_store: UserStore,
    pub workspace_store: WorkspaceStore,
    pub membership_store: MembershipStore,
    pub project_store: ProjectStore,
    pub reconciler: Arc<ReconcileEngine>,
}

/// Construct all stores and the reconciliation engine from a single database
/// handle. Built once at process start and injected everywhere; nothing here
/// is a module-level singleton.
pub fn build_state(database: &Database) -> AppState {
    AppState {
        user_store: UserStore::new(database),
        workspace_store: WorkspaceStore::new(database),
        membership_store: MembershipStore::new(database),
        project_store: ProjectStore::new(database),
        reconciler: Arc::new(ReconcileEngine::new(database)),
    }
}
