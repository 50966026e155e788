// Workspace read/write handlers.
//
// Session verification happens upstream at the identity proxy; the caller's
// user id arrives in the x-identity-user header.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use taskhive_core::membership::MemberRole;

use crate::{
    error::AppError,
    state::AppState,
    types::{
        AddMemberRequest, AddedMemberResponse, CommentResponse, MemberResponse, ProjectResponse,
        TaskResponse, WorkspaceListResponse, WorkspaceResponse,
    },
};

const IDENTITY_HEADER: &str = "x-identity-user";

fn require_identity(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(IDENTITY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| AppError::unauthorized("missing caller identity"))
}

pub(crate) async fn get_user_workspaces_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_identity(&headers)?;

    let records = state.workspace_store.list_for_user(&user_id).await?;

    let mut workspaces = Vec::with_capacity(records.len());
    for record in records {
        let members = state
            .membership_store
            .list_members_with_users(&record.id)
            .await?
            .into_iter()
            .map(MemberResponse::from)
            .collect();
        let projects = load_projects(&state, &record.id).await?;
        workspaces.push(WorkspaceResponse::from_record(record, members, projects));
    }

    Ok(Json(WorkspaceListResponse { workspaces }))
}

/// Assemble the projects → tasks → comments nesting from three
/// workspace-scoped queries.
async fn load_projects(state: &AppState, workspace_id: &str) -> Result<Vec<ProjectResponse>, AppError> {
    let projects = state.project_store.list_for_workspace(workspace_id).await?;
    let tasks = state
        .project_store
        .list_tasks_for_workspace(workspace_id)
        .await?;
    let comments = state
        .project_store
        .list_comments_for_workspace(workspace_id)
        .await?;

    let mut comments_by_task: HashMap<String, Vec<CommentResponse>> = HashMap::new();
    for comment in comments {
        comments_by_task
            .entry(comment.task_id.clone())
            .or_default()
            .push(CommentResponse::from_record(comment));
    }

    let mut tasks_by_project: HashMap<String, Vec<TaskResponse>> = HashMap::new();
    for task in tasks {
        let task_comments = comments_by_task.remove(&task.id).unwrap_or_default();
        tasks_by_project
            .entry(task.project_id.clone())
            .or_default()
            .push(TaskResponse::from_record(task, task_comments));
    }

    Ok(projects
        .into_iter()
        .map(|project| {
            let project_tasks = tasks_by_project.remove(&project.id).unwrap_or_default();
            ProjectResponse::from_record(project, project_tasks)
        })
        .collect())
}

pub(crate) async fn list_members_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_identity(&headers)?;

    if state
        .membership_store
        .get(&workspace_id, &user_id)
        .await?
        .is_none()
    {
        return Err(AppError::forbidden("workspace membership required"));
    }

    let members: Vec<MemberResponse> = state
        .membership_store
        .list_members_with_users(&workspace_id)
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(members))
}

pub(crate) async fn add_member_handler(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller_id = require_identity(&headers)?;

    if payload.email.trim().is_empty() {
        return Err(AppError::bad_request("email must not be empty"));
    }

    let role = MemberRole::parse(&payload.role)
        .ok_or_else(|| AppError::bad_request("role must be ADMIN or MEMBER"))?;

    if state
        .workspace_store
        .find_by_id(&workspace_id)
        .await?
        .is_none()
    {
        return Err(AppError::workspace_not_found(&workspace_id));
    }

    let caller = state.membership_store.get(&workspace_id, &caller_id).await?;
    if !matches!(caller.map(|member| member.role), Some(MemberRole::Admin)) {
        return Err(AppError::forbidden("admin access required"));
    }

    let user = state
        .user_store
        .find_by_email(payload.email.trim())
        .await?
        .ok_or_else(|| AppError::user_not_found(payload.email.trim()))?;

    let inserted = state
        .membership_store
        .insert_if_absent(&workspace_id, &user.id, role, payload.message.as_deref())
        .await?;

    if !inserted {
        return Err(AppError::conflict("user is already a member"));
    }

    Ok((
        StatusCode::CREATED,
        Json(AddedMemberResponse::new(workspace_id, user.id, role)),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use crate::{
        router::build_router,
        test_support::{seed_user, seed_workspace_with_admin, setup_state},
    };

    fn add_member_request(
        workspace_id: &str,
        caller: &str,
        body: serde_json::Value,
    ) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/workspaces/{workspace_id}/members"))
            .header("content-type", "application/json")
            .header("x-identity-user", caller)
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    #[tokio::test]
    async fn admin_can_add_member_by_email() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;
        seed_user(&state, "user_2", "bob@example.com").await;

        let app = build_router(state.clone());
        let response = app
            .oneshot(add_member_request(
                "org_1",
                "user_admin",
                json!({ "email": "bob@example.com", "role": "member" }),
            ))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["userId"], "user_2");
        assert_eq!(body["role"], "MEMBER");

        let member = state
            .membership_store
            .get("org_1", "user_2")
            .await
            .expect("lookup")
            .expect("member exists");
        assert_eq!(member.role.as_str(), "MEMBER");
    }

    #[tokio::test]
    async fn non_admin_cannot_add_members() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;
        seed_user(&state, "user_2", "bob@example.com").await;

        let app = build_router(state);
        let response = app
            .oneshot(add_member_request(
                "org_1",
                "user_2",
                json!({ "email": "bob@example.com", "role": "member" }),
            ))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_email_returns_not_found() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;

        let app = build_router(state);
        let response = app
            .oneshot(add_member_request(
                "org_1",
                "user_admin",
                json!({ "email": "nobody@example.com", "role": "member" }),
            ))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_member_returns_conflict() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;
        seed_user(&state, "user_2", "bob@example.com").await;

        let app = build_router(state.clone());
        let first = app
            .clone()
            .oneshot(add_member_request(
                "org_1",
                "user_admin",
                json!({ "email": "bob@example.com", "role": "member" }),
            ))
            .await
            .expect("dispatch");
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(add_member_request(
                "org_1",
                "user_admin",
                json!({ "email": "bob@example.com", "role": "admin" }),
            ))
            .await
            .expect("dispatch");
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // The existing row kept its original role.
        let member = state
            .membership_store
            .get("org_1", "user_2")
            .await
            .expect("lookup")
            .expect("member exists");
        assert_eq!(member.role.as_str(), "MEMBER");
    }

    #[tokio::test]
    async fn invalid_role_returns_bad_request() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;
        seed_user(&state, "user_2", "bob@example.com").await;

        let app = build_router(state);
        let response = app
            .oneshot(add_member_request(
                "org_1",
                "user_admin",
                json!({ "email": "bob@example.com", "role": "owner" }),
            ))
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn workspace_list_requires_identity_header() {
        let (_tmp, _database, state) = setup_state().await;

        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/workspaces")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn workspace_list_includes_members() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;

        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/workspaces")
                    .header("x-identity-user", "user_admin")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["workspaces"][0]["id"], "org_1");
        assert_eq!(body["workspaces"][0]["members"][0]["role"], "ADMIN");
        assert_eq!(body["workspaces"][0]["projects"], json!([]));
    }

    #[tokio::test]
    async fn workspace_list_nests_projects_tasks_and_comments() {
        let (_tmp, _database, state) = setup_state().await;
        seed_workspace_with_admin(&state, "org_1", "user_admin").await;

        state
            .project_store
            .create("proj_1", "org_1", "Launch", Some("Q3 launch"))
            .await
            .expect("create project");
        state
            .project_store
            .create_task("task_1", "proj_1", "Ship it", "IN_PROGRESS", Some("user_admin"))
            .await
            .expect("create task");
        state
            .project_store
            .add_comment("comment_1", "task_1", "user_admin", "on it")
            .await
            .expect("add comment");

        let app = build_router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/workspaces")
                    .header("x-identity-user", "user_admin")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("dispatch");

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let project = &body["workspaces"][0]["projects"][0];
        assert_eq!(project["id"], "proj_1");
        assert_eq!(project["name"], "Launch");
        assert_eq!(project["description"], "Q3 launch");

        let task = &project["tasks"][0];
        assert_eq!(task["title"], "Ship it");
        assert_eq!(task["status"], "IN_PROGRESS");
        assert_eq!(task["assignee"]["id"], "user_admin");
        assert_eq!(task["assignee"]["email"], "user_admin@example.com");

        let comment = &task["comments"][0];
        assert_eq!(comment["body"], "on it");
        assert_eq!(comment["userId"], "user_admin");
        assert_eq!(comment["authorEmail"], "user_admin@example.com");
    }
}
