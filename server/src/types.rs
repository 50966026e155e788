use serde::{Deserialize, Serialize};
use taskhive_core::membership::{MemberRole, WorkspaceMemberWithUser};
use taskhive_core::project::{CommentWithAuthor, ProjectRecord, TaskAssignee, TaskWithAssignee};
use taskhive_core::workspace::WorkspaceRecord;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<WorkspaceMemberWithUser> for MemberResponse {
    fn from(member: WorkspaceMemberWithUser) -> Self {
        Self {
            user_id: member.user_id,
            email: member.email,
            name: member.name,
            image_url: member.image_url,
            role: member.role.as_str().to_owned(),
            message: member.message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedMemberResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub role: String,
}

impl AddedMemberResponse {
    pub fn new(workspace_id: String, user_id: String, role: MemberRole) -> Self {
        Self {
            user_id,
            workspace_id,
            role: role.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssigneeResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

impl From<TaskAssignee> for AssigneeResponse {
    fn from(assignee: TaskAssignee) -> Self {
        Self {
            id: assignee.id,
            email: assignee.email,
            name: assignee.name,
            image_url: assignee.image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub body: String,
    #[serde(rename = "authorEmail")]
    pub author_email: String,
    #[serde(rename = "authorName")]
    pub author_name: Option<String>,
}

impl CommentResponse {
    pub fn from_record(comment: CommentWithAuthor) -> Self {
        Self {
            id: comment.id,
            user_id: comment.user_id,
            body: comment.body,
            author_email: comment.author_email,
            author_name: comment.author_name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub status: String,
    pub assignee: Option<AssigneeResponse>,
    pub comments: Vec<CommentResponse>,
}

impl TaskResponse {
    pub fn from_record(task: TaskWithAssignee, comments: Vec<CommentResponse>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            status: task.status,
            assignee: task.assignee.map(AssigneeResponse::from),
            comments,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tasks: Vec<TaskResponse>,
}

impl ProjectResponse {
    pub fn from_record(project: ProjectRecord, tasks: Vec<TaskResponse>) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            tasks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceResponse {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    #[serde(rename = "ownerId")]
    pub owner_id: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub members: Vec<MemberResponse>,
    pub projects: Vec<ProjectResponse>,
}

impl WorkspaceResponse {
    pub fn from_record(
        record: WorkspaceRecord,
        members: Vec<MemberResponse>,
        projects: Vec<ProjectResponse>,
    ) -> Self {
        Self {
            id: record.id,
            name: record.name,
            slug: record.slug,
            owner_id: record.owner_id,
            image_url: record.image_url,
            members,
            projects,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceListResponse {
    pub workspaces: Vec<WorkspaceResponse>,
}
