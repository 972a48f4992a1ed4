//! Role-based authorization rules for projects and tasks.
//!
//! Every permission decision goes through [`authorize`]. Admins may do anything.
//! Members may create projects, read everything, and change only what lives in
//! projects they created. Listing endpoints do not deny; they narrow the result
//! with [`project_scope`] or [`task_scope`] instead.
//!
//! Existence is checked by the caller before authorization, so an unknown id is
//! reported as `NotFound` and an existing but foreign resource as `Forbidden`.

use crate::error::AppError;
use crate::models::{Project, Role};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Assigning or unassigning a task.
    Assign,
}

/// What the action targets, reduced to the facts the rules need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A project that does not exist yet.
    NewProject,
    Project { creator_id: i64 },
    /// A task, existing or about to be created, inside a project.
    Task { project_creator_id: i64 },
}

impl Resource {
    pub fn project(project: &Project) -> Self {
        Resource::Project {
            creator_id: project.creator_id,
        }
    }

    pub fn task_in(project: &Project) -> Self {
        Resource::Task {
            project_creator_id: project.creator_id,
        }
    }

    fn owner_id(&self) -> Option<i64> {
        match self {
            Resource::NewProject => None,
            Resource::Project { creator_id } => Some(*creator_id),
            Resource::Task { project_creator_id } => Some(*project_creator_id),
        }
    }
}

/// Returns whether `identity` may perform `action` on `resource`.
pub fn is_allowed(identity: &Identity, action: Action, resource: &Resource) -> bool {
    match identity.role {
        Role::Admin => true,
        Role::Member => match (action, resource) {
            (Action::Read, _) => true,
            (Action::Create, Resource::NewProject) => true,
            (_, resource) => resource.owner_id() == Some(identity.user_id),
        },
    }
}

/// Like [`is_allowed`], but yields `AppError::Forbidden` on denial.
pub fn authorize(identity: &Identity, action: Action, resource: &Resource) -> Result<(), AppError> {
    if is_allowed(identity, action, resource) {
        return Ok(());
    }

    log::warn!(
        "Denied {:?} on {:?} for user {} ({})",
        action,
        resource,
        identity.user_id,
        identity.role
    );
    Err(AppError::Forbidden(denial_message(action, resource).into()))
}

fn denial_message(action: Action, resource: &Resource) -> &'static str {
    match (action, resource) {
        (Action::Create, Resource::Task { .. }) => "Not authorized to create tasks for this project",
        (Action::Update, Resource::Project { .. }) => "Not authorized to update this project",
        (Action::Delete, Resource::Project { .. }) => "Not authorized to delete this project",
        (Action::Update, Resource::Task { .. }) => "Not authorized to update this task",
        (Action::Delete, Resource::Task { .. }) => "Not authorized to delete this task",
        (Action::Assign, _) => "Not authorized to assign this task",
        _ => "Not enough permissions",
    }
}

/// Which projects a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    CreatedBy(i64),
}

impl ProjectScope {
    pub fn creator_filter(&self) -> Option<i64> {
        match self {
            ProjectScope::All => None,
            ProjectScope::CreatedBy(user_id) => Some(*user_id),
        }
    }
}

/// Which tasks a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    All,
    /// Tasks in projects the user created, plus tasks assigned to the user.
    VisibleTo(i64),
}

pub fn project_scope(identity: &Identity) -> ProjectScope {
    match identity.role {
        Role::Admin => ProjectScope::All,
        Role::Member => ProjectScope::CreatedBy(identity.user_id),
    }
}

pub fn task_scope(identity: &Identity) -> TaskScope {
    match identity.role {
        Role::Admin => TaskScope::All,
        Role::Member => TaskScope::VisibleTo(identity.user_id),
    }
}

/// Users may view their own profile; admins may view anyone's.
pub fn can_view_user(identity: &Identity, user_id: i64) -> bool {
    identity.is_admin() || identity.user_id == user_id
}
