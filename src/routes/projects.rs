use crate::{
    auth::{
        authorize,
        policy::{project_scope, Action, Resource},
        AuthenticatedUser,
    },
    error::AppError,
    models::{Project, ProjectInput, ProjectUpdate, ProjectWithTasks, Task},
    routes::Pagination,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

/// Loads a project or fails with `404`.
pub(crate) async fn load_project(pool: &SqlitePool, id: i64) -> Result<Project, AppError> {
    Project::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

/// Lists projects visible to the caller.
///
/// Admins see every project; members see only the projects they created.
///
/// ## Query Parameters:
/// - `skip` (optional, default 0)
/// - `limit` (optional, default 100)
#[get("")]
pub async fn list_projects(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    page: web::Query<Pagination>,
) -> Result<impl Responder, AppError> {
    let scope = project_scope(caller.identity());
    let projects = Project::list(&pool, scope.creator_filter(), page.offset(), page.limit()).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Creates a project owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new project.
/// - `422 Unprocessable Entity`: the name or description failed validation.
#[post("")]
pub async fn create_project(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    project_data: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    let input = project_data.into_inner().normalized();
    input.validate()?;
    authorize(caller.identity(), Action::Create, &Resource::NewProject)?;

    let project = Project::create(&pool, input, caller.user_id()).await?;
    log::info!("User {} created project {}", caller.user_id(), project.id);

    Ok(HttpResponse::Created().json(project))
}

/// Retrieves a project together with its tasks.
#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    project_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let project = load_project(&pool, project_id.into_inner()).await?;
    authorize(caller.identity(), Action::Read, &Resource::project(&project))?;

    let tasks = Task::list_for_project(&pool, project.id).await?;
    Ok(HttpResponse::Ok().json(ProjectWithTasks { project, tasks }))
}

/// Updates the supplied fields of a project.
///
/// Only the creator or an admin may update a project.
#[put("/{id}")]
pub async fn update_project(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    project_id: web::Path<i64>,
    project_data: web::Json<ProjectUpdate>,
) -> Result<impl Responder, AppError> {
    let changes = project_data.into_inner().normalized();
    changes.validate()?;

    let project = load_project(&pool, project_id.into_inner()).await?;
    authorize(caller.identity(), Action::Update, &Resource::project(&project))?;

    let updated = Project::update(&pool, project.id, changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a project and, with it, all of its tasks.
///
/// Only the creator or an admin may delete a project.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    project_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let project = load_project(&pool, project_id.into_inner()).await?;
    authorize(caller.identity(), Action::Delete, &Resource::project(&project))?;

    if !Project::delete(&pool, project.id).await? {
        return Err(AppError::NotFound("Project not found".into()));
    }
    log::info!("User {} deleted project {}", caller.user_id(), project.id);

    Ok(HttpResponse::Ok().json(json!({ "message": "Project deleted successfully" })))
}
