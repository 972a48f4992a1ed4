use crate::{
    auth::{
        authorize,
        policy::{task_scope, Action, Resource},
        AuthenticatedUser,
    },
    error::AppError,
    models::{Project, Task, TaskInput, TaskQuery, TaskStatusUpdate, TaskUpdate},
    routes::{projects::load_project, Pagination},
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

/// Loads a task and the project it belongs to, or fails with `404`.
async fn load_task(pool: &SqlitePool, id: i64) -> Result<(Task, Project), AppError> {
    let task = Task::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    let project = load_project(pool, task.project_id).await?;
    Ok((task, project))
}

/// Lists tasks visible to the caller.
///
/// Admins see every task. Members see tasks in projects they created and tasks
/// assigned to them.
///
/// ## Query Parameters:
/// - `skip`, `limit` (optional): pagination.
/// - `project_id` (optional): only tasks of this project; `404` if it does not exist.
/// - `status` (optional): `todo`, `in_progress` or `done`.
/// - `assigned_to_me` (optional, default false): only tasks assigned to the caller.
#[get("")]
pub async fn list_tasks(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    if let Some(project_id) = query_params.project_id {
        load_project(&pool, project_id).await?;
    }

    let page = Pagination::new(query_params.skip, query_params.limit);
    let tasks = Task::list(
        &pool,
        task_scope(caller.identity()),
        &query_params,
        caller.user_id(),
        page.offset(),
        page.limit(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a task inside a project.
///
/// ## Responses:
/// - `201 Created`: the new task.
/// - `403 Forbidden`: a member tried to add a task to someone else's project.
/// - `404 Not Found`: the project or the initial assignee does not exist.
/// - `422 Unprocessable Entity`: the payload failed validation.
#[post("")]
pub async fn create_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalized();
    input.validate()?;

    let project = load_project(&pool, input.project_id).await?;
    authorize(caller.identity(), Action::Create, &Resource::task_in(&project))?;

    let task = Task::create(&pool, input).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a task by its id.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let (task, project) = load_task(&pool, task_id.into_inner()).await?;
    authorize(caller.identity(), Action::Read, &Resource::task_in(&project))?;

    Ok(HttpResponse::Ok().json(task))
}

/// Updates the supplied fields of a task.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let changes = task_data.into_inner().normalized();
    changes.validate()?;

    let (task, project) = load_task(&pool, task_id.into_inner()).await?;
    authorize(caller.identity(), Action::Update, &Resource::task_in(&project))?;

    let updated = Task::update(&pool, task.id, changes).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Changes only the status of a task.
#[patch("/{id}/status")]
pub async fn update_task_status(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
    status_data: web::Json<TaskStatusUpdate>,
) -> Result<impl Responder, AppError> {
    let (task, project) = load_task(&pool, task_id.into_inner()).await?;
    authorize(caller.identity(), Action::Update, &Resource::task_in(&project))?;

    let updated = Task::set_status(&pool, task.id, status_data.status).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let (task, project) = load_task(&pool, task_id.into_inner()).await?;
    authorize(caller.identity(), Action::Delete, &Resource::task_in(&project))?;

    if !Task::delete(&pool, task.id).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Task deleted successfully" })))
}

/// Assigns a task to a user.
///
/// ## Responses:
/// - `200 OK`: the updated task.
/// - `403 Forbidden`: a member tried to assign a task outside their projects.
/// - `404 Not Found`: the task or the target user does not exist. The task is
///   left unchanged.
#[post("/{id}/assign/{user_id}")]
pub async fn assign_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    path: web::Path<(i64, i64)>,
) -> Result<impl Responder, AppError> {
    let (task_id, user_id) = path.into_inner();
    let (task, project) = load_task(&pool, task_id).await?;
    authorize(caller.identity(), Action::Assign, &Resource::task_in(&project))?;

    let updated = Task::assign(&pool, task.id, user_id).await?;
    log::info!("Task {} assigned to user {}", updated.id, user_id);

    Ok(HttpResponse::Ok().json(updated))
}

/// Removes the assignee from a task.
#[post("/{id}/unassign")]
pub async fn unassign_task(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let (task, project) = load_task(&pool, task_id.into_inner()).await?;
    authorize(caller.identity(), Action::Assign, &Resource::task_in(&project))?;

    let updated = Task::unassign(&pool, task.id).await?;
    Ok(HttpResponse::Ok().json(updated))
}
