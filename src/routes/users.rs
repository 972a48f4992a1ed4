use crate::{
    auth::{policy::can_view_user, AuthenticatedUser},
    error::AppError,
    models::User,
    routes::Pagination,
};
use actix_web::{get, web, HttpResponse, Responder};
use sqlx::SqlitePool;

/// Lists users, e.g. to pick an assignee. Open to every authenticated user.
#[get("")]
pub async fn list_users(
    pool: web::Data<SqlitePool>,
    _caller: AuthenticatedUser,
    page: web::Query<Pagination>,
) -> Result<impl Responder, AppError> {
    let users = User::list(&pool, page.offset(), page.limit()).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Retrieves a single user. Members may only look themselves up.
#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
    user_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let user = User::find_by_id(&pool, user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !can_view_user(caller.identity(), user.id) {
        return Err(AppError::Forbidden(
            "Not enough permissions to view this user's information".into(),
        ));
    }

    Ok(HttpResponse::Ok().json(user))
}
