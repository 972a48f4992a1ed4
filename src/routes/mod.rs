pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use crate::error::AppError;
use actix_web::web;
use serde::Deserialize;

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// `skip`/`limit` query parameters shared by the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Self {
        Self { skip, limit }
    }

    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// Extractor failures (bad JSON, form, query or path) become 422 responses with
/// the usual `{"detail": ...}` body.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    );
}

/// Registers every route of the API.
///
/// Expects `web::Data<SqlitePool>` and `web::Data<TokenService>` in the app data and
/// `AuthMiddleware` wrapped around the app. Paths are registered without a
/// trailing slash; wrap the app in `NormalizePath::trim()` to accept `/projects/`.
pub fn config(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);

    cfg.service(health::root)
        .service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::signup)
                .service(auth::login)
                .service(auth::login_json)
                .service(auth::me),
        )
        .service(
            web::scope("/projects")
                .service(projects::list_projects)
                .service(projects::create_project)
                .service(projects::get_project)
                .service(projects::update_project)
                .service(projects::delete_project),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::list_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::update_task_status)
                .service(tasks::delete_task)
                .service(tasks::assign_task)
                .service(tasks::unassign_task),
        )
        .service(
            web::scope("/users")
                .service(users::list_users)
                .service(users::get_user),
        );
}
