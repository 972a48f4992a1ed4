use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;

use crate::db;

/// Health check endpoint
///
/// Reports the service status and, when a store is configured, whether it answers.
#[get("/health")]
pub async fn health(pool: Option<web::Data<SqlitePool>>) -> impl Responder {
    let mut body = json!({
        "status": "healthy",
        "service": "Kanban Board API",
        "timestamp": Utc::now()
    });

    if let Some(pool) = pool {
        let database = if db::ping(&pool).await { "ok" } else { "unavailable" };
        body["database"] = json!(database);
    }

    HttpResponse::Ok().json(body)
}

/// Welcome endpoint listing the API's entry points.
#[get("/")]
pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Welcome to Kanban Board API",
        "endpoints": {
            "auth": "/auth - Authentication endpoints (signup, login, me)",
            "projects": "/projects - Project management endpoints",
            "tasks": "/tasks - Task management endpoints",
            "users": "/users - User lookup endpoints",
            "health": "/health - Service health"
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(actix_web::App::new().service(health)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "healthy");
        assert!(json["timestamp"].is_string());
        assert!(json.get("database").is_none());
    }

    #[actix_web::test]
    async fn test_health_endpoint_reports_database() {
        let pool = db::connect(&db::DatabaseConfig::in_memory()).await.unwrap();
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(pool))
                .service(health),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["database"], "ok");
    }

    #[actix_web::test]
    async fn test_root_endpoint() {
        let app = test::init_service(actix_web::App::new().service(root)).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["message"], "Welcome to Kanban Board API");
        assert!(json["endpoints"]["tasks"].is_string());
    }
}
