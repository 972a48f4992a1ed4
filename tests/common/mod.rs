#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{test, web, App};
use chrono::Duration;
use serde_json::json;
use sqlx::SqlitePool;
use taskboard::auth::{AuthMiddleware, TokenResponse, TokenService};
use taskboard::db::{self, DatabaseConfig};
use taskboard::models::User;
use taskboard::routes;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "password123";

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, Duration::minutes(30))
}

pub async fn test_pool() -> SqlitePool {
    db::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to create in-memory database")
}

/// The full application as `main` assembles it, backed by `pool`.
pub async fn init_app(
    pool: SqlitePool,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool))
            .app_data(web::Data::new(token_service()))
            .configure(routes::config)
            .wrap(AuthMiddleware)
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            ),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

// Helper struct to hold auth details
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

pub async fn signup_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    username: &str,
    role: &str,
) -> Result<User, String> {
    let req = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(&json!({
            "email": email,
            "username": username,
            "password": PASSWORD,
            "role": role
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if status != actix_web::http::StatusCode::CREATED {
        return Err(format!(
            "Failed to sign up {}. Status: {}. Body: {}",
            email,
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    serde_json::from_slice(&body).map_err(|e| format!("Failed to parse signup response: {}", e))
}

pub async fn login_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
) -> Result<String, String> {
    let req = test::TestRequest::post()
        .uri("/auth/login/json")
        .set_json(&json!({ "email": email, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to log in {}. Status: {}. Body: {}",
            email,
            status,
            String::from_utf8_lossy(&body)
        ));
    }
    let token: TokenResponse = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse login response: {}", e))?;
    Ok(token.access_token)
}

/// Signs a user up and logs them in.
pub async fn register_and_login(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    username: &str,
    role: &str,
) -> TestUser {
    let user = signup_user(app, email, username, role)
        .await
        .expect("signup failed");
    let token = login_user(app, email).await.expect("login failed");
    TestUser { id: user.id, token }
}
