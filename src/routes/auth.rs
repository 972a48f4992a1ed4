use crate::{
    auth::{
        credentials, AuthenticatedUser, LoginForm, LoginRequest, SignupRequest, TokenResponse,
        TokenService,
    },
    error::AppError,
    models::User,
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::SqlitePool;
use validator::Validate;

/// Register a new user
///
/// Creates a user account and returns it without the password hash.
///
/// ## Responses:
/// - `201 Created`: the new user.
/// - `409 Conflict`: the email or username is already in use.
/// - `422 Unprocessable Entity`: the payload failed validation.
#[post("/signup")]
pub async fn signup(
    pool: web::Data<SqlitePool>,
    signup_data: web::Json<SignupRequest>,
) -> Result<impl Responder, AppError> {
    let user = credentials::signup(&pool, signup_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Login with a form body
///
/// OAuth2 password-flow compatible: `username` may be the username or the email.
#[post("/login")]
pub async fn login(
    pool: web::Data<SqlitePool>,
    tokens: web::Data<TokenService>,
    form: web::Form<LoginForm>,
) -> Result<impl Responder, AppError> {
    form.validate()?;

    let token = credentials::login(&pool, &tokens, &form.username, &form.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(token, tokens.expires_in())))
}

/// Login with a JSON body
#[post("/login/json")]
pub async fn login_json(
    pool: web::Data<SqlitePool>,
    tokens: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let token = credentials::login(&pool, &tokens, &login_data.email, &login_data.password).await?;
    Ok(HttpResponse::Ok().json(TokenResponse::bearer(token, tokens.expires_in())))
}

/// Current user
///
/// Returns the account behind the bearer token. A token whose user no longer
/// exists is rejected with `401`.
#[get("/me")]
pub async fn me(
    pool: web::Data<SqlitePool>,
    caller: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = User::find_by_id(&pool, caller.user_id())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".into()))?;

    Ok(HttpResponse::Ok().json(user))
}
