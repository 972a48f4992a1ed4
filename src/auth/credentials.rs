//! Signup and login against the `users` table.

use super::password::{hash_password, verify_password};
use super::token::TokenService;
use super::SignupRequest;
use crate::error::AppError;
use crate::models::{NewUser, User};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use validator::Validate;

pub const DUPLICATE_EMAIL: &str = "Email already registered";
pub const DUPLICATE_USERNAME: &str = "Username already taken";
pub const INVALID_CREDENTIALS: &str = "Incorrect email or password";

lazy_static! {
    // Checked when no account matches, so an unknown identifier costs a full bcrypt verify.
    static ref DUMMY_PASSWORD_HASH: String =
        bcrypt::hash("taskboard-no-such-account", bcrypt::DEFAULT_COST).unwrap_or_default();
}

/// Creates a user account.
///
/// The uniqueness pre-checks give precise messages; the UNIQUE constraints still
/// decide when two signups race for the same email or username.
pub async fn signup(pool: &SqlitePool, request: SignupRequest) -> Result<User, AppError> {
    let request = request.normalized();
    request.validate()?;

    if User::find_by_email(pool, &request.email).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
    }
    if User::find_by_username(pool, &request.username).await?.is_some() {
        return Err(AppError::Conflict(DUPLICATE_USERNAME.into()));
    }

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser {
        email: request.email,
        username: request.username,
        password_hash,
        role: request.role,
    };

    let user = User::create(pool, new_user)
        .await
        .map_err(duplicate_from_constraint)?;

    log::info!("Created user {} ({}) with role {}", user.id, user.username, user.role);
    Ok(user)
}

/// Tells which UNIQUE constraint rejected an insert into `users`.
fn duplicate_from_constraint(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let message = db_error.message();
            if message.contains("users.username") {
                return AppError::Conflict(DUPLICATE_USERNAME.into());
            }
            return AppError::Conflict(DUPLICATE_EMAIL.into());
        }
    }
    error.into()
}

/// Checks a password and returns the matching user.
///
/// An unknown identifier and a wrong password produce the same error.
pub async fn authenticate(
    pool: &SqlitePool,
    identifier: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = User::find_by_login(pool, identifier).await?;

    match check_password(user, password) {
        Some(user) => Ok(user),
        None => {
            log::warn!("Failed login attempt for {}", identifier);
            Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()))
        }
    }
}

/// Runs bcrypt against the account's hash, or the dummy hash when there is no
/// account, and keeps the user only on a match.
fn check_password(user: Option<User>, password: &str) -> Option<User> {
    let stored_hash = user
        .as_ref()
        .map_or(DUMMY_PASSWORD_HASH.as_str(), |user| user.password_hash.as_str());
    let matches = verify_password(password, stored_hash);
    user.filter(|_| matches)
}

/// Authenticates and issues an access token.
pub async fn login(
    pool: &SqlitePool,
    tokens: &TokenService,
    identifier: &str,
    password: &str,
) -> Result<String, AppError> {
    let user = authenticate(pool, identifier, password).await?;
    let token = tokens.issue(user.id, user.role)?;
    log::info!("User {} logged in", user.id);
    Ok(token)
}
