pub mod credentials;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod token;

use crate::models::Role;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use policy::{authorize, Action, Identity, Resource};
pub use token::{Claims, TokenError, TokenService};

lazy_static! {
    // Regex for username validation: alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Passwords need at least one letter and one digit.
fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_letter && has_digit {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_strength");
        error.message = Some("Password must contain at least one letter and one number".into());
        Err(error)
    }
}

/// Payload of `POST /auth/signup`.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    /// 3 to 50 characters: letters, digits, underscores or hyphens.
    #[validate(
        length(min = 3, max = 50),
        regex(
            path = "USERNAME_REGEX",
            message = "Username can only contain letters, numbers, underscores, and hyphens"
        )
    )]
    pub username: String,
    /// 8 to 128 characters with at least one letter and one digit.
    #[validate(length(min = 8, max = 128), custom = "validate_password_strength")]
    pub password: String,
    /// Defaults to `member`.
    #[serde(default)]
    pub role: Role,
}

impl SignupRequest {
    /// Lowercases the email and trims the username.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            ..self
        }
    }
}

/// Payload of `POST /auth/login/json`.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Form body of `POST /auth/login`.
///
/// `username` may hold either the username or the email address.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Returned by both login endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}
