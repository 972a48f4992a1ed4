use crate::config::Config;
use crate::error::AppError;
use crate::models::Role;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default lifetime of an access token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject of the token: the user's id, carried as a JSON string.
    #[serde(with = "subject")]
    pub sub: i64,
    /// Role of the user at the time the token was issued.
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

/// Registered claim `sub` is a string; user ids travel in that form.
mod subject {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(user_id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&user_id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The current time is past the encoded expiry.
    Expired,
    /// Bad signature, undecodable token or missing claims.
    Malformed,
    /// The token could not be signed.
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::Malformed => write!(f, "Could not validate credentials"),
            TokenError::Signing(msg) => write!(f, "Failed to generate token: {}", msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::Signing(_) => AppError::InternalServerError(error.to_string()),
            TokenError::Expired | TokenError::Malformed => AppError::Unauthorized(error.to_string()),
        }
    }
}

/// Issues and verifies HS256 session tokens.
///
/// The service is stateless: expiry is the only way a token stops being valid.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_token_expire_minutes),
        )
    }

    /// Token lifetime in seconds.
    pub fn expires_in(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issues a token for `user_id` that expires after the configured ttl.
    pub fn issue(&self, user_id: i64, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies the signature and expiry of `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies `token` as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        // Expiry is checked below against `now`, without leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(
            "test_secret_for_tokens",
            Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        )
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = service();
        let token = tokens.issue(7, Role::Admin).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
        assert_eq!(tokens.expires_in(), 1800);
    }

    #[test]
    fn test_token_expires_after_thirty_minutes() {
        let tokens = service();
        let issued_at = Utc::now();
        let token = tokens.issue_at(3, Role::Member, issued_at).unwrap();

        let still_valid = tokens.verify_at(&token, issued_at + Duration::minutes(29));
        assert_eq!(still_valid.unwrap().sub, 3);

        let expired = tokens.verify_at(&token, issued_at + Duration::minutes(31));
        assert_eq!(expired, Err(TokenError::Expired));
    }

    #[test]
    fn test_token_expired_in_the_past_is_rejected() {
        let tokens = service();
        let token = tokens
            .issue_at(2, Role::Member, Utc::now() - Duration::hours(2))
            .unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = TokenService::new("a_completely_different_secret", Duration::minutes(30))
            .issue(1, Role::Admin)
            .unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_garbage_and_incomplete_tokens_are_malformed() {
        let tokens = service();
        assert_eq!(tokens.verify("not-a-jwt"), Err(TokenError::Malformed));

        // Correctly signed, but without the role claim.
        #[derive(Serialize)]
        struct Partial {
            sub: i64,
            exp: i64,
        }
        let partial = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: 1,
                exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(b"test_secret_for_tokens"),
        )
        .unwrap();
        assert_eq!(tokens.verify(&partial), Err(TokenError::Malformed));
    }

    #[test]
    fn test_subject_is_encoded_as_string() {
        let tokens = service();
        let token = tokens.issue(42, Role::Member).unwrap();

        let decoded = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"test_secret_for_tokens"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims["sub"], "42");
        assert_eq!(tokens.verify(&token).unwrap().sub, 42);
    }

    #[test]
    fn test_non_numeric_subject_is_malformed() {
        #[derive(Serialize)]
        struct Foreign {
            sub: String,
            role: Role,
            iat: i64,
            exp: i64,
            jti: Uuid,
        }
        let now = Utc::now();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Foreign {
                sub: "alice".into(),
                role: Role::Admin,
                iat: now.timestamp(),
                exp: (now + Duration::minutes(5)).timestamp(),
                jti: Uuid::new_v4(),
            },
            &EncodingKey::from_secret(b"test_secret_for_tokens"),
        )
        .unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_token_errors_map_to_unauthorized() {
        let error: AppError = TokenError::Expired.into();
        assert!(matches!(error, AppError::Unauthorized(msg) if msg == "Token has expired"));

        let error: AppError = TokenError::Signing("boom".into()).into();
        assert!(matches!(error, AppError::InternalServerError(_)));
    }
}
