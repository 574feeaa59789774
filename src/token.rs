// src/token.rs

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::Role;

/// Lifetime of an issued bearer token.
pub const TOKEN_TTL_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &str, role: Role) -> Result<String, ApiError> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(&self, user_id: &str, role: Role, now: DateTime<Utc>) -> Result<String, ApiError> {
        let claims = Claims {
            user_id: user_id.to_string(),
            role,
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Error signing token: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, ApiError> {
        self.decode_at(token, Utc::now())
    }

    /// Valid while `now < exp`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        // Expiry is checked against `now` below so it can be pinned in tests.
        validation.validate_exp = false;
        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!("Token decode error: {}", e);
                ApiError::unauthorized("Invalid token")
            })?
            .claims;
        if now.timestamp() >= claims.exp {
            return Err(ApiError::unauthorized("Token expired"));
        }
        Ok(claims)
    }
}
