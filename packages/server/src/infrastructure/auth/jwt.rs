//! HS256 session token verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, AuthenticatedUser, TokenVerifier, UserId};

/// Session token claims.
///
/// Field names follow the tokens minted by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: u64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Validates (and, for tooling and tests, issues) HS256 session tokens
pub struct JwtTokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; no clock skew allowance
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `user_id` valid for `ttl` (negative `ttl` yields an expired token).
    ///
    /// # Errors
    ///
    /// Returns the signing error from `jsonwebtoken`.
    pub fn issue(
        &self,
        user_id: u64,
        username: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e.to_string()),
            }
        })?;

        let claims = data.claims;
        let user_id = UserId::new(claims.user_id)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;
        if claims.username.trim().is_empty() {
            return Err(AuthError::InvalidClaims("username is empty".to_string()));
        }

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username,
        })
    }
}
