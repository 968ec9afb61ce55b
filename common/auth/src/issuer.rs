use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::claims::SessionProfile;
use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

/// Signs session tokens with the process-wide HMAC secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Serialize)]
struct SessionClaims<'a> {
    sub: String,
    name: &'a str,
    email: &'a str,
    iat: i64,
    exp: i64,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret()),
            ttl: config.ttl,
        }
    }

    pub fn issue(&self, subject: Uuid, profile: &SessionProfile) -> AuthResult<IssuedToken> {
        self.issue_at(subject, profile, Utc::now())
    }

    /// Issue a token as if signed at `issued_at`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        profile: &SessionProfile,
        issued_at: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let expires_at = issued_at + self.ttl;
        let claims = SessionClaims {
            sub: subject.to_string(),
            name: &profile.name,
            email: &profile.email,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: self.ttl.num_seconds(),
            token_type: "Bearer",
        })
    }
}
