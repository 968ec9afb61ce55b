use std::fmt;
use std::sync::Arc;

use chrono::Duration;

/// Session tokens stay valid for 30 days after issuance.
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

/// Runtime configuration for session token signing and verification.
///
/// Built once at startup and handed by reference to [`crate::TokenIssuer`]
/// and [`crate::JwtVerifier`]. Rotating the secret invalidates every
/// outstanding token.
#[derive(Clone)]
pub struct JwtConfig {
    secret: Arc<[u8]>,
    /// Lifetime of an issued token.
    pub ttl: Duration,
    /// Allowable clock skew in seconds when validating exp.
    pub leeway_seconds: u32,
}

impl JwtConfig {
    /// Construct config with a 30 day lifetime and no leeway.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl: Duration::days(DEFAULT_SESSION_TTL_DAYS),
            leeway_seconds: 0,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Adjust the allowed leeway.
    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_days() {
        let config = JwtConfig::new("secret");
        assert_eq!(config.ttl, Duration::days(30));
        assert_eq!(config.leeway_seconds, 0);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = JwtConfig::new("super-secret-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
