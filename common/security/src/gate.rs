use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use common_auth::{AuthContext, JwtVerifier};
use common_http_errors::ApiError;
use tracing::warn;
use uuid::Uuid;

use crate::roles::{ensure_role, Role};
use crate::SecurityError;

/// Source of truth for account roles.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// `Ok(None)` when no account exists for `subject`.
    async fn role_of(&self, subject: Uuid) -> Result<Option<Role>, SecurityError>;
}

/// Re-reads the subject's role from `directory` and checks it against `required`.
pub async fn require_role(
    directory: &dyn RoleDirectory,
    subject: Uuid,
    required: Role,
) -> Result<Role, SecurityError> {
    let role = directory
        .role_of(subject)
        .await?
        .ok_or(SecurityError::UnknownSubject)?;
    if let Err(err) = ensure_role(role, required) {
        warn!(subject = %subject, actual = %role, %required, "role_check_failed");
        return Err(err);
    }
    Ok(role)
}

/// An authenticated request whose subject currently holds the admin role.
///
/// Runs the bearer-token extraction first, then consults the
/// [`RoleDirectory`]; claims inside the token never grant a role.
#[derive(Debug, Clone)]
pub struct AdminContext(pub AuthContext);

impl AdminContext {
    pub fn subject(&self) -> Uuid {
        self.0.subject()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminContext
where
    Arc<JwtVerifier>: FromRef<S>,
    Arc<dyn RoleDirectory>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        let directory = Arc::<dyn RoleDirectory>::from_ref(state);
        require_role(directory.as_ref(), auth.subject(), Role::Admin).await?;
        Ok(AdminContext(auth))
    }
}
