use std::sync::Arc;

use axum::extract::FromRef;
use common_auth::{JwtVerifier, TokenIssuer};
use common_crypto::CredentialHasher;
use common_security::RoleDirectory;

use crate::media::ImageStore;
use crate::metrics::StorefrontMetrics;
use crate::store::{AccountRoles, CatalogRepository, UserRepository};

/// Shared application state used by handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) users: Arc<dyn UserRepository>,
    pub(crate) catalog: Arc<dyn CatalogRepository>,
    pub(crate) media: Arc<dyn ImageStore>,
    pub(crate) roles: Arc<dyn RoleDirectory>,
    pub(crate) token_issuer: Arc<TokenIssuer>,
    pub(crate) jwt_verifier: Arc<JwtVerifier>,
    pub(crate) hasher: Arc<CredentialHasher>,
    pub(crate) metrics: Arc<StorefrontMetrics>,
}

impl AppState {
    /// Role lookups go through `users`, so the gate always sees the stored role.
    pub fn new(
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
        media: Arc<dyn ImageStore>,
        token_issuer: Arc<TokenIssuer>,
        jwt_verifier: Arc<JwtVerifier>,
        hasher: Arc<CredentialHasher>,
        metrics: Arc<StorefrontMetrics>,
    ) -> Self {
        let roles: Arc<dyn RoleDirectory> = Arc::new(AccountRoles::new(users.clone()));
        Self {
            users,
            catalog,
            media,
            roles,
            token_issuer,
            jwt_verifier,
            hasher,
            metrics,
        }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_verifier.clone()
    }
}

impl FromRef<AppState> for Arc<dyn RoleDirectory> {
    fn from_ref(state: &AppState) -> Self {
        state.roles.clone()
    }
}
