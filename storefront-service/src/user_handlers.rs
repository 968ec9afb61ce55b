use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use common_auth::{AuthContext, SessionProfile};
use common_http_errors::{ApiError, ApiResult};
use common_security::Role;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::schemas::{CreateSessionRequest, CreateUserRequest};
use crate::store::{NewUserRecord, StoreError, UserRecord};
use crate::validation::Valid;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// A user as shown to clients; the password hash never leaves the store layer.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub token: String,
}

fn email_taken() -> ApiError {
    ApiError::conflict("email_taken", "email already registered")
}

pub async fn create_user(
    State(state): State<AppState>,
    Valid(req): Valid<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let CreateUserRequest { name, email, password } = req;

    if state
        .users
        .find_by_email(&email)
        .await
        .map_err(ApiError::internal)?
        .is_some()
    {
        return Err(email_taken());
    }

    let password_hash = state.hasher.hash(&password).map_err(ApiError::internal)?;
    let user = state
        .users
        .insert_user(NewUserRecord {
            name,
            email,
            password_hash,
            role: Role::User,
        })
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => email_taken(),
            other => ApiError::internal(other),
        })?;

    state.metrics.registration();
    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn create_session(
    State(state): State<AppState>,
    Valid(req): Valid<CreateSessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let CreateSessionRequest { email, password } = req;

    let user = match state.users.find_by_email(&email).await.map_err(ApiError::internal)? {
        Some(user) => user,
        None => {
            state.hasher.verify_decoy(&password);
            state.metrics.login_attempt("unknown_email");
            return Err(ApiError::unauthorized("invalid_credentials", INVALID_CREDENTIALS));
        }
    };

    if !state.hasher.verify(&password, &user.password_hash) {
        state.metrics.login_attempt("bad_password");
        warn!(user_id = %user.id, "login rejected");
        return Err(ApiError::unauthorized("invalid_credentials", INVALID_CREDENTIALS));
    }

    let issued = state
        .token_issuer
        .issue(user.id, &SessionProfile::new(&user.name, &user.email))
        .map_err(ApiError::from)?;
    state.metrics.login_attempt("success");

    Ok(Json(SessionResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        token: issued.token,
    }))
}

pub async fn current_user(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UserView>> {
    let user = state
        .users
        .find_by_id(auth.subject())
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::not_found("user_not_found", "user not found"))?;
    Ok(Json(user.into()))
}
