//! Registration, login, and identity handlers
//!
//! Registration is closed-world: the role comes from the configured
//! whitelist, never from the request body, and unlisted addresses are
//! rejected outright.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::DataResponse;
use crate::AppState;
use peerview_common::{
    auth::{assign_role, hash_password, verify_password, AuthContext},
    db::models::User,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A user as it appears on the wire: everything but the password hash
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserPublic,
}

/// Register a whitelisted user and issue a session token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(AppError::MissingFields {
            message: "Please provide name, email and password".to_string(),
        });
    }

    // Role is forced from the whitelist before anything is persisted
    let role = assign_role(&request.email, &state.config.auth)?;

    if state
        .repo
        .find_user_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateUser);
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .repo
        .create_user(&request.name, &request.email, &password_hash, role)
        .await?;

    let token = state.tokens.issue(user.id, role)?;

    tracing::info!(user_id = %user.id, role = %role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: user.into(),
        }),
    ))
}

/// Authenticate by email and password and issue a session token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::MissingFields {
            message: "Please provide an email and password".to_string(),
        });
    }

    // Unknown address and bad password are indistinguishable to the caller
    let user = match state.repo.find_user_by_email(&request.email).await? {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            return Err(AppError::Unauthorized {
                message: "Invalid credentials".to_string(),
            })
        }
    };

    let token = state.tokens.issue(user.id, user.user_role())?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

/// Current user, resolved from the verified token subject
pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<DataResponse<UserPublic>>> {
    let user = state
        .repo
        .find_user_by_id(ctx.subject)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(DataResponse::new(user.into())))
}

#[derive(Debug, Serialize)]
pub struct ReviewerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// All registered reviewers, identity fields only
pub async fn reviewers(
    State(state): State<AppState>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<DataResponse<Vec<ReviewerSummary>>>> {
    let reviewers = state
        .repo
        .list_reviewers()
        .await?
        .into_iter()
        .map(|user| ReviewerSummary {
            id: user.id,
            name: user.name,
            email: user.email,
        })
        .collect();

    Ok(Json(DataResponse::new(reviewers)))
}
