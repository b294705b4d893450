//! Request middleware: authorization guard, rate limiting, request metrics

pub mod rate_limit;

use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use peerview_common::{
    auth::{extract_token, AuthContext, Role},
    errors::{AppError, Result},
    metrics::RequestMetrics,
};
use std::convert::Infallible;

const REVIEW_ROLES: &[Role] = &[Role::Reviewer, Role::Admin];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Verify the bearer credential and build the request's identity context
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext> {
    let token = extract_token(headers, &state.config.auth.token_header).ok_or_else(|| {
        AppError::Unauthorized {
            message: "No token, authorization denied".to_string(),
        }
    })?;

    let claims = state.tokens.verify(token)?;

    Ok(AuthContext {
        subject: claims.subject_id()?,
        role: claims.role,
    })
}

/// Authorize the request against `allowed` and attach the verified context.
///
/// An empty slice admits any authenticated caller. Missing or invalid
/// credentials fail as 401; a valid credential outside the set fails as 403.
async fn authorize(
    state: AppState,
    allowed: &[Role],
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let ctx = authenticate(&state, request.headers())?;
    ctx.require_any(allowed)?;
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}

/// Any authenticated caller
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    authorize(state, &[], request, next).await
}

/// Reviewer or admin
pub async fn require_review_role(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    authorize(state, REVIEW_ROLES, request, next).await
}

/// Admin only
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    authorize(state, ADMIN_ONLY, request, next).await
}

/// The caller's identity when a valid credential is present, without
/// failing the request otherwise. Used by the public submit endpoint to
/// link submissions to logged-in authors while still allowing anonymous
/// submission.
pub struct OptionalAuth(pub Option<AuthContext>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate(state, &parts.headers).ok()))
    }
}

/// Record request count and latency per method and path
pub async fn track_requests(request: Request, next: Next) -> Response {
    let metrics = RequestMetrics::start(request.method().as_str(), request.uri().path());
    let response = next.run(request).await;
    metrics.finish(response.status().as_u16());
    response
}
