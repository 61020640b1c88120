use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::config::CONFIG;
use crate::error::AppError;
use crate::services::security::decode_session_token;
use crate::state::AppState;

/// An authenticated staff session with its resolved branch scope.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque staff account identifier, recorded on created rows.
    pub actor: String,
    pub branch_id: i64,
    pub is_admin: bool,
}

/// Extractor for authenticated staff sessions
pub struct BranchSession(pub Session);

/// Extractor for admin sessions
pub struct AdminSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for BranchSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(BranchSession(extract_session(parts)?))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = extract_session(parts)?;
        if !session.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminSession(session))
    }
}

/// Extract and verify the bearer session token, resolving the branch
/// scope. A token without a branch claim falls back to the configured
/// default branch.
fn extract_session(parts: &Parts) -> Result<Session, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = decode_session_token(token)
        .map_err(|_| AppError::Unauthorized("Invalid or expired session token".to_string()))?;

    Ok(Session {
        actor: claims.sub,
        branch_id: claims.branch_id.unwrap_or(CONFIG.default_branch_id),
        is_admin: claims.is_admin,
    })
}
