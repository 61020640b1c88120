use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::{AdminSession, BranchSession};
use crate::db::entities::{branch, member};
use crate::db::prelude::*;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create branches routes
pub fn branches_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_branches).post(create_branch))
        .route("/current", get(get_current_branch))
        .route(
            "/:branch_id",
            get(get_branch).patch(update_branch).delete(delete_branch),
        )
        .route("/:branch_id/activate", post(activate_branch))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranch {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct BranchResponse {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<branch::Model> for BranchResponse {
    fn from(model: branch::Model) -> Self {
        let expires_at = model.expires_at();
        Self {
            id: model.id,
            name: model.name,
            location: model.location,
            is_active: model.is_active,
            created_at: model.created_at,
            expires_at,
        }
    }
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List all branches (admin only)
async fn list_branches(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    AdminSession(_): AdminSession,
) -> Result<Json<Vec<BranchResponse>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let branches = Branch::find()
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(branches.into_iter().map(BranchResponse::from).collect()))
}

/// Get the branch the session is scoped to
async fn get_current_branch(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
) -> Result<Json<BranchResponse>> {
    let found = Branch::find_by_id(session.branch_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    Ok(Json(found.into()))
}

/// Get branch by ID (admin only)
async fn get_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    AdminSession(_): AdminSession,
) -> Result<Json<BranchResponse>> {
    let found = Branch::find_by_id(branch_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    Ok(Json(found.into()))
}

/// Create a new branch (admin only)
async fn create_branch(
    State(state): State<AppState>,
    AdminSession(_): AdminSession,
    Json(data): Json<CreateBranch>,
) -> Result<Json<BranchResponse>> {
    data.validate()?;

    let existing = Branch::find()
        .filter(branch::Column::Name.eq(data.name.as_str()))
        .count(&state.db)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict("Branch name already exists".to_string()));
    }

    let created = branch::ActiveModel {
        name: Set(data.name),
        location: Set(data.location),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created.into()))
}

/// Update branch (admin only)
async fn update_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    AdminSession(_): AdminSession,
    Json(data): Json<UpdateBranch>,
) -> Result<Json<BranchResponse>> {
    let found = Branch::find_by_id(branch_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    if let Some(ref new_name) = data.name {
        if new_name != &found.name {
            let existing = Branch::find()
                .filter(branch::Column::Name.eq(new_name.as_str()))
                .count(&state.db)
                .await?;
            if existing > 0 {
                return Err(AppError::Conflict("Branch name already exists".to_string()));
            }
        }
    }

    let mut updating: branch::ActiveModel = found.into();
    if let Some(name) = data.name {
        updating.name = Set(name);
    }
    if let Some(location) = data.location {
        updating.location = Set(Some(location));
    }
    if let Some(is_active) = data.is_active {
        updating.is_active = Set(is_active);
    }
    let updated = updating.update(&state.db).await?;

    Ok(Json(updated.into()))
}

/// Re-activate a branch (admin only)
async fn activate_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    AdminSession(_): AdminSession,
) -> Result<Json<BranchResponse>> {
    let found = Branch::find_by_id(branch_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let mut activating: branch::ActiveModel = found.into();
    activating.is_active = Set(true);
    let updated = activating.update(&state.db).await?;

    Ok(Json(updated.into()))
}

/// Delete a branch (admin only). Refused while members still belong to
/// it.
async fn delete_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<i64>,
    AdminSession(_): AdminSession,
) -> Result<Json<serde_json::Value>> {
    let found = Branch::find_by_id(branch_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch not found".to_string()))?;

    let member_count = Member::find()
        .filter(member::Column::BranchId.eq(branch_id))
        .count(&state.db)
        .await?;
    if member_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a branch that still has members".to_string(),
        ));
    }

    Branch::delete_by_id(found.id).exec(&state.db).await?;

    Ok(Json(serde_json::json!({"message": "Branch deleted"})))
}
