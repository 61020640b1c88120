use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::BranchSession;
use crate::db::entities::{membership, membership_freeze};
use crate::db::prelude::*;
use crate::error::{AppError, Result};
use crate::services::{freeze, membership as membership_service};
use crate::state::AppState;

/// Create memberships routes
pub fn memberships_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_memberships).post(create_membership))
        .route("/expire-sweep", post(run_expiry_sweep))
        .route("/freezes/:freeze_id", delete(remove_freeze))
        .route(
            "/:membership_id",
            get(get_membership).delete(remove_membership),
        )
        .route(
            "/:membership_id/freezes",
            get(list_freezes)
                .post(create_freeze)
                .delete(remove_all_freezes),
        )
        .route(
            "/:membership_id/freezes/overlap-check",
            get(check_freeze_overlap),
        )
        .route("/:membership_id/freeze-summary", get(get_freeze_summary))
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub member_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMembership {
    pub member_id: i64,
    pub membership_type_id: i64,
    pub offer_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFreeze {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverlapParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct OverlapResponse {
    pub overlaps: bool,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List memberships of the session's branch
async fn list_memberships(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<membership::Model>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let mut query = Membership::find().filter(membership::Column::BranchId.eq(session.branch_id));
    if let Some(member_id) = params.member_id {
        query = query.filter(membership::Column::MemberId.eq(member_id));
    }

    let memberships = query
        .order_by_desc(membership::Column::StartDate)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(memberships))
}

/// Subscribe a member to a membership type
async fn create_membership(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateMembership>,
) -> Result<Json<membership::Model>> {
    if data.end_date < data.start_date {
        return Err(AppError::BadRequest(
            "Membership end date precedes start date".to_string(),
        ));
    }

    let created = membership_service::add_membership(
        &state.db,
        session.branch_id,
        membership_service::NewMembership {
            member_id: data.member_id,
            membership_type_id: data.membership_type_id,
            offer_id: data.offer_id,
            start_date: data.start_date,
            end_date: data.end_date,
        },
        &session.actor,
    )
    .await?;

    Ok(Json(created))
}

/// Get membership by ID
async fn get_membership(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<membership::Model>> {
    let found =
        membership_service::find_membership_in_branch(&state.db, session.branch_id, membership_id)
            .await?;
    Ok(Json(found))
}

/// Delete a membership and its freezes
async fn remove_membership(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let deleted =
        membership_service::delete_membership(&state.db, session.branch_id, membership_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Membership not found".to_string()));
    }

    Ok(Json(serde_json::json!({"message": "Membership deleted"})))
}

/// Deactivate every membership in the branch that has run past its end
/// date
async fn run_expiry_sweep(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let expired =
        membership_service::update_expired_memberships(&state.db, session.branch_id).await?;

    Ok(Json(serde_json::json!({"expired": expired})))
}

/// List freezes of a membership
async fn list_freezes(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<membership_freeze::Model>>> {
    membership_service::find_membership_in_branch(&state.db, session.branch_id, membership_id)
        .await?;

    let freezes = MembershipFreeze::find()
        .filter(membership_freeze::Column::MembershipId.eq(membership_id))
        .order_by_asc(membership_freeze::Column::StartDate)
        .all(&state.db)
        .await?;

    Ok(Json(freezes))
}

/// Freeze a membership over a date range
async fn create_freeze(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateFreeze>,
) -> Result<Json<membership_freeze::Model>> {
    data.validate()?;

    let created = freeze::add_freeze(
        &state.db,
        session.branch_id,
        membership_id,
        freeze::NewFreeze {
            start_date: data.start_date,
            end_date: data.end_date,
            reason: data.reason,
        },
        &session.actor,
    )
    .await?;

    Ok(Json(created))
}

/// Remove a freeze, restoring the membership's original end date
async fn remove_freeze(
    State(state): State<AppState>,
    Path(freeze_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    freeze::delete_freeze(&state.db, session.branch_id, freeze_id).await?;

    Ok(Json(serde_json::json!({"message": "Freeze deleted"})))
}

/// Remove every freeze of a membership without adjusting its dates
async fn remove_all_freezes(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let deleted = membership_service::delete_freezes_for_membership(
        &state.db,
        session.branch_id,
        membership_id,
    )
    .await?;
    if !deleted {
        return Err(AppError::NotFound("Membership not found".to_string()));
    }

    Ok(Json(serde_json::json!({"message": "Freezes deleted"})))
}

/// Pre-validate a freeze range against existing freezes. Shares the
/// overlap predicate with freeze creation.
async fn check_freeze_overlap(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    Query(params): Query<OverlapParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<OverlapResponse>> {
    let overlaps = freeze::has_date_overlap(
        &state.db,
        session.branch_id,
        membership_id,
        params.start_date,
        params.end_date,
    )
    .await?;

    Ok(Json(OverlapResponse { overlaps }))
}

/// Freeze usage and remaining allowances for a membership
async fn get_freeze_summary(
    State(state): State<AppState>,
    Path(membership_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<freeze::FreezeSummary>> {
    let summary = freeze::freeze_summary(&state.db, session.branch_id, membership_id).await?;
    Ok(Json(summary))
}
