use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::BranchSession;
use crate::db::entities::{checkin, member};
use crate::db::prelude::*;
use crate::error::Result;
use crate::services::checkin as checkin_service;
use crate::state::AppState;

/// Create checkins routes
pub fn checkins_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_checkins).post(create_checkin))
        .route("/group", post(create_group_checkin))
        .route("/status/:member_id", get(get_checkin_status))
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
pub struct CreateCheckin {
    pub member_id: i64,
    /// Defaults to now when unset.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GuestRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 3, max = 20))]
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupCheckinRequest {
    pub member_id: i64,
    #[serde(default)]
    pub guests: Vec<GuestRequest>,
}

#[derive(Debug, Serialize)]
pub struct GroupCheckinResponse {
    pub checkin: checkin::Model,
    pub guests: Vec<member::Model>,
}

#[derive(Debug, Serialize)]
pub struct CheckinStatusResponse {
    pub checked_in: bool,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List recent check-ins of the session's branch
async fn list_checkins(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<checkin::Model>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let mut query = Checkin::find().filter(checkin::Column::BranchId.eq(session.branch_id));
    if let Some(member_id) = params.member_id {
        query = query.filter(checkin::Column::MemberId.eq(member_id));
    }

    let checkins = query
        .order_by_desc(checkin::Column::Timestamp)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(checkins))
}

/// Record a single check-in
async fn create_checkin(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateCheckin>,
) -> Result<Json<checkin::Model>> {
    let visit = checkin_service::add_checkin(
        &state.db,
        session.branch_id,
        checkin_service::NewCheckin {
            member_id: data.member_id,
            timestamp: data.timestamp,
        },
        &session.actor,
    )
    .await?;

    Ok(Json(visit))
}

/// Check in a host together with invited guests, registering the guests
/// as new members
async fn create_group_checkin(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<GroupCheckinRequest>,
) -> Result<Json<GroupCheckinResponse>> {
    for guest in &data.guests {
        guest.validate()?;
    }

    let guests = data
        .guests
        .into_iter()
        .map(|g| checkin_service::InvitedGuest {
            name: g.name,
            phone: g.phone,
            notes: g.notes,
        })
        .collect();

    let outcome = checkin_service::create_checkin_with_invitations(
        &state.db,
        session.branch_id,
        data.member_id,
        guests,
        &session.actor,
    )
    .await?;

    Ok(Json(GroupCheckinResponse {
        checkin: outcome.host_checkin,
        guests: outcome.guests,
    }))
}

/// Whether the member checked in at this branch within the last three
/// hours
async fn get_checkin_status(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<CheckinStatusResponse>> {
    let checked_in =
        checkin_service::is_member_checked_in(&state.db, session.branch_id, member_id).await?;

    Ok(Json(CheckinStatusResponse { checked_in }))
}
