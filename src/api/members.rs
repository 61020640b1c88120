use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::BranchSession;
use crate::db::entities::member;
use crate::db::prelude::*;
use crate::error::{AppError, Result};
use crate::services::checkin::next_member_code;
use crate::services::membership::{delete_member_cascade, find_member_in_branch};
use crate::state::AppState;

/// Create members routes
pub fn members_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_members).post(create_member))
        .route(
            "/:member_id",
            get(get_member).patch(update_member).delete(delete_member),
        )
        .with_state(state)
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by name substring.
    pub q: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMember {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 3, max = 20))]
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMember {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 20))]
    pub phone: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

async fn phone_taken(
    state: &AppState,
    branch_id: i64,
    phone: &str,
    exclude_member: Option<i64>,
) -> Result<bool> {
    let mut query = Member::find()
        .filter(member::Column::BranchId.eq(branch_id))
        .filter(member::Column::Phone.eq(phone));
    if let Some(member_id) = exclude_member {
        query = query.filter(member::Column::Id.ne(member_id));
    }
    Ok(query.count(&state.db).await? > 0)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List members of the session's branch
async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<member::Model>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let mut query = Member::find().filter(member::Column::BranchId.eq(session.branch_id));
    if let Some(ref q) = params.q {
        query = query.filter(member::Column::Name.contains(q));
    }

    let members = query
        .order_by_asc(member::Column::Code)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(members))
}

/// Register a new member in the session's branch
async fn create_member(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateMember>,
) -> Result<Json<member::Model>> {
    data.validate()?;

    if phone_taken(&state, session.branch_id, &data.phone, None).await? {
        return Err(AppError::Conflict(
            "Phone number already registered in this branch".to_string(),
        ));
    }

    let code = next_member_code(&state.db, session.branch_id).await?;

    let created = member::ActiveModel {
        branch_id: Set(Some(session.branch_id)),
        code: Set(code),
        name: Set(data.name),
        phone: Set(data.phone),
        is_active: Set(false),
        notes: Set(data.notes),
        created_at: Set(Utc::now()),
        created_by: Set(session.actor),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

/// Get member by ID
async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<member::Model>> {
    let found = find_member_in_branch(&state.db, session.branch_id, member_id).await?;
    Ok(Json(found))
}

/// Update member details
async fn update_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    BranchSession(session): BranchSession,
    Json(data): Json<UpdateMember>,
) -> Result<Json<member::Model>> {
    data.validate()?;

    let found = find_member_in_branch(&state.db, session.branch_id, member_id).await?;

    if let Some(ref phone) = data.phone {
        if phone != &found.phone
            && phone_taken(&state, session.branch_id, phone, Some(member_id)).await?
        {
            return Err(AppError::Conflict(
                "Phone number already registered in this branch".to_string(),
            ));
        }
    }

    let mut updating: member::ActiveModel = found.into();
    if let Some(name) = data.name {
        updating.name = Set(name);
    }
    if let Some(phone) = data.phone {
        updating.phone = Set(phone);
    }
    if let Some(notes) = data.notes {
        updating.notes = Set(Some(notes));
    }
    let updated = updating.update(&state.db).await?;

    Ok(Json(updated))
}

/// Delete a member and everything that hangs off it
async fn delete_member(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let deleted = delete_member_cascade(&state.db, session.branch_id, member_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Member not found".to_string()));
    }

    Ok(Json(serde_json::json!({"message": "Member deleted"})))
}
