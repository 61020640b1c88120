use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::BranchSession;
use crate::db::entities::{membership, offer};
use crate::db::prelude::*;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create offers routes
pub fn offers_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_offers).post(create_offer))
        .route(
            "/:offer_id",
            get(get_offer).patch(update_offer).delete(delete_offer),
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
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOffer {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0, max = 100))]
    pub discount_percent: i32,
    pub membership_type_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOffer {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub discount_percent: Option<i32>,
    pub membership_type_id: Option<i64>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Offer names are unique per branch, compared case-insensitively.
async fn name_taken(
    state: &AppState,
    branch_id: i64,
    name: &str,
    exclude_offer: Option<i64>,
) -> Result<bool> {
    let mut query = Offer::find()
        .filter(offer::Column::BranchId.eq(branch_id))
        .filter(Expr::expr(Func::lower(Expr::col(offer::Column::Name))).eq(name.to_lowercase()));
    if let Some(offer_id) = exclude_offer {
        query = query.filter(offer::Column::Id.ne(offer_id));
    }
    Ok(query.count(&state.db).await? > 0)
}

/// An offer may only discount a membership type of its own branch.
async fn check_membership_type(state: &AppState, branch_id: i64, type_id: i64) -> Result<()> {
    MembershipType::find_by_id(type_id)
        .one(&state.db)
        .await?
        .filter(|t| t.branch_id == branch_id)
        .ok_or_else(|| AppError::NotFound("Membership type not found".to_string()))?;
    Ok(())
}

async fn find_offer_in_branch(
    state: &AppState,
    branch_id: i64,
    offer_id: i64,
) -> Result<offer::Model> {
    Offer::find_by_id(offer_id)
        .one(&state.db)
        .await?
        .filter(|o| o.branch_id == branch_id)
        .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List offers of the session's branch
async fn list_offers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<offer::Model>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let offers = Offer::find()
        .filter(offer::Column::BranchId.eq(session.branch_id))
        .order_by_asc(offer::Column::Name)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(offers))
}

/// Get offer by ID
async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<offer::Model>> {
    let found = find_offer_in_branch(&state, session.branch_id, offer_id).await?;
    Ok(Json(found))
}

/// Create an offer in the session's branch
async fn create_offer(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateOffer>,
) -> Result<Json<offer::Model>> {
    data.validate()?;

    if name_taken(&state, session.branch_id, &data.name, None).await? {
        return Err(AppError::Conflict(
            "Offer name already exists in this branch".to_string(),
        ));
    }

    check_membership_type(&state, session.branch_id, data.membership_type_id).await?;

    let created = offer::ActiveModel {
        branch_id: Set(session.branch_id),
        name: Set(data.name),
        discount_percent: Set(data.discount_percent),
        membership_type_id: Set(data.membership_type_id),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        created_by: Set(session.actor),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

/// Update an offer
async fn update_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<i64>,
    BranchSession(session): BranchSession,
    Json(data): Json<UpdateOffer>,
) -> Result<Json<offer::Model>> {
    data.validate()?;

    let found = find_offer_in_branch(&state, session.branch_id, offer_id).await?;

    if let Some(ref new_name) = data.name {
        if !new_name.eq_ignore_ascii_case(&found.name)
            && name_taken(&state, session.branch_id, new_name, Some(offer_id)).await?
        {
            return Err(AppError::Conflict(
                "Offer name already exists in this branch".to_string(),
            ));
        }
    }

    if let Some(type_id) = data.membership_type_id {
        check_membership_type(&state, session.branch_id, type_id).await?;
    }

    let mut updating: offer::ActiveModel = found.into();
    if let Some(name) = data.name {
        updating.name = Set(name);
    }
    if let Some(discount_percent) = data.discount_percent {
        updating.discount_percent = Set(discount_percent);
    }
    if let Some(type_id) = data.membership_type_id {
        updating.membership_type_id = Set(type_id);
    }
    if let Some(is_active) = data.is_active {
        updating.is_active = Set(is_active);
    }
    let updated = updating.update(&state.db).await?;

    Ok(Json(updated))
}

/// Delete an offer. Refused while memberships still reference it.
async fn delete_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let found = find_offer_in_branch(&state, session.branch_id, offer_id).await?;

    let membership_count = Membership::find()
        .filter(membership::Column::OfferId.eq(offer_id))
        .count(&state.db)
        .await?;
    if membership_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete an offer that has memberships".to_string(),
        ));
    }

    Offer::delete_by_id(found.id).exec(&state.db).await?;

    Ok(Json(serde_json::json!({"message": "Offer deleted"})))
}
