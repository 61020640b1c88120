use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::extractors::BranchSession;
use crate::db::entities::{membership, membership_type, offer};
use crate::db::prelude::*;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create membership-types routes
pub fn membership_types_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_membership_types).post(create_membership_type))
        .route(
            "/:type_id",
            get(get_membership_type)
                .patch(update_membership_type)
                .delete(delete_membership_type),
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
pub struct CreateMembershipType {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 1))]
    pub duration_days: i32,
    pub price: Decimal,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub invitation_count: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub freeze_days: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub freeze_count: i32,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMembershipType {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 1))]
    pub duration_days: Option<i32>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub invitation_count: Option<i32>,
    #[validate(range(min = 0))]
    pub freeze_days: Option<i32>,
    #[validate(range(min = 0))]
    pub freeze_count: Option<i32>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Membership type names are unique per branch, compared
/// case-insensitively.
async fn name_taken(
    state: &AppState,
    branch_id: i64,
    name: &str,
    exclude_type: Option<i64>,
) -> Result<bool> {
    let mut query = MembershipType::find()
        .filter(membership_type::Column::BranchId.eq(branch_id))
        .filter(
            Expr::expr(Func::lower(Expr::col(membership_type::Column::Name)))
                .eq(name.to_lowercase()),
        );
    if let Some(type_id) = exclude_type {
        query = query.filter(membership_type::Column::Id.ne(type_id));
    }
    Ok(query.count(&state.db).await? > 0)
}

async fn find_type_in_branch(
    state: &AppState,
    branch_id: i64,
    type_id: i64,
) -> Result<membership_type::Model> {
    MembershipType::find_by_id(type_id)
        .one(&state.db)
        .await?
        .filter(|t| t.branch_id == branch_id)
        .ok_or_else(|| AppError::NotFound("Membership type not found".to_string()))
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

/// List membership types of the session's branch
async fn list_membership_types(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    BranchSession(session): BranchSession,
) -> Result<Json<Vec<membership_type::Model>>> {
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(100);

    let types = MembershipType::find()
        .filter(membership_type::Column::BranchId.eq(session.branch_id))
        .order_by_asc(membership_type::Column::Name)
        .offset(skip)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(types))
}

/// Get membership type by ID
async fn get_membership_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<membership_type::Model>> {
    let found = find_type_in_branch(&state, session.branch_id, type_id).await?;
    Ok(Json(found))
}

/// Create a membership type in the session's branch
async fn create_membership_type(
    State(state): State<AppState>,
    BranchSession(session): BranchSession,
    Json(data): Json<CreateMembershipType>,
) -> Result<Json<membership_type::Model>> {
    data.validate()?;

    if name_taken(&state, session.branch_id, &data.name, None).await? {
        return Err(AppError::Conflict(
            "Membership type name already exists in this branch".to_string(),
        ));
    }

    let created = membership_type::ActiveModel {
        branch_id: Set(session.branch_id),
        name: Set(data.name),
        duration_days: Set(data.duration_days),
        price: Set(data.price),
        invitation_count: Set(data.invitation_count),
        freeze_days: Set(data.freeze_days),
        freeze_count: Set(data.freeze_count),
        description: Set(data.description),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        created_by: Set(session.actor),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok(Json(created))
}

/// Update a membership type
async fn update_membership_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
    BranchSession(session): BranchSession,
    Json(data): Json<UpdateMembershipType>,
) -> Result<Json<membership_type::Model>> {
    data.validate()?;

    let found = find_type_in_branch(&state, session.branch_id, type_id).await?;

    if let Some(ref new_name) = data.name {
        if !new_name.eq_ignore_ascii_case(&found.name)
            && name_taken(&state, session.branch_id, new_name, Some(type_id)).await?
        {
            return Err(AppError::Conflict(
                "Membership type name already exists in this branch".to_string(),
            ));
        }
    }

    let mut updating: membership_type::ActiveModel = found.into();
    if let Some(name) = data.name {
        updating.name = Set(name);
    }
    if let Some(duration_days) = data.duration_days {
        updating.duration_days = Set(duration_days);
    }
    if let Some(price) = data.price {
        updating.price = Set(price);
    }
    if let Some(invitation_count) = data.invitation_count {
        updating.invitation_count = Set(invitation_count);
    }
    if let Some(freeze_days) = data.freeze_days {
        updating.freeze_days = Set(freeze_days);
    }
    if let Some(freeze_count) = data.freeze_count {
        updating.freeze_count = Set(freeze_count);
    }
    if let Some(description) = data.description {
        updating.description = Set(Some(description));
    }
    if let Some(is_active) = data.is_active {
        updating.is_active = Set(is_active);
    }
    let updated = updating.update(&state.db).await?;

    Ok(Json(updated))
}

/// Delete a membership type. Refused while memberships or offers still
/// reference it.
async fn delete_membership_type(
    State(state): State<AppState>,
    Path(type_id): Path<i64>,
    BranchSession(session): BranchSession,
) -> Result<Json<serde_json::Value>> {
    let found = find_type_in_branch(&state, session.branch_id, type_id).await?;

    let membership_count = Membership::find()
        .filter(membership::Column::MembershipTypeId.eq(type_id))
        .count(&state.db)
        .await?;
    if membership_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a membership type that has memberships".to_string(),
        ));
    }

    let offer_count = Offer::find()
        .filter(offer::Column::MembershipTypeId.eq(type_id))
        .count(&state.db)
        .await?;
    if offer_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a membership type that has offers".to_string(),
        ));
    }

    MembershipType::delete_by_id(found.id).exec(&state.db).await?;

    Ok(Json(serde_json::json!({"message": "Membership type deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::services::security::create_session_token;
    use crate::test_helpers::{create_test_branch, create_test_db};

    async fn send_create(app: &Router, token: &str, name: &str) -> StatusCode {
        let body = serde_json::json!({
            "name": name,
            "duration_days": 30,
            "price": "100.00",
            "invitation_count": 2,
            "freeze_days": 30,
            "freeze_count": 3
        });
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();

        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_type_names_unique_per_branch_case_insensitive() {
        let db = create_test_db().await;
        let gym_a = create_test_branch(&db, "Downtown").await;
        let gym_b = create_test_branch(&db, "Uptown").await;
        let app = membership_types_routes(AppState::new(db));

        let token_a = create_session_token("staff-1", Some(gym_a.id), false).unwrap();
        let token_b = create_session_token("staff-2", Some(gym_b.id), false).unwrap();

        assert_eq!(send_create(&app, &token_a, "Gold").await, StatusCode::OK);
        // The same name in another branch is fine.
        assert_eq!(send_create(&app, &token_b, "Gold").await, StatusCode::OK);
        // A case-insensitive duplicate within the branch conflicts.
        assert_eq!(
            send_create(&app, &token_a, "GOLD").await,
            StatusCode::CONFLICT
        );
        assert_eq!(
            send_create(&app, &token_b, "gold").await,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_requests_without_token_are_unauthorized() {
        let db = create_test_db().await;
        let app = membership_types_routes(AppState::new(db));

        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
