//! Membership lifecycle: creation under the single-active invariant,
//! the on-demand expiry sweep, and cascade deletion.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::db::entities::{member, membership};
use crate::db::prelude::*;
use crate::db::DbConn;
use crate::error::{AppError, Result};

pub struct NewMembership {
    pub member_id: i64,
    pub membership_type_id: i64,
    pub offer_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Fetch a member and verify it belongs to the given branch. Unassigned
/// members (no branch) are invisible to every branch.
pub(crate) async fn find_member_in_branch<C: ConnectionTrait>(
    conn: &C,
    branch_id: i64,
    member_id: i64,
) -> Result<member::Model> {
    let found = Member::find_by_id(member_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    if found.branch_id != Some(branch_id) {
        return Err(AppError::NotFound("Member not found".to_string()));
    }

    Ok(found)
}

/// Fetch a membership and verify branch ownership, resolved through the
/// owning member's branch rather than the membership row itself.
pub(crate) async fn find_membership_in_branch<C: ConnectionTrait>(
    conn: &C,
    branch_id: i64,
    membership_id: i64,
) -> Result<membership::Model> {
    let found = Membership::find_by_id(membership_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

    let owner = Member::find_by_id(found.member_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))?;

    if owner.branch_id != Some(branch_id) {
        return Err(AppError::NotFound("Membership not found".to_string()));
    }

    Ok(found)
}

/// Create a membership for a member of the given branch.
///
/// A member may hold at most one active membership, in any branch; a
/// second one is a conflict. The owning member is marked active along
/// with the new membership.
pub async fn add_membership(
    db: &DbConn,
    branch_id: i64,
    input: NewMembership,
    actor: &str,
) -> Result<membership::Model> {
    let member_id = input.member_id;

    let res: Result<membership::Model> = async {
        let txn = db.begin().await?;

        let owner = find_member_in_branch(&txn, branch_id, input.member_id).await?;

        let kind = MembershipType::find_by_id(input.membership_type_id)
            .one(&txn)
            .await?
            .filter(|t| t.branch_id == branch_id)
            .ok_or_else(|| AppError::NotFound("Membership type not found".to_string()))?;

        if let Some(offer_id) = input.offer_id {
            let offer = Offer::find_by_id(offer_id)
                .one(&txn)
                .await?
                .filter(|o| o.branch_id == branch_id)
                .ok_or_else(|| AppError::NotFound("Offer not found".to_string()))?;
            if offer.membership_type_id != kind.id {
                return Err(AppError::BadRequest(
                    "Offer does not apply to this membership type".to_string(),
                ));
            }
        }

        let active_count = Membership::find()
            .filter(membership::Column::MemberId.eq(owner.id))
            .filter(membership::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        if active_count > 0 {
            return Err(AppError::Conflict(
                "Member already has an active membership".to_string(),
            ));
        }

        let created = membership::ActiveModel {
            branch_id: Set(branch_id),
            member_id: Set(owner.id),
            membership_type_id: Set(kind.id),
            offer_id: Set(input.offer_id),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(true),
            invitations_used: Set(0),
            frozen_days: Set(0),
            created_at: Set(Utc::now()),
            created_by: Set(actor.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if !owner.is_active {
            let mut active_member: member::ActiveModel = owner.into();
            active_member.is_active = Set(true);
            active_member.update(&txn).await?;
        }

        txn.commit().await?;
        Ok(created)
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(member_id, branch_id, error = %e, "add_membership transaction failed");
    }
    res
}

/// Deactivate every membership in the branch whose end date has passed,
/// then deactivate each affected member that has no other active
/// membership left. Idempotent; returns the number of memberships
/// expired.
pub async fn update_expired_memberships(db: &DbConn, branch_id: i64) -> Result<u64> {
    let res: Result<u64> = async {
        let today = Utc::now().date_naive();
        let txn = db.begin().await?;

        let expired = Membership::find()
            .filter(membership::Column::BranchId.eq(branch_id))
            .filter(membership::Column::IsActive.eq(true))
            .filter(membership::Column::EndDate.lte(today))
            .all(&txn)
            .await?;

        let count = expired.len() as u64;

        for row in expired {
            let member_id = row.member_id;

            let mut expiring: membership::ActiveModel = row.into();
            expiring.is_active = Set(false);
            expiring.update(&txn).await?;

            let remaining_active = Membership::find()
                .filter(membership::Column::MemberId.eq(member_id))
                .filter(membership::Column::IsActive.eq(true))
                .count(&txn)
                .await?;

            if remaining_active == 0 {
                if let Some(owner) = Member::find_by_id(member_id).one(&txn).await? {
                    if owner.is_active {
                        let mut inactive_member: member::ActiveModel = owner.into();
                        inactive_member.is_active = Set(false);
                        inactive_member.update(&txn).await?;
                    }
                }
            }
        }

        txn.commit().await?;
        Ok(count)
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(branch_id, error = %e, "expiry sweep failed");
    }
    res
}

/// Delete a membership and its freezes. Returns false when the
/// membership does not exist in this branch; that is not an error.
pub async fn delete_membership(db: &DbConn, branch_id: i64, membership_id: i64) -> Result<bool> {
    let res: Result<bool> = async {
        let txn = db.begin().await?;

        let target = match find_membership_in_branch(&txn, branch_id, membership_id).await {
            Ok(m) => m,
            Err(AppError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        MembershipFreeze::delete_many()
            .filter(crate::db::entities::membership_freeze::Column::MembershipId.eq(membership_id))
            .exec(&txn)
            .await?;

        let member_id = target.member_id;
        let was_active = target.is_active;
        target.delete(&txn).await?;

        if was_active {
            let remaining_active = Membership::find()
                .filter(membership::Column::MemberId.eq(member_id))
                .filter(membership::Column::IsActive.eq(true))
                .count(&txn)
                .await?;
            if remaining_active == 0 {
                if let Some(owner) = Member::find_by_id(member_id).one(&txn).await? {
                    if owner.is_active {
                        let mut inactive_member: member::ActiveModel = owner.into();
                        inactive_member.is_active = Set(false);
                        inactive_member.update(&txn).await?;
                    }
                }
            }
        }

        txn.commit().await?;
        Ok(true)
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(membership_id, branch_id, error = %e, "delete_membership transaction failed");
    }
    res
}

/// Delete all freezes of a membership without touching its dates.
/// Returns false when the membership does not exist in this branch.
pub async fn delete_freezes_for_membership(
    db: &DbConn,
    branch_id: i64,
    membership_id: i64,
) -> Result<bool> {
    match find_membership_in_branch(db, branch_id, membership_id).await {
        Ok(_) => {}
        Err(AppError::NotFound(_)) => return Ok(false),
        Err(e) => return Err(e),
    }

    MembershipFreeze::delete_many()
        .filter(crate::db::entities::membership_freeze::Column::MembershipId.eq(membership_id))
        .exec(db)
        .await?;

    Ok(true)
}

/// Delete a member together with everything hanging off it: freezes,
/// memberships, check-ins, then the member row, in one transaction.
pub async fn delete_member_cascade(db: &DbConn, branch_id: i64, member_id: i64) -> Result<bool> {
    let res: Result<bool> = async {
        let txn = db.begin().await?;

        let target = match find_member_in_branch(&txn, branch_id, member_id).await {
            Ok(m) => m,
            Err(AppError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        let membership_ids: Vec<i64> = Membership::find()
            .filter(membership::Column::MemberId.eq(member_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if !membership_ids.is_empty() {
            MembershipFreeze::delete_many()
                .filter(
                    crate::db::entities::membership_freeze::Column::MembershipId
                        .is_in(membership_ids),
                )
                .exec(&txn)
                .await?;
        }

        Membership::delete_many()
            .filter(membership::Column::MemberId.eq(member_id))
            .exec(&txn)
            .await?;

        Checkin::delete_many()
            .filter(crate::db::entities::checkin::Column::MemberId.eq(member_id))
            .exec(&txn)
            .await?;

        target.delete(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(member_id, branch_id, error = %e, "delete_member_cascade transaction failed");
    }
    res
}
