//! Membership freeze engine: inclusive date-range arithmetic over
//! freeze periods, with the membership end date pushed out on add and
//! pulled back on delete.

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;

use crate::db::entities::{membership, membership_freeze};
use crate::db::prelude::*;
use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::services::membership::find_membership_in_branch;

pub struct NewFreeze {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FreezeSummary {
    pub freeze_count: i64,
    pub remaining_freeze_count: i64,
    pub total_freeze_days: i64,
    pub remaining_freeze_days: i64,
}

/// Two inclusive ranges overlap iff they share at least one day.
/// Adjacent ranges (one ends the day before the other starts) do not.
fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && e1 >= s2
}

/// Inclusive day count of a range: both endpoints count.
fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

async fn overlapping_freeze_exists<C: ConnectionTrait>(
    conn: &C,
    membership_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<bool> {
    let existing = MembershipFreeze::find()
        .filter(membership_freeze::Column::MembershipId.eq(membership_id))
        .all(conn)
        .await?;

    Ok(existing
        .iter()
        .any(|f| ranges_overlap(start, end, f.start_date, f.end_date)))
}

/// Freeze a membership over an inclusive date range.
///
/// Fails with NotFound when the membership does not belong to the
/// branch (through its owning member), and with Conflict when the range
/// touches any existing freeze of the same membership. On success the
/// freeze row is inserted and the membership's end date and frozen-day
/// counter grow by the inclusive duration, all in one transaction.
pub async fn add_freeze(
    db: &DbConn,
    branch_id: i64,
    membership_id: i64,
    input: NewFreeze,
    actor: &str,
) -> Result<membership_freeze::Model> {
    if input.end_date < input.start_date {
        return Err(AppError::BadRequest(
            "Freeze end date precedes start date".to_string(),
        ));
    }

    let res: Result<membership_freeze::Model> = async {
        let txn = db.begin().await?;

        let target = find_membership_in_branch(&txn, branch_id, membership_id).await?;

        if overlapping_freeze_exists(&txn, membership_id, input.start_date, input.end_date).await? {
            return Err(AppError::Conflict(
                "Freeze dates overlap an existing freeze for this membership".to_string(),
            ));
        }

        let duration = inclusive_days(input.start_date, input.end_date);

        let freeze = membership_freeze::ActiveModel {
            branch_id: Set(branch_id),
            membership_id: Set(membership_id),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            reason: Set(input.reason),
            created_at: Set(Utc::now().date_naive()),
            created_by: Set(actor.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let new_end = target.end_date + Duration::days(duration);
        let new_frozen = target.frozen_days + duration as i32;
        let mut frozen: membership::ActiveModel = target.into();
        frozen.end_date = Set(new_end);
        frozen.frozen_days = Set(new_frozen);
        frozen.update(&txn).await?;

        txn.commit().await?;
        Ok(freeze)
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(membership_id, branch_id, error = %e, "add_freeze transaction failed");
    }
    res
}

/// Remove a freeze, undoing exactly what `add_freeze` did: the
/// membership's end date moves back by the freeze's inclusive duration
/// and the frozen-day counter shrinks by the same amount (floored at
/// zero), in one transaction.
pub async fn delete_freeze(db: &DbConn, branch_id: i64, freeze_id: i64) -> Result<()> {
    let res: Result<()> = async {
        let txn = db.begin().await?;

        let freeze = MembershipFreeze::find_by_id(freeze_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Freeze not found".to_string()))?;

        let target = find_membership_in_branch(&txn, branch_id, freeze.membership_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound("Freeze not found".to_string()),
                other => other,
            })?;

        let duration = freeze.duration_days();

        let new_end = target.end_date - Duration::days(duration);
        let new_frozen = (target.frozen_days as i64 - duration).max(0) as i32;
        let mut unfrozen: membership::ActiveModel = target.into();
        unfrozen.end_date = Set(new_end);
        unfrozen.frozen_days = Set(new_frozen);
        unfrozen.update(&txn).await?;

        freeze.delete(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(freeze_id, branch_id, error = %e, "delete_freeze transaction failed");
    }
    res
}

/// Read-only variant of the overlap check used by `add_freeze`. Shares
/// the same predicate so validation and creation cannot disagree.
pub async fn has_date_overlap(
    db: &DbConn,
    branch_id: i64,
    membership_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<bool> {
    find_membership_in_branch(db, branch_id, membership_id).await?;
    overlapping_freeze_exists(db, membership_id, start, end).await
}

/// Freeze usage for a membership, re-derived from the freeze rows
/// rather than the stored counter, with remaining allowances drawn from
/// the membership's type.
pub async fn freeze_summary(
    db: &DbConn,
    branch_id: i64,
    membership_id: i64,
) -> Result<FreezeSummary> {
    let target = find_membership_in_branch(db, branch_id, membership_id).await?;

    let kind = MembershipType::find_by_id(target.membership_type_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Membership type not found".to_string()))?;

    let freezes = MembershipFreeze::find()
        .filter(membership_freeze::Column::MembershipId.eq(membership_id))
        .all(db)
        .await?;

    let freeze_count = freezes.len() as i64;
    let total_freeze_days: i64 = freezes.iter().map(|f| f.duration_days()).sum();

    Ok(FreezeSummary {
        freeze_count,
        remaining_freeze_count: (kind.freeze_count as i64 - freeze_count).max(0),
        total_freeze_days,
        remaining_freeze_days: (kind.freeze_days as i64 - total_freeze_days).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        create_test_branch, create_test_db, create_test_member, create_test_membership,
        create_test_membership_type,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup_membership(db: &crate::db::DbConn) -> (i64, membership::Model) {
        let gym = create_test_branch(db, "Downtown").await;
        let member = create_test_member(db, gym.id, "Lena", "0100").await;
        let kind = create_test_membership_type(db, gym.id, "Gold").await;
        let subscription = create_test_membership(
            db,
            gym.id,
            member.id,
            kind.id,
            date(2025, 1, 1),
            date(2025, 3, 1),
            true,
        )
        .await;
        (gym.id, subscription)
    }

    #[test]
    fn test_inclusive_day_arithmetic() {
        // A single day counts as one day of freeze.
        assert_eq!(inclusive_days(date(2025, 1, 10), date(2025, 1, 10)), 1);
        assert_eq!(inclusive_days(date(2025, 1, 10), date(2025, 1, 20)), 11);
    }

    #[test]
    fn test_ranges_overlap_predicate() {
        let (s, e) = (date(2025, 1, 10), date(2025, 1, 20));

        // Sharing any day overlaps.
        assert!(ranges_overlap(date(2025, 1, 15), date(2025, 1, 25), s, e));
        assert!(ranges_overlap(date(2025, 1, 5), date(2025, 1, 10), s, e));
        assert!(ranges_overlap(date(2025, 1, 20), date(2025, 1, 20), s, e));
        assert!(ranges_overlap(date(2025, 1, 1), date(2025, 2, 1), s, e));

        // Touching at the boundary (end == other start - 1) does not.
        assert!(!ranges_overlap(date(2025, 1, 21), date(2025, 1, 25), s, e));
        assert!(!ranges_overlap(date(2025, 1, 1), date(2025, 1, 9), s, e));
    }

    #[tokio::test]
    async fn test_add_freeze_extends_membership() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;

        let freeze = add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 10),
                end_date: date(2025, 1, 20),
                reason: Some("travel".to_string()),
            },
            "staff-1",
        )
        .await
        .unwrap();

        assert_eq!(freeze.duration_days(), 11);

        let updated = Membership::find_by_id(subscription.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.end_date, date(2025, 3, 12));
        assert_eq!(updated.frozen_days, 11);
    }

    #[tokio::test]
    async fn test_add_then_delete_freeze_round_trips() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;
        let original_end = subscription.end_date;
        let original_frozen = subscription.frozen_days;

        let freeze = add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 2, 1),
                end_date: date(2025, 2, 14),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        delete_freeze(&db, branch_id, freeze.id).await.unwrap();

        let restored = Membership::find_by_id(subscription.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(restored.end_date, original_end);
        assert_eq!(restored.frozen_days, original_frozen);
    }

    #[tokio::test]
    async fn test_overlapping_freeze_rejected() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;

        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 10),
                end_date: date(2025, 1, 20),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        let before = Membership::find_by_id(subscription.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();

        let err = add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 15),
                end_date: date(2025, 1, 25),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The rejected freeze mutated nothing.
        let after = Membership::find_by_id(subscription.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.end_date, before.end_date);
        assert_eq!(after.frozen_days, before.frozen_days);
        let freeze_rows = MembershipFreeze::find().all(&db).await.unwrap();
        assert_eq!(freeze_rows.len(), 1);
    }

    #[tokio::test]
    async fn test_adjacent_freeze_accepted_and_check_agrees() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;

        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 10),
                end_date: date(2025, 1, 20),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        // Validation endpoint and create must agree: overlapping range is
        // flagged, the adjacent one is not.
        assert!(has_date_overlap(
            &db,
            branch_id,
            subscription.id,
            date(2025, 1, 15),
            date(2025, 1, 25)
        )
        .await
        .unwrap());
        assert!(!has_date_overlap(
            &db,
            branch_id,
            subscription.id,
            date(2025, 1, 21),
            date(2025, 1, 25)
        )
        .await
        .unwrap());

        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 21),
                end_date: date(2025, 1, 25),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_freeze_on_foreign_branch_membership_not_found() {
        let db = create_test_db().await;
        let (_, subscription) = setup_membership(&db).await;
        let other = create_test_branch(&db, "Uptown").await;

        let err = add_freeze(
            &db,
            other.id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 10),
                end_date: date(2025, 1, 20),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let summary_err = freeze_summary(&db, other.id, subscription.id)
            .await
            .unwrap_err();
        assert!(matches!(summary_err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_freeze_not_found() {
        let db = create_test_db().await;
        let (branch_id, _) = setup_membership(&db).await;

        let err = delete_freeze(&db, branch_id, 777).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;

        let err = add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 20),
                end_date: date(2025, 1, 10),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_freeze_summary_derives_from_rows() {
        let db = create_test_db().await;
        let (branch_id, subscription) = setup_membership(&db).await;

        // Gold allows 3 freezes and 30 freeze days (test seed defaults).
        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 1, 10),
                end_date: date(2025, 1, 14),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();
        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 2, 1),
                end_date: date(2025, 2, 10),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        let summary = freeze_summary(&db, branch_id, subscription.id).await.unwrap();
        assert_eq!(summary.freeze_count, 2);
        assert_eq!(summary.total_freeze_days, 5 + 10);
        assert_eq!(summary.remaining_freeze_count, 1);
        assert_eq!(summary.remaining_freeze_days, 15);

        // Usage beyond the allowance reports zero remaining, not negative.
        add_freeze(
            &db,
            branch_id,
            subscription.id,
            NewFreeze {
                start_date: date(2025, 2, 15),
                end_date: date(2025, 3, 10),
                reason: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        let summary = freeze_summary(&db, branch_id, subscription.id).await.unwrap();
        assert_eq!(summary.freeze_count, 3);
        assert_eq!(summary.total_freeze_days, 39);
        assert_eq!(summary.remaining_freeze_count, 0);
        assert_eq!(summary.remaining_freeze_days, 0);
    }
}
