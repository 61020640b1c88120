//! Check-in recorder and invitation quota tracker. Group check-ins
//! register invited guests as new members and count them against the
//! host membership's invitation allowance, all in one transaction.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::db::entities::{checkin, member, membership};
use crate::db::prelude::*;
use crate::db::DbConn;
use crate::error::{AppError, Result};
use crate::services::membership::find_member_in_branch;

/// Check-ins within this window count as "already checked in".
const RECENT_CHECKIN_WINDOW_HOURS: i64 = 3;

pub struct NewCheckin {
    pub member_id: i64,
    /// Defaults to now when unset.
    pub timestamp: Option<DateTime<Utc>>,
}

pub struct InvitedGuest {
    pub name: String,
    pub phone: String,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct GroupCheckin {
    pub host_checkin: checkin::Model,
    pub guests: Vec<member::Model>,
}

/// Next sequential member number for a branch: highest existing code
/// plus one, starting at 1 for an empty branch.
pub(crate) async fn next_member_code<C: ConnectionTrait>(conn: &C, branch_id: i64) -> Result<i64> {
    let last = Member::find()
        .filter(member::Column::BranchId.eq(branch_id))
        .order_by_desc(member::Column::Code)
        .one(conn)
        .await?;

    Ok(last.map(|m| m.code + 1).unwrap_or(1))
}

/// Record a single check-in for a member of the branch.
pub async fn add_checkin(
    db: &DbConn,
    branch_id: i64,
    input: NewCheckin,
    actor: &str,
) -> Result<checkin::Model> {
    let target = find_member_in_branch(db, branch_id, input.member_id).await?;

    let visit = checkin::ActiveModel {
        branch_id: Set(branch_id),
        member_id: Set(target.id),
        timestamp: Set(input.timestamp.unwrap_or_else(Utc::now)),
        created_by: Set(actor.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(visit)
}

/// True when the member checked in at this branch within the last three
/// hours. Sliding window, not calendar-day based.
pub async fn is_member_checked_in(db: &DbConn, branch_id: i64, member_id: i64) -> Result<bool> {
    let cutoff = Utc::now() - Duration::hours(RECENT_CHECKIN_WINDOW_HOURS);

    let recent = Checkin::find()
        .filter(checkin::Column::BranchId.eq(branch_id))
        .filter(checkin::Column::MemberId.eq(member_id))
        .filter(checkin::Column::Timestamp.gt(cutoff))
        .count(db)
        .await?;

    Ok(recent > 0)
}

/// Check in a host together with invited guests.
///
/// Each guest becomes a new inactive member with the next sequential
/// branch code and gets a check-in at the same timestamp. The guest
/// count is charged against the host's current active membership (most
/// recent by start date); exceeding its invitation allowance aborts the
/// whole operation, including every staged insert. A guest phone
/// already registered in the branch is a conflict.
pub async fn create_checkin_with_invitations(
    db: &DbConn,
    branch_id: i64,
    host_member_id: i64,
    guests: Vec<InvitedGuest>,
    actor: &str,
) -> Result<GroupCheckin> {
    let res: Result<GroupCheckin> = async {
        let txn = db.begin().await?;

        let host = find_member_in_branch(&txn, branch_id, host_member_id).await?;
        let now = Utc::now();

        let host_checkin = checkin::ActiveModel {
            branch_id: Set(branch_id),
            member_id: Set(host.id),
            timestamp: Set(now),
            created_by: Set(actor.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut created_guests = Vec::with_capacity(guests.len());
        for guest in &guests {
            let already_registered = Member::find()
                .filter(member::Column::BranchId.eq(branch_id))
                .filter(member::Column::Phone.eq(guest.phone.as_str()))
                .count(&txn)
                .await?;
            if already_registered > 0 {
                return Err(AppError::Conflict(format!(
                    "Guest with phone {} is already registered in this branch",
                    guest.phone
                )));
            }

            let code = next_member_code(&txn, branch_id).await?;
            let new_member = member::ActiveModel {
                branch_id: Set(Some(branch_id)),
                code: Set(code),
                name: Set(guest.name.clone()),
                phone: Set(guest.phone.clone()),
                is_active: Set(false),
                notes: Set(guest.notes.clone()),
                created_at: Set(now),
                created_by: Set(actor.to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            checkin::ActiveModel {
                branch_id: Set(branch_id),
                member_id: Set(new_member.id),
                timestamp: Set(now),
                created_by: Set(actor.to_string()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            created_guests.push(new_member);
        }

        // Charge the guests against the host's current active membership.
        // A host without one is not subject to any ceiling.
        if !guests.is_empty() {
            let current = Membership::find()
                .filter(membership::Column::MemberId.eq(host.id))
                .filter(membership::Column::IsActive.eq(true))
                .order_by_desc(membership::Column::StartDate)
                .one(&txn)
                .await?;

            if let Some(active_membership) = current {
                let kind = MembershipType::find_by_id(active_membership.membership_type_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound("Membership type not found".to_string())
                    })?;

                let new_used = active_membership.invitations_used + guests.len() as i32;
                if new_used > kind.invitation_count {
                    return Err(AppError::Conflict(
                        "Member has exceeded the maximum invitations for this membership"
                            .to_string(),
                    ));
                }

                let mut charged: membership::ActiveModel = active_membership.into();
                charged.invitations_used = Set(new_used);
                charged.update(&txn).await?;
            }
        }

        txn.commit().await?;
        Ok(GroupCheckin {
            host_checkin,
            guests: created_guests,
        })
    }
    .await;

    if let Err(AppError::Database(e)) = &res {
        tracing::error!(host_member_id, branch_id, error = %e, "group check-in transaction failed");
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        create_test_branch, create_test_db, create_test_member, create_test_membership,
        create_test_membership_type,
    };
    use chrono::NaiveDate;

    fn days_from_today(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    fn guest(name: &str, phone: &str) -> InvitedGuest {
        InvitedGuest {
            name: name.to_string(),
            phone: phone.to_string(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_add_checkin_defaults_to_now() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let member = create_test_member(&db, gym.id, "Lena", "0100").await;

        let visit = add_checkin(
            &db,
            gym.id,
            NewCheckin {
                member_id: member.id,
                timestamp: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        assert_eq!(visit.member_id, member.id);
        assert!((Utc::now() - visit.timestamp).num_seconds() < 5);
        assert_eq!(visit.created_by, "staff-1");
    }

    #[tokio::test]
    async fn test_add_checkin_foreign_branch_member() {
        let db = create_test_db().await;
        let gym_a = create_test_branch(&db, "Downtown").await;
        let gym_b = create_test_branch(&db, "Uptown").await;
        let member_b = create_test_member(&db, gym_b.id, "Omar", "0200").await;

        let err = add_checkin(
            &db,
            gym_a.id,
            NewCheckin {
                member_id: member_b.id,
                timestamp: None,
            },
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_recent_checkin_window() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let member = create_test_member(&db, gym.id, "Lena", "0100").await;

        // A visit two hours ago falls inside the 3-hour window.
        add_checkin(
            &db,
            gym.id,
            NewCheckin {
                member_id: member.id,
                timestamp: Some(Utc::now() - Duration::hours(2)),
            },
            "staff-1",
        )
        .await
        .unwrap();
        assert!(is_member_checked_in(&db, gym.id, member.id).await.unwrap());

        // Re-dated to four hours ago it no longer counts.
        let visit = Checkin::find().one(&db).await.unwrap().unwrap();
        let mut redated: checkin::ActiveModel = visit.into();
        redated.timestamp = Set(Utc::now() - Duration::hours(4));
        redated.update(&db).await.unwrap();
        assert!(!is_member_checked_in(&db, gym.id, member.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_checkin_window_is_branch_scoped() {
        let db = create_test_db().await;
        let gym_a = create_test_branch(&db, "Downtown").await;
        let gym_b = create_test_branch(&db, "Uptown").await;
        let member = create_test_member(&db, gym_a.id, "Lena", "0100").await;

        add_checkin(
            &db,
            gym_a.id,
            NewCheckin {
                member_id: member.id,
                timestamp: None,
            },
            "staff-1",
        )
        .await
        .unwrap();

        assert!(is_member_checked_in(&db, gym_a.id, member.id).await.unwrap());
        assert!(!is_member_checked_in(&db, gym_b.id, member.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_checkin_registers_guests_with_sequential_codes() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let host = create_test_member(&db, gym.id, "Lena", "0100").await;
        let kind = create_test_membership_type(&db, gym.id, "Gold").await;
        create_test_membership(
            &db,
            gym.id,
            host.id,
            kind.id,
            days_from_today(0),
            days_from_today(30),
            true,
        )
        .await;

        let outcome = create_checkin_with_invitations(
            &db,
            gym.id,
            host.id,
            vec![guest("Sami", "0501"), guest("Nour", "0502")],
            "staff-1",
        )
        .await
        .unwrap();

        assert_eq!(outcome.guests.len(), 2);
        assert_eq!(outcome.guests[0].code, host.code + 1);
        assert_eq!(outcome.guests[1].code, host.code + 2);
        assert!(outcome.guests.iter().all(|g| !g.is_active));

        // Host plus both guests got a check-in at the same timestamp.
        let visits = Checkin::find().all(&db).await.unwrap();
        assert_eq!(visits.len(), 3);
        assert!(visits.iter().all(|v| v.timestamp == outcome.host_checkin.timestamp));

        let charged = Membership::find().one(&db).await.unwrap().unwrap();
        assert_eq!(charged.invitations_used, 2);
    }

    #[tokio::test]
    async fn test_invitation_quota_boundary() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let host = create_test_member(&db, gym.id, "Lena", "0100").await;
        // Gold allows 2 invitations (test seed defaults).
        let kind = create_test_membership_type(&db, gym.id, "Gold").await;
        let subscription = create_test_membership(
            &db,
            gym.id,
            host.id,
            kind.id,
            days_from_today(0),
            days_from_today(30),
            true,
        )
        .await;

        let mut used_one: membership::ActiveModel = subscription.into();
        used_one.invitations_used = Set(1);
        used_one.update(&db).await.unwrap();

        let members_before = Member::find().count(&db).await.unwrap();

        // Two more guests would make 3 of 2: conflict, and nothing sticks.
        let err = create_checkin_with_invitations(
            &db,
            gym.id,
            host.id,
            vec![guest("Sami", "0501"), guest("Nour", "0502")],
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        assert_eq!(Member::find().count(&db).await.unwrap(), members_before);
        assert_eq!(Checkin::find().count(&db).await.unwrap(), 0);
        let untouched = Membership::find().one(&db).await.unwrap().unwrap();
        assert_eq!(untouched.invitations_used, 1);

        // One guest exactly fills the allowance.
        let outcome = create_checkin_with_invitations(
            &db,
            gym.id,
            host.id,
            vec![guest("Sami", "0501")],
            "staff-1",
        )
        .await
        .unwrap();
        assert_eq!(outcome.guests.len(), 1);

        let filled = Membership::find().one(&db).await.unwrap().unwrap();
        assert_eq!(filled.invitations_used, 2);
    }

    #[tokio::test]
    async fn test_group_checkin_rejects_registered_phone() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let host = create_test_member(&db, gym.id, "Lena", "0100").await;
        create_test_member(&db, gym.id, "Omar", "0501").await;

        let checkins_before = Checkin::find().count(&db).await.unwrap();

        let err = create_checkin_with_invitations(
            &db,
            gym.id,
            host.id,
            vec![guest("Sami", "0501")],
            "staff-1",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The host check-in staged before the guest failure rolled back too.
        assert_eq!(Checkin::find().count(&db).await.unwrap(), checkins_before);
    }

    #[tokio::test]
    async fn test_group_checkin_without_membership_has_no_ceiling() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;
        let host = create_test_member(&db, gym.id, "Lena", "0100").await;

        let outcome = create_checkin_with_invitations(
            &db,
            gym.id,
            host.id,
            vec![
                guest("Sami", "0501"),
                guest("Nour", "0502"),
                guest("Dina", "0503"),
            ],
            "staff-1",
        )
        .await
        .unwrap();

        assert_eq!(outcome.guests.len(), 3);
    }

    #[tokio::test]
    async fn test_next_member_code_starts_at_one() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;

        assert_eq!(next_member_code(&db, gym.id).await.unwrap(), 1);

        create_test_member(&db, gym.id, "Lena", "0100").await;
        assert_eq!(next_member_code(&db, gym.id).await.unwrap(), 2);
    }
}
