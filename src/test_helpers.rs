//! Test helpers and utilities for unit and integration testing.
//!
//! This module provides common utilities for setting up test environments,
//! creating seed data, and testing database operations.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::db::entities::{branch, member, membership, membership_type, offer};
use crate::migrations::Migrator;

/// Create an in-memory SQLite database for testing
pub async fn create_test_db() -> DatabaseConnection {
    // Use simple in-memory SQLite - each connection gets its own database
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run test migrations");

    db
}

/// Create a branch and return the model
pub async fn create_test_branch(db: &DatabaseConnection, name: &str) -> branch::Model {
    let new_branch = branch::ActiveModel {
        name: Set(name.to_string()),
        location: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    new_branch.insert(db).await.unwrap()
}

/// Create an inactive member in a branch with the next sequential code
pub async fn create_test_member(
    db: &DatabaseConnection,
    branch_id: i64,
    name: &str,
    phone: &str,
) -> member::Model {
    let code = crate::services::checkin::next_member_code(db, branch_id)
        .await
        .unwrap();

    let new_member = member::ActiveModel {
        branch_id: Set(Some(branch_id)),
        code: Set(code),
        name: Set(name.to_string()),
        phone: Set(phone.to_string()),
        is_active: Set(false),
        notes: Set(None),
        created_at: Set(Utc::now()),
        created_by: Set("test-suite".to_string()),
        ..Default::default()
    };

    new_member.insert(db).await.unwrap()
}

/// Create a membership type with the default test allowances:
/// 30 days, 2 invitations, 30 freeze days across 3 freezes.
pub async fn create_test_membership_type(
    db: &DatabaseConnection,
    branch_id: i64,
    name: &str,
) -> membership_type::Model {
    let new_type = membership_type::ActiveModel {
        branch_id: Set(branch_id),
        name: Set(name.to_string()),
        duration_days: Set(30),
        price: Set(Decimal::new(10000, 2)),
        invitation_count: Set(2),
        freeze_days: Set(30),
        freeze_count: Set(3),
        description: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        created_by: Set("test-suite".to_string()),
        ..Default::default()
    };

    new_type.insert(db).await.unwrap()
}

/// Create an offer linked to a membership type
pub async fn create_test_offer(
    db: &DatabaseConnection,
    branch_id: i64,
    name: &str,
    membership_type_id: i64,
    discount_percent: i32,
) -> offer::Model {
    let new_offer = offer::ActiveModel {
        branch_id: Set(branch_id),
        name: Set(name.to_string()),
        discount_percent: Set(discount_percent),
        membership_type_id: Set(membership_type_id),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        created_by: Set("test-suite".to_string()),
        ..Default::default()
    };

    new_offer.insert(db).await.unwrap()
}

/// Insert a membership row directly, bypassing the lifecycle service
pub async fn create_test_membership(
    db: &DatabaseConnection,
    branch_id: i64,
    member_id: i64,
    membership_type_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_active: bool,
) -> membership::Model {
    let new_membership = membership::ActiveModel {
        branch_id: Set(branch_id),
        member_id: Set(member_id),
        membership_type_id: Set(membership_type_id),
        offer_id: Set(None),
        start_date: Set(start_date),
        end_date: Set(end_date),
        is_active: Set(is_active),
        invitations_used: Set(0),
        frozen_days: Set(0),
        created_at: Set(Utc::now()),
        created_by: Set("test-suite".to_string()),
        ..Default::default()
    };

    new_membership.insert(db).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::prelude::*;
    use sea_orm::EntityTrait;

    #[tokio::test]
    async fn test_create_test_db() {
        let db = create_test_db().await;
        assert!(db.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_migrations_seed_default_branch() {
        let db = create_test_db().await;

        // A fresh database carries the seeded default branch.
        let branches = Branch::find().all(&db).await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "Main Branch");
        assert!(branches[0].is_active);
    }

    #[tokio::test]
    async fn test_create_test_member_assigns_codes() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;

        let first = create_test_member(&db, gym.id, "Lena", "0100").await;
        let second = create_test_member(&db, gym.id, "Omar", "0200").await;

        assert_eq!(first.code, 1);
        assert_eq!(second.code, 2);
        assert!(!first.is_active);
    }

    #[tokio::test]
    async fn test_branch_expiry_is_one_year_out() {
        let db = create_test_db().await;
        let gym = create_test_branch(&db, "Downtown").await;

        let expiry = gym.expires_at();
        assert!(expiry > gym.created_at);
        let days = (expiry - gym.created_at).num_days();
        assert!((365..=366).contains(&days));
    }
}
