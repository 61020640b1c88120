use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A member's subscription to one membership type. At most one active
/// membership may exist per member; a partial unique index backs this.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "memberships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub branch_id: i64,
    pub member_id: i64,
    pub membership_type_id: i64,
    pub offer_id: Option<i64>,
    pub start_date: Date,
    /// Pushed out by freezes; pulled back when a freeze is removed.
    pub end_date: Date,
    pub is_active: bool,
    pub invitations_used: i32,
    pub frozen_days: i32,
    pub created_at: DateTimeUtc,
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branch::Entity",
        from = "Column::BranchId",
        to = "super::branch::Column::Id"
    )]
    Branch,
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::MemberId",
        to = "super::member::Column::Id"
    )]
    Member,
    #[sea_orm(
        belongs_to = "super::membership_type::Entity",
        from = "Column::MembershipTypeId",
        to = "super::membership_type::Column::Id"
    )]
    MembershipType,
    #[sea_orm(
        belongs_to = "super::offer::Entity",
        from = "Column::OfferId",
        to = "super::offer::Column::Id"
    )]
    Offer,
    #[sea_orm(has_many = "super::membership_freeze::Entity")]
    Freezes,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl Related<super::membership_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MembershipType.def()
    }
}

impl Related<super::membership_freeze::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freezes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
