use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Suspension interval on a membership. Both ends inclusive; freezes of
/// the same membership never overlap (checked before insert).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "membership_freezes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub branch_id: i64,
    pub membership_id: i64,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
    /// Date-only; no time component.
    pub created_at: Date,
    pub created_by: String,
}

impl Model {
    /// Inclusive length of the freeze in days.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
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
        belongs_to = "super::membership::Entity",
        from = "Column::MembershipId",
        to = "super::membership::Column::Id"
    )]
    Membership,
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
