use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Gym member record. Distinct from staff accounts, which live in the
/// external identity provider.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Null means the member is not assigned to any branch.
    pub branch_id: Option<i64>,
    /// Sequential per-branch member number.
    pub code: i64,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    pub notes: Option<String>,
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
    #[sea_orm(has_many = "super::membership::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::checkin::Entity")]
    Checkins,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::checkin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Checkins.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
