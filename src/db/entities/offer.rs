use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub branch_id: i64,
    /// Unique per branch, case-insensitive.
    pub name: String,
    /// Percentage off the linked membership type's price, 0-100.
    pub discount_percent: i32,
    pub membership_type_id: i64,
    pub is_active: bool,
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
        belongs_to = "super::membership_type::Entity",
        from = "Column::MembershipTypeId",
        to = "super::membership_type::Column::Id"
    )]
    MembershipType,
}

impl Related<super::branch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branch.def()
    }
}

impl Related<super::membership_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MembershipType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
