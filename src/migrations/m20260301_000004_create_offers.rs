//! Migration: Create offers table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_branches::Branches;
use super::m20260301_000003_create_membership_types::MembershipTypes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Offers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Offers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Offers::BranchId).big_integer().not_null())
                    .col(ColumnDef::new(Offers::Name).string().not_null())
                    .col(
                        ColumnDef::new(Offers::DiscountPercent)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Offers::MembershipTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Offers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Offers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Offers::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offers_branch")
                            .from(Offers::Table, Offers::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offers_membership_type")
                            .from(Offers::Table, Offers::MembershipTypeId)
                            .to(MembershipTypes::Table, MembershipTypes::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offers_branch")
                    .table(Offers::Table)
                    .col(Offers::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_offers_branch_name \
                 ON offers (branch_id, lower(name))",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Offers::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Offers {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    Name,
    #[iden = "discount_percent"]
    DiscountPercent,
    #[iden = "membership_type_id"]
    MembershipTypeId,
    #[iden = "is_active"]
    IsActive,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "created_by"]
    CreatedBy,
}
