//! Migration: Create membership_freezes table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_branches::Branches;
use super::m20260301_000005_create_memberships::Memberships;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MembershipFreezes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MembershipFreezes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MembershipFreezes::BranchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipFreezes::MembershipId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipFreezes::StartDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MembershipFreezes::EndDate).date().not_null())
                    .col(ColumnDef::new(MembershipFreezes::Reason).string().null())
                    .col(
                        ColumnDef::new(MembershipFreezes::CreatedAt)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipFreezes::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_freezes_branch")
                            .from(MembershipFreezes::Table, MembershipFreezes::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_freezes_membership")
                            .from(MembershipFreezes::Table, MembershipFreezes::MembershipId)
                            .to(Memberships::Table, Memberships::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_membership_freezes_membership")
                    .table(MembershipFreezes::Table)
                    .col(MembershipFreezes::MembershipId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(MembershipFreezes::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum MembershipFreezes {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    #[iden = "membership_id"]
    MembershipId,
    #[iden = "start_date"]
    StartDate,
    #[iden = "end_date"]
    EndDate,
    Reason,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "created_by"]
    CreatedBy,
}
