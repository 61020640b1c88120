//! Migration: Create members table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_branches::Branches;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::BranchId).big_integer().null())
                    .col(ColumnDef::new(Members::Code).big_integer().not_null())
                    .col(ColumnDef::new(Members::Name).string().not_null())
                    .col(ColumnDef::new(Members::Phone).string().not_null())
                    .col(
                        ColumnDef::new(Members::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Members::Notes).string().null())
                    .col(
                        ColumnDef::new(Members::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Members::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_members_branch")
                            .from(Members::Table, Members::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_members_branch")
                    .table(Members::Table)
                    .col(Members::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Phone numbers are unique within a branch (unassigned members are
        // exempt: NULL branch ids never collide).
        manager
            .create_index(
                Index::create()
                    .name("idx_members_branch_phone")
                    .table(Members::Table)
                    .col(Members::BranchId)
                    .col(Members::Phone)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Members::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Members {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    Code,
    Name,
    Phone,
    #[iden = "is_active"]
    IsActive,
    Notes,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "created_by"]
    CreatedBy,
}
