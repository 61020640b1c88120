//! Migration: Create checkins table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_branches::Branches;
use super::m20260301_000002_create_members::Members;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Checkins::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Checkins::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Checkins::BranchId).big_integer().not_null())
                    .col(ColumnDef::new(Checkins::MemberId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Checkins::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Checkins::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkins_branch")
                            .from(Checkins::Table, Checkins::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkins_member")
                            .from(Checkins::Table, Checkins::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves the recent-checkin window query.
        manager
            .create_index(
                Index::create()
                    .name("idx_checkins_member_timestamp")
                    .table(Checkins::Table)
                    .col(Checkins::MemberId)
                    .col(Checkins::Timestamp)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_checkins_branch")
                    .table(Checkins::Table)
                    .col(Checkins::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Checkins::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Checkins {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    #[iden = "member_id"]
    MemberId,
    Timestamp,
    #[iden = "created_by"]
    CreatedBy,
}
