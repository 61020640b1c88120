//! Migration: Create membership_types table

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
                    .table(MembershipTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MembershipTypes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::BranchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MembershipTypes::Name).string().not_null())
                    .col(
                        ColumnDef::new(MembershipTypes::DurationDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::Price)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::InvitationCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::FreezeDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::FreezeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(MembershipTypes::Description).string().null())
                    .col(
                        ColumnDef::new(MembershipTypes::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MembershipTypes::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_types_branch")
                            .from(MembershipTypes::Table, MembershipTypes::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_membership_types_branch")
                    .table(MembershipTypes::Table)
                    .col(MembershipTypes::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Case-insensitive per-branch name uniqueness. Expression indexes
        // aren't expressible through the builder; same syntax on SQLite and
        // PostgreSQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_membership_types_branch_name \
                 ON membership_types (branch_id, lower(name))",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(MembershipTypes::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum MembershipTypes {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    Name,
    #[iden = "duration_days"]
    DurationDays,
    Price,
    #[iden = "invitation_count"]
    InvitationCount,
    #[iden = "freeze_days"]
    FreezeDays,
    #[iden = "freeze_count"]
    FreezeCount,
    Description,
    #[iden = "is_active"]
    IsActive,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "created_by"]
    CreatedBy,
}
