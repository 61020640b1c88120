//! Migration: Create memberships table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_branches::Branches;
use super::m20260301_000002_create_members::Members;
use super::m20260301_000003_create_membership_types::MembershipTypes;
use super::m20260301_000004_create_offers::Offers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Memberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Memberships::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Memberships::BranchId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Memberships::MemberId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Memberships::MembershipTypeId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Memberships::OfferId).big_integer().null())
                    .col(ColumnDef::new(Memberships::StartDate).date().not_null())
                    .col(ColumnDef::new(Memberships::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Memberships::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Memberships::InvitationsUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Memberships::FrozenDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Memberships::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Memberships::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_branch")
                            .from(Memberships::Table, Memberships::BranchId)
                            .to(Branches::Table, Branches::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_member")
                            .from(Memberships::Table, Memberships::MemberId)
                            .to(Members::Table, Members::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_membership_type")
                            .from(Memberships::Table, Memberships::MembershipTypeId)
                            .to(MembershipTypes::Table, MembershipTypes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_memberships_offer")
                            .from(Memberships::Table, Memberships::OfferId)
                            .to(Offers::Table, Offers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_member")
                    .table(Memberships::Table)
                    .col(Memberships::MemberId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_memberships_branch")
                    .table(Memberships::Table)
                    .col(Memberships::BranchId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // At most one active membership per member, enforced by storage so
        // the read-then-write check in the service cannot race into two
        // active rows. Same syntax on SQLite and PostgreSQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_memberships_one_active_per_member \
                 ON memberships (member_id) WHERE is_active",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Memberships::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
pub enum Memberships {
    Table,
    Id,
    #[iden = "branch_id"]
    BranchId,
    #[iden = "member_id"]
    MemberId,
    #[iden = "membership_type_id"]
    MembershipTypeId,
    #[iden = "offer_id"]
    OfferId,
    #[iden = "start_date"]
    StartDate,
    #[iden = "end_date"]
    EndDate,
    #[iden = "is_active"]
    IsActive,
    #[iden = "invitations_used"]
    InvitationsUsed,
    #[iden = "frozen_days"]
    FrozenDays,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "created_by"]
    CreatedBy,
}
