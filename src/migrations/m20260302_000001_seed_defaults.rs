//! Migration: Seed the default branch

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        use crate::db::entities::branch;
        use crate::db::prelude::Branch;

        let branch_count = Branch::find().count(db).await?;
        if branch_count > 0 {
            return Ok(());
        }

        // The configured default branch id resolves to this row on a fresh
        // install.
        let main_branch = branch::ActiveModel {
            name: Set("Main Branch".to_string()),
            location: Set(None),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        main_branch.insert(db).await?;

        Ok(())
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // Seeding is not reversible - data may have been modified
        Ok(())
    }
}
