pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_branches;
mod m20260301_000002_create_members;
mod m20260301_000003_create_membership_types;
mod m20260301_000004_create_offers;
mod m20260301_000005_create_memberships;
mod m20260301_000006_create_membership_freezes;
mod m20260301_000007_create_checkins;
mod m20260302_000001_seed_defaults;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_branches::Migration),
            Box::new(m20260301_000002_create_members::Migration),
            Box::new(m20260301_000003_create_membership_types::Migration),
            Box::new(m20260301_000004_create_offers::Migration),
            Box::new(m20260301_000005_create_memberships::Migration),
            Box::new(m20260301_000006_create_membership_freezes::Migration),
            Box::new(m20260301_000007_create_checkins::Migration),
            Box::new(m20260302_000001_seed_defaults::Migration),
        ]
    }
}
