//! schema migrations for the three stores.
//!
//! each store has its own migrator so the metadata, active, and history
//! databases evolve independently.

use sea_orm_migration::prelude::*;

mod m20260110_000001_create_users;
mod m20260110_000002_create_packages;
mod m20260110_000003_create_nodes;
mod m20260110_000004_create_services;
mod m20260112_000005_create_managers;
mod m20260112_000006_create_auth_keys;
mod m20260118_000007_add_user_manager_id;

mod m20260110_000001_create_usage_reports;

mod m20260110_000001_create_history;

/// migrator for the metadata store.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_create_users::Migration),
            Box::new(m20260110_000002_create_packages::Migration),
            Box::new(m20260110_000003_create_nodes::Migration),
            Box::new(m20260110_000004_create_services::Migration),
            Box::new(m20260112_000005_create_managers::Migration),
            Box::new(m20260112_000006_create_auth_keys::Migration),
            Box::new(m20260118_000007_add_user_manager_id::Migration),
        ]
    }
}

/// migrator for the active buffer store.
pub struct ActiveMigrator;

#[async_trait::async_trait]
impl MigratorTrait for ActiveMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260110_000001_create_usage_reports::Migration)]
    }
}

/// migrator for the history store.
pub struct HistoryMigrator;

#[async_trait::async_trait]
impl MigratorTrait for HistoryMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260110_000001_create_history::Migration)]
    }
}
