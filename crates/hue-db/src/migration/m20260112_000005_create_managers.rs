//! create managers and manager_packages tables migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Managers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Managers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Managers::Name).string().not_null())
                    .col(ColumnDef::new(Managers::ParentId).string())
                    .col(
                        ColumnDef::new(Managers::Metadata)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(Managers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Managers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_managers_parent")
                            .from(Managers::Table, Managers::ParentId)
                            .to(Managers::Table, Managers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_managers_parent_id")
                    .table(Managers::Table)
                    .col(Managers::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManagerPackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagerPackages::ManagerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::TotalLimit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::UploadLimit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::DownloadLimit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::ResetMode)
                            .string()
                            .not_null()
                            .default("no-reset"),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::Duration)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ManagerPackages::StartAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ManagerPackages::MaxSessions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::MaxOnlineUsers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::MaxActiveUsers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::Status)
                            .string()
                            .not_null()
                            .default("inactive"),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentUpload)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentDownload)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentSessions)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentOnlineUsers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CurrentActiveUsers)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ManagerPackages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_manager_packages_manager")
                            .from(ManagerPackages::Table, ManagerPackages::ManagerId)
                            .to(Managers::Table, Managers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_manager_packages_status")
                    .table(ManagerPackages::Table)
                    .col(ManagerPackages::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ManagerPackages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Managers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Managers {
    Table,
    Id,
    Name,
    ParentId,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum ManagerPackages {
    Table,
    ManagerId,
    TotalLimit,
    UploadLimit,
    DownloadLimit,
    ResetMode,
    Duration,
    StartAt,
    MaxSessions,
    MaxOnlineUsers,
    MaxActiveUsers,
    Status,
    CurrentUpload,
    CurrentDownload,
    CurrentTotal,
    CurrentSessions,
    CurrentOnlineUsers,
    CurrentActiveUsers,
    CreatedAt,
    UpdatedAt,
}
