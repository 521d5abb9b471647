//! create packages table migration

use sea_orm_migration::prelude::*;

use super::m20260110_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Packages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Packages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Packages::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Packages::TotalTraffic)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::UploadLimit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::DownloadLimit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::ResetMode)
                            .string()
                            .not_null()
                            .default("no-reset"),
                    )
                    .col(ColumnDef::new(Packages::Duration).big_integer().not_null())
                    .col(ColumnDef::new(Packages::StartAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Packages::MaxConcurrent)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Packages::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Packages::CurrentUpload)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::CurrentDownload)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::CurrentTotal)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Packages::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Packages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Packages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_packages_user")
                            .from(Packages::Table, Packages::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_packages_user_id")
                    .table(Packages::Table)
                    .col(Packages::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_packages_status")
                    .table(Packages::Table)
                    .col(Packages::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Packages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Packages {
    Table,
    Id,
    UserId,
    TotalTraffic,
    UploadLimit,
    DownloadLimit,
    ResetMode,
    Duration,
    StartAt,
    MaxConcurrent,
    Status,
    CurrentUpload,
    CurrentDownload,
    CurrentTotal,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}
