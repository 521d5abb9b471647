//! create events and usage_history tables migration (history store)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Events::EventType).string().not_null())
                    .col(ColumnDef::new(Events::UserId).string())
                    .col(ColumnDef::new(Events::PackageId).string())
                    .col(ColumnDef::new(Events::NodeId).string())
                    .col(ColumnDef::new(Events::ServiceId).string())
                    .col(ColumnDef::new(Events::Tags).text())
                    .col(ColumnDef::new(Events::Metadata).blob())
                    .col(
                        ColumnDef::new(Events::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_events_type", Events::EventType),
            ("idx_events_user_id", Events::UserId),
            ("idx_events_timestamp", Events::Timestamp),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Events::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(UsageHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageHistory::UserId).string().not_null())
                    .col(ColumnDef::new(UsageHistory::PackageId).string())
                    .col(ColumnDef::new(UsageHistory::NodeId).string().not_null())
                    .col(ColumnDef::new(UsageHistory::ServiceId).string().not_null())
                    .col(
                        ColumnDef::new(UsageHistory::Upload)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageHistory::Download)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageHistory::SessionId).string())
                    .col(ColumnDef::new(UsageHistory::Country).string())
                    .col(ColumnDef::new(UsageHistory::City).string())
                    .col(ColumnDef::new(UsageHistory::Isp).string())
                    .col(ColumnDef::new(UsageHistory::Tags).text())
                    .col(
                        ColumnDef::new(UsageHistory::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_usage_history_user_id", UsageHistory::UserId),
            ("idx_usage_history_timestamp", UsageHistory::Timestamp),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(UsageHistory::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Events {
    Table,
    Id,
    EventType,
    UserId,
    PackageId,
    NodeId,
    ServiceId,
    Tags,
    Metadata,
    Timestamp,
    CreatedAt,
}

#[derive(DeriveIden)]
enum UsageHistory {
    Table,
    Id,
    UserId,
    PackageId,
    NodeId,
    ServiceId,
    Upload,
    Download,
    SessionId,
    Country,
    City,
    Isp,
    Tags,
    Timestamp,
    CreatedAt,
}
