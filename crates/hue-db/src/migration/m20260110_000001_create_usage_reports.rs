//! create usage_reports table migration (active buffer store)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UsageReports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageReports::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UsageReports::UserId).string().not_null())
                    .col(ColumnDef::new(UsageReports::NodeId).string().not_null())
                    .col(ColumnDef::new(UsageReports::ServiceId).string().not_null())
                    .col(ColumnDef::new(UsageReports::Upload).big_integer().not_null())
                    .col(
                        ColumnDef::new(UsageReports::Download)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UsageReports::SessionId).string())
                    .col(ColumnDef::new(UsageReports::Tags).text())
                    .col(
                        ColumnDef::new(UsageReports::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageReports::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(UsageReports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_reports_user_id")
                    .table(UsageReports::Table)
                    .col(UsageReports::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_usage_reports_timestamp")
                    .table(UsageReports::Table)
                    .col(UsageReports::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UsageReports::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UsageReports {
    Table,
    Id,
    UserId,
    NodeId,
    ServiceId,
    Upload,
    Download,
    SessionId,
    Tags,
    Timestamp,
    Processed,
    CreatedAt,
}
