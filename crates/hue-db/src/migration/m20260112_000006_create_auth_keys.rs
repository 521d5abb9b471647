//! create owner_auth_key and service_auth_keys tables migration

use sea_orm_migration::prelude::*;

use super::m20260110_000004_create_services::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OwnerAuthKey::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OwnerAuthKey::KeyId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OwnerAuthKey::HashedKey).string().not_null())
                    .col(
                        ColumnDef::new(OwnerAuthKey::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OwnerAuthKey::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OwnerAuthKey::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceAuthKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceAuthKeys::ServiceId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ServiceAuthKeys::HashedKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceAuthKeys::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ServiceAuthKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceAuthKeys::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_auth_keys_service")
                            .from(ServiceAuthKeys::Table, ServiceAuthKeys::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_auth_keys_revoked")
                    .table(ServiceAuthKeys::Table)
                    .col(ServiceAuthKeys::Revoked)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceAuthKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OwnerAuthKey::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OwnerAuthKey {
    Table,
    KeyId,
    HashedKey,
    Revoked,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ServiceAuthKeys {
    Table,
    ServiceId,
    HashedKey,
    Revoked,
    CreatedAt,
    UpdatedAt,
}
