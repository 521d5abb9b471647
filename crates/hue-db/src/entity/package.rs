//! package entity for the metadata store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::{Package, PackageStatus, ResetMode};

/// package database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub total_traffic: i64,
    pub upload_limit: i64,
    pub download_limit: i64,
    pub reset_mode: String,
    pub duration: i64,
    pub start_at: Option<DateTime<Utc>>,
    pub max_concurrent: i32,
    pub status: String,
    pub current_upload: i64,
    pub current_download: i64,
    pub current_total: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Package {
    fn from(model: Model) -> Self {
        Package {
            id: model.id,
            user_id: model.user_id,
            total_traffic: model.total_traffic,
            upload_limit: model.upload_limit,
            download_limit: model.download_limit,
            reset_mode: ResetMode::parse(&model.reset_mode),
            duration: model.duration,
            start_at: model.start_at,
            max_concurrent: model.max_concurrent,
            status: PackageStatus::parse(&model.status),
            current_upload: model.current_upload,
            current_download: model.current_download,
            current_total: model.current_total,
            expires_at: model.expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Package> for ActiveModel {
    fn from(pkg: &Package) -> Self {
        ActiveModel {
            id: Set(pkg.id.clone()),
            user_id: Set(pkg.user_id.clone()),
            total_traffic: Set(pkg.total_traffic),
            upload_limit: Set(pkg.upload_limit),
            download_limit: Set(pkg.download_limit),
            reset_mode: Set(pkg.reset_mode.as_str().to_string()),
            duration: Set(pkg.duration),
            start_at: Set(pkg.start_at),
            max_concurrent: Set(pkg.max_concurrent),
            status: Set(pkg.status.as_str().to_string()),
            current_upload: Set(pkg.current_upload),
            current_download: Set(pkg.current_download),
            current_total: Set(pkg.current_total),
            expires_at: Set(pkg.expires_at),
            created_at: Set(pkg.created_at),
            updated_at: Set(pkg.updated_at),
        }
    }
}
