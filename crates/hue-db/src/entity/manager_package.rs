//! manager package entity: limits and aggregated counters per manager.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::{ManagerPackage, ManagerPackageStatus, ResetMode};

/// manager package database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "manager_packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub manager_id: String,
    pub total_limit: i64,
    pub upload_limit: i64,
    pub download_limit: i64,
    pub reset_mode: String,
    pub duration: i64,
    pub start_at: Option<DateTime<Utc>>,
    pub max_sessions: i32,
    pub max_online_users: i32,
    pub max_active_users: i32,
    pub status: String,
    pub current_upload: i64,
    pub current_download: i64,
    pub current_total: i64,
    pub current_sessions: i64,
    pub current_online_users: i64,
    pub current_active_users: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::manager::Entity",
        from = "Column::ManagerId",
        to = "super::manager::Column::Id"
    )]
    Manager,
}

impl Related<super::manager::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ManagerPackage {
    fn from(model: Model) -> Self {
        ManagerPackage {
            manager_id: model.manager_id,
            total_limit: model.total_limit,
            upload_limit: model.upload_limit,
            download_limit: model.download_limit,
            reset_mode: ResetMode::parse(&model.reset_mode),
            duration: model.duration,
            start_at: model.start_at,
            max_sessions: model.max_sessions,
            max_online_users: model.max_online_users,
            max_active_users: model.max_active_users,
            status: ManagerPackageStatus::parse(&model.status),
            current_upload: model.current_upload,
            current_download: model.current_download,
            current_total: model.current_total,
            current_sessions: model.current_sessions,
            current_online_users: model.current_online_users,
            current_active_users: model.current_active_users,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&ManagerPackage> for ActiveModel {
    fn from(pkg: &ManagerPackage) -> Self {
        ActiveModel {
            manager_id: Set(pkg.manager_id.clone()),
            total_limit: Set(pkg.total_limit),
            upload_limit: Set(pkg.upload_limit),
            download_limit: Set(pkg.download_limit),
            reset_mode: Set(pkg.reset_mode.as_str().to_string()),
            duration: Set(pkg.duration),
            start_at: Set(pkg.start_at),
            max_sessions: Set(pkg.max_sessions),
            max_online_users: Set(pkg.max_online_users),
            max_active_users: Set(pkg.max_active_users),
            status: Set(pkg.status.as_str().to_string()),
            current_upload: Set(pkg.current_upload),
            current_download: Set(pkg.current_download),
            current_total: Set(pkg.current_total),
            current_sessions: Set(pkg.current_sessions),
            current_online_users: Set(pkg.current_online_users),
            current_active_users: Set(pkg.current_active_users),
            created_at: Set(pkg.created_at),
            updated_at: Set(pkg.updated_at),
        }
    }
}
