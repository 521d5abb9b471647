//! aggregated usage history entity for the history store. Append-only.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// per-session usage row with derived geo fields. Never carries a raw IP.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "usage_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub package_id: Option<String>,
    pub node_id: String,
    pub service_id: String,
    pub upload: i64,
    pub download: i64,
    pub session_id: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    /// json array string.
    pub tags: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
