//! owner auth key entity (single row).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// stored owner key: hex-encoded SHA-256 of the raw key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "owner_auth_key")]
pub struct Model {
    /// fixed at 1; the table holds at most one row.
    #[sea_orm(primary_key, auto_increment = false)]
    pub key_id: i32,
    pub hashed_key: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
