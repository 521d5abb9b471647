//! raw usage report entity for the active buffer store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::UsageReport;

/// buffered raw usage row with a processed flag for downstream drainers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "usage_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub node_id: String,
    pub service_id: String,
    pub upload: i64,
    pub download: i64,
    pub session_id: Option<String>,
    /// json array string.
    pub tags: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UsageReport {
    fn from(model: Model) -> Self {
        UsageReport {
            id: model.id,
            user_id: model.user_id,
            node_id: model.node_id,
            service_id: model.service_id,
            upload: model.upload,
            download: model.download,
            session_id: model.session_id.unwrap_or_default(),
            // raw IPs are never buffered
            client_ip: String::new(),
            tags: model
                .tags
                .as_deref()
                .map(super::decode_string_list)
                .unwrap_or_default(),
            timestamp: model.timestamp,
        }
    }
}

impl From<&UsageReport> for ActiveModel {
    fn from(report: &UsageReport) -> Self {
        ActiveModel {
            id: Set(report.id.clone()),
            user_id: Set(report.user_id.clone()),
            node_id: Set(report.node_id.clone()),
            service_id: Set(report.service_id.clone()),
            upload: Set(report.upload),
            download: Set(report.download),
            session_id: Set(Some(report.session_id.clone())),
            tags: Set(Some(super::encode_string_list(&report.tags))),
            timestamp: Set(report.timestamp),
            processed: Set(false),
            created_at: Set(chrono::Utc::now()),
        }
    }
}
