//! event entity for the history store. Append-only.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::{Event, EventType};

/// persisted audit event.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub event_type: String,
    pub user_id: Option<String>,
    pub package_id: Option<String>,
    pub node_id: Option<String>,
    pub service_id: Option<String>,
    /// json array string.
    pub tags: Option<String>,
    #[sea_orm(column_type = "Blob", nullable)]
    pub metadata: Option<Vec<u8>>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Event {
    fn from(model: Model) -> Self {
        Event {
            id: model.id,
            // unknown stored types degrade to usage-recorded rather than lose the row
            event_type: EventType::parse(&model.event_type).unwrap_or(EventType::UsageRecorded),
            user_id: model.user_id,
            package_id: model.package_id,
            node_id: model.node_id,
            service_id: model.service_id,
            tags: model
                .tags
                .as_deref()
                .map(super::decode_string_list)
                .unwrap_or_default(),
            metadata: model.metadata.unwrap_or_default(),
            timestamp: model.timestamp,
        }
    }
}

impl From<&Event> for ActiveModel {
    fn from(event: &Event) -> Self {
        ActiveModel {
            id: Set(event.id.clone()),
            event_type: Set(event.event_type.as_str().to_string()),
            user_id: Set(event.user_id.clone()),
            package_id: Set(event.package_id.clone()),
            node_id: Set(event.node_id.clone()),
            service_id: Set(event.service_id.clone()),
            tags: Set(Some(super::encode_string_list(&event.tags))),
            metadata: Set(if event.metadata.is_empty() {
                None
            } else {
                Some(event.metadata.clone())
            }),
            timestamp: Set(event.timestamp),
            created_at: Set(chrono::Utc::now()),
        }
    }
}
