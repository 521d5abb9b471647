//! service entity for the metadata store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::Service;

/// service database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub secret_key: String,
    pub node_id: String,
    pub name: String,
    pub protocol: String,
    /// json array string of auth method labels.
    pub allowed_auth_methods: String,
    pub callback_url: Option<String>,
    pub current_upload: i64,
    pub current_download: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::node::Entity",
        from = "Column::NodeId",
        to = "super::node::Column::Id"
    )]
    Node,
}

impl Related<super::node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Node.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Service {
    fn from(model: Model) -> Self {
        Service {
            id: model.id,
            secret_key: model.secret_key,
            node_id: model.node_id,
            name: model.name,
            protocol: model.protocol,
            allowed_auth_methods: serde_json::from_str(&model.allowed_auth_methods)
                .unwrap_or_default(),
            callback_url: model.callback_url.unwrap_or_default(),
            current_upload: model.current_upload,
            current_download: model.current_download,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Service> for ActiveModel {
    fn from(service: &Service) -> Self {
        ActiveModel {
            id: Set(service.id.clone()),
            secret_key: Set(service.secret_key.clone()),
            node_id: Set(service.node_id.clone()),
            name: Set(service.name.clone()),
            protocol: Set(service.protocol.clone()),
            allowed_auth_methods: Set(serde_json::to_string(&service.allowed_auth_methods)
                .unwrap_or_else(|_| "[]".to_string())),
            callback_url: Set(Some(service.callback_url.clone())),
            current_upload: Set(service.current_upload),
            current_download: Set(service.current_download),
            created_at: Set(service.created_at),
            updated_at: Set(service.updated_at),
        }
    }
}
