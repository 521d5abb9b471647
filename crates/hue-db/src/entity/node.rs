//! node entity for the metadata store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::{Node, ResetMode};

/// node database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub secret_key: String,
    pub name: String,
    pub allowed_ips: String,
    pub traffic_multiplier: f64,
    pub reset_mode: String,
    pub reset_day: i32,
    pub current_upload: i64,
    pub current_download: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service::Entity")]
    Services,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Services.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Node {
    fn from(model: Model) -> Self {
        Node {
            id: model.id,
            secret_key: model.secret_key,
            name: model.name,
            allowed_ips: super::decode_string_list(&model.allowed_ips),
            traffic_multiplier: model.traffic_multiplier,
            reset_mode: ResetMode::parse(&model.reset_mode),
            reset_day: model.reset_day,
            current_upload: model.current_upload,
            current_download: model.current_download,
            country: model.country.unwrap_or_default(),
            city: model.city.unwrap_or_default(),
            isp: model.isp.unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Node> for ActiveModel {
    fn from(node: &Node) -> Self {
        ActiveModel {
            id: Set(node.id.clone()),
            secret_key: Set(node.secret_key.clone()),
            name: Set(node.name.clone()),
            allowed_ips: Set(super::encode_string_list(&node.allowed_ips)),
            traffic_multiplier: Set(node.traffic_multiplier),
            reset_mode: Set(node.reset_mode.as_str().to_string()),
            reset_day: Set(node.reset_day),
            current_upload: Set(node.current_upload),
            current_download: Set(node.current_download),
            country: Set(Some(node.country.clone())),
            city: Set(Some(node.city.clone())),
            isp: Set(Some(node.isp.clone())),
            created_at: Set(node.created_at),
            updated_at: Set(node.updated_at),
        }
    }
}
