//! manager entity for the metadata store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::Manager;

/// manager database model. The limits package lives in `manager_packages`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "managers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// json object string.
    pub metadata: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::manager_package::Entity")]
    Package,
}

impl Related<super::manager_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Manager {
    fn from(model: Model) -> Self {
        Manager {
            id: model.id,
            name: model.name,
            parent_id: model.parent_id,
            metadata: super::decode_metadata(&model.metadata),
            package: None,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Manager> for ActiveModel {
    fn from(manager: &Manager) -> Self {
        ActiveModel {
            id: Set(manager.id.clone()),
            name: Set(manager.name.clone()),
            parent_id: Set(manager.parent_id.clone()),
            metadata: Set(super::encode_metadata(&manager.metadata)),
            created_at: Set(manager.created_at),
            updated_at: Set(manager.updated_at),
        }
    }
}
