//! user entity for the metadata store.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;

use hue_types::{User, UserStatus};

/// user database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub manager_id: Option<String>,
    #[sea_orm(unique)]
    pub username: String,
    pub password: String,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    /// json array string, e.g. `["cert-a", "cert-b"]`.
    pub ca_cert_list: String,
    pub groups: String,
    pub allowed_devices: String,
    pub status: String,
    pub active_package_id: Option<String>,
    pub first_connection_at: Option<DateTime<Utc>>,
    pub last_connection_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::package::Entity")]
    Packages,
}

impl Related<super::package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Packages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        User {
            id: model.id,
            manager_id: model.manager_id,
            username: model.username,
            password: model.password,
            public_key: model.public_key.unwrap_or_default(),
            private_key: model.private_key.unwrap_or_default(),
            ca_cert_list: super::decode_string_list(&model.ca_cert_list),
            groups: super::decode_string_list(&model.groups),
            allowed_devices: super::decode_string_list(&model.allowed_devices),
            status: UserStatus::parse(&model.status),
            active_package_id: model.active_package_id,
            first_connection_at: model.first_connection_at,
            last_connection_at: model.last_connection_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        ActiveModel {
            id: Set(user.id.clone()),
            manager_id: Set(user.manager_id.clone()),
            username: Set(user.username.clone()),
            password: Set(user.password.clone()),
            public_key: Set(Some(user.public_key.clone())),
            private_key: Set(Some(user.private_key.clone())),
            ca_cert_list: Set(super::encode_string_list(&user.ca_cert_list)),
            groups: Set(super::encode_string_list(&user.groups)),
            allowed_devices: Set(super::encode_string_list(&user.allowed_devices)),
            status: Set(user.status.as_str().to_string()),
            active_package_id: Set(user.active_package_id.clone()),
            first_connection_at: Set(user.first_connection_at),
            last_connection_at: Set(user.last_connection_at),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
    }
}
