//! owner and service auth key operations.
//!
//! raw keys never reach disk: only hex-encoded SHA-256 digests are stored,
//! and validation compares digests in constant time.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use hue_types::{hash_auth_key, verify_auth_key};

use crate::entity::{owner_auth_key, service_auth_key};
use crate::meta::MetaDb;
use crate::Result;

/// the single owner key row id.
const OWNER_KEY_ID: i32 = 1;

impl MetaDb {
    /// store (or replace) the owner key, clearing any revocation.
    pub async fn upsert_owner_auth_key(&self, raw_key: &str) -> Result<()> {
        if raw_key.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let model = owner_auth_key::ActiveModel {
            key_id: Set(OWNER_KEY_ID),
            hashed_key: Set(hash_auth_key(raw_key)),
            revoked: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        owner_auth_key::Entity::insert(model)
            .on_conflict(
                OnConflict::column(owner_auth_key::Column::KeyId)
                    .update_columns([
                        owner_auth_key::Column::HashedKey,
                        owner_auth_key::Column::Revoked,
                        owner_auth_key::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// check a presented key against the stored owner key.
    pub async fn validate_owner_auth_key(&self, raw_key: &str) -> Result<bool> {
        if raw_key.is_empty() {
            return Ok(false);
        }

        let Some(stored) = owner_auth_key::Entity::find_by_id(OWNER_KEY_ID)
            .one(&self.conn)
            .await?
        else {
            return Ok(false);
        };
        if stored.revoked {
            return Ok(false);
        }
        Ok(verify_auth_key(raw_key, &stored.hashed_key))
    }

    /// revoke the owner key.
    pub async fn revoke_owner_auth_key(&self) -> Result<()> {
        owner_auth_key::Entity::update_many()
            .col_expr(
                owner_auth_key::Column::Revoked,
                sea_orm::sea_query::Expr::value(true),
            )
            .col_expr(
                owner_auth_key::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(owner_auth_key::Column::KeyId.eq(OWNER_KEY_ID))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// store (or replace) a service key, clearing any revocation.
    pub async fn upsert_service_auth_key(&self, service_id: &str, raw_key: &str) -> Result<()> {
        if service_id.is_empty() || raw_key.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let model = service_auth_key::ActiveModel {
            service_id: Set(service_id.to_string()),
            hashed_key: Set(hash_auth_key(raw_key)),
            revoked: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        service_auth_key::Entity::insert(model)
            .on_conflict(
                OnConflict::column(service_auth_key::Column::ServiceId)
                    .update_columns([
                        service_auth_key::Column::HashedKey,
                        service_auth_key::Column::Revoked,
                        service_auth_key::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// check a presented key against a service's stored key.
    pub async fn validate_service_auth_key(&self, service_id: &str, raw_key: &str) -> Result<bool> {
        if service_id.is_empty() || raw_key.is_empty() {
            return Ok(false);
        }

        let Some(stored) = service_auth_key::Entity::find_by_id(service_id)
            .one(&self.conn)
            .await?
        else {
            return Ok(false);
        };
        if stored.revoked {
            return Ok(false);
        }
        Ok(verify_auth_key(raw_key, &stored.hashed_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn owner_key_upsert_and_validate() {
        let db = MetaDb::new_in_memory().await.unwrap();

        db.upsert_owner_auth_key("db-owner-key").await.unwrap();
        assert!(db.validate_owner_auth_key("db-owner-key").await.unwrap());
        assert!(!db.validate_owner_auth_key("wrong-owner-key").await.unwrap());
        assert!(!db.validate_owner_auth_key("").await.unwrap());

        // replacing the key invalidates the old one
        db.upsert_owner_auth_key("rotated-key").await.unwrap();
        assert!(!db.validate_owner_auth_key("db-owner-key").await.unwrap());
        assert!(db.validate_owner_auth_key("rotated-key").await.unwrap());
    }

    #[tokio::test]
    async fn revoked_owner_key_is_rejected() {
        let db = MetaDb::new_in_memory().await.unwrap();
        db.upsert_owner_auth_key("db-owner-key").await.unwrap();
        db.revoke_owner_auth_key().await.unwrap();
        assert!(!db.validate_owner_auth_key("db-owner-key").await.unwrap());

        // a fresh upsert clears the revocation
        db.upsert_owner_auth_key("db-owner-key").await.unwrap();
        assert!(db.validate_owner_auth_key("db-owner-key").await.unwrap());
    }

    #[tokio::test]
    async fn missing_owner_key_rejects_everything() {
        let db = MetaDb::new_in_memory().await.unwrap();
        assert!(!db.validate_owner_auth_key("anything").await.unwrap());
    }
}
