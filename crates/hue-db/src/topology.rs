//! node and service operations on the metadata store.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use hue_types::{Node, Service, hash_auth_key};

use crate::entity::{node, service, service_auth_key};
use crate::meta::MetaDb;
use crate::Result;

impl MetaDb {
    // ─── nodes ───────────────────────────────────────────────────────────

    /// insert a new node.
    pub async fn create_node(&self, new_node: &Node) -> Result<()> {
        let model: node::ActiveModel = new_node.into();
        model.insert(&self.conn).await?;
        Ok(())
    }

    /// get a node by id.
    pub async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let result = node::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(result.map(Into::into))
    }

    /// get a node by its secret key.
    pub async fn get_node_by_secret_key(&self, secret_key: &str) -> Result<Option<Node>> {
        let result = node::Entity::find()
            .filter(node::Column::SecretKey.eq(secret_key))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    /// list all nodes, newest first.
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let results = node::Entity::find()
            .order_by_desc(node::Column::CreatedAt)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    /// count all nodes.
    pub async fn count_nodes(&self) -> Result<u64> {
        Ok(node::Entity::find().count(&self.conn).await?)
    }

    /// add a usage delta to a node's aggregate counters.
    pub async fn update_node_usage(&self, id: &str, upload: i64, download: i64) -> Result<()> {
        node::Entity::update_many()
            .col_expr(
                node::Column::CurrentUpload,
                Expr::col(node::Column::CurrentUpload).add(upload),
            )
            .col_expr(
                node::Column::CurrentDownload,
                Expr::col(node::Column::CurrentDownload).add(download),
            )
            .col_expr(node::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(node::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// zero a node's aggregate counters (period reset).
    pub async fn reset_node_usage(&self, id: &str) -> Result<()> {
        node::Entity::update_many()
            .col_expr(node::Column::CurrentUpload, Expr::value(0i64))
            .col_expr(node::Column::CurrentDownload, Expr::value(0i64))
            .col_expr(node::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(node::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// delete a node; its services cascade.
    pub async fn delete_node(&self, id: &str) -> Result<()> {
        node::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }

    /// aggregate traffic across all nodes: (upload, download).
    pub async fn total_node_usage(&self) -> Result<(i64, i64)> {
        let nodes = self.list_nodes().await?;
        Ok(nodes.iter().fold((0, 0), |(up, down), n| {
            (up + n.current_upload, down + n.current_download)
        }))
    }

    // ─── services ────────────────────────────────────────────────────────

    /// insert a new service; its secret key is also stored hashed in
    /// `service_auth_keys` within the same transaction.
    pub async fn create_service(&self, new_service: &Service) -> Result<()> {
        let txn = self.conn.begin().await?;

        let model: service::ActiveModel = new_service.into();
        model.insert(&txn).await?;

        if !new_service.secret_key.is_empty() {
            let now = Utc::now();
            let key = service_auth_key::ActiveModel {
                service_id: sea_orm::Set(new_service.id.clone()),
                hashed_key: sea_orm::Set(hash_auth_key(&new_service.secret_key)),
                revoked: sea_orm::Set(false),
                created_at: sea_orm::Set(now),
                updated_at: sea_orm::Set(now),
            };
            service_auth_key::Entity::insert(key)
                .on_conflict(
                    sea_orm::sea_query::OnConflict::column(service_auth_key::Column::ServiceId)
                        .update_columns([
                            service_auth_key::Column::HashedKey,
                            service_auth_key::Column::Revoked,
                            service_auth_key::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    /// get a service by id.
    pub async fn get_service(&self, id: &str) -> Result<Option<Service>> {
        let result = service::Entity::find_by_id(id).one(&self.conn).await?;
        Ok(result.map(Into::into))
    }

    /// get a service by its secret key.
    pub async fn get_service_by_secret_key(&self, secret_key: &str) -> Result<Option<Service>> {
        let result = service::Entity::find()
            .filter(service::Column::SecretKey.eq(secret_key))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    /// list services hosted on a node.
    pub async fn list_services_for_node(&self, node_id: &str) -> Result<Vec<Service>> {
        let results = service::Entity::find()
            .filter(service::Column::NodeId.eq(node_id))
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    /// count all services.
    pub async fn count_services(&self) -> Result<u64> {
        Ok(service::Entity::find().count(&self.conn).await?)
    }

    /// add a usage delta to a service's aggregate counters.
    pub async fn update_service_usage(&self, id: &str, upload: i64, download: i64) -> Result<()> {
        service::Entity::update_many()
            .col_expr(
                service::Column::CurrentUpload,
                Expr::col(service::Column::CurrentUpload).add(upload),
            )
            .col_expr(
                service::Column::CurrentDownload,
                Expr::col(service::Column::CurrentDownload).add(download),
            )
            .col_expr(service::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(service::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    /// delete a service.
    pub async fn delete_service(&self, id: &str) -> Result<()> {
        service::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_types::{AuthMethod, NodeCreate, ResetMode, ServiceCreate};

    async fn setup() -> MetaDb {
        MetaDb::new_in_memory().await.unwrap()
    }

    fn test_node() -> Node {
        NodeCreate {
            name: "edge-1".to_string(),
            secret_key: "node-secret".to_string(),
            allowed_ips: vec!["10.0.0.0/8".to_string()],
            traffic_multiplier: 1.0,
            reset_mode: ResetMode::NoReset,
            reset_day: 0,
            country: "NL".to_string(),
            city: String::new(),
            isp: String::new(),
        }
        .into_node()
    }

    #[tokio::test]
    async fn node_crud_round_trip() {
        let db = setup().await;
        let created = test_node();
        db.create_node(&created).await.unwrap();

        let fetched = db.get_node(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "edge-1");
        assert_eq!(fetched.allowed_ips, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(fetched.country, "NL");

        let by_key = db.get_node_by_secret_key("node-secret").await.unwrap();
        assert!(by_key.is_some());

        db.update_node_usage(&created.id, 120, 80).await.unwrap();
        let fetched = db.get_node(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_upload, 120);
        assert_eq!(fetched.current_download, 80);
        assert_eq!(fetched.current_total(), 200);

        db.reset_node_usage(&created.id).await.unwrap();
        let fetched = db.get_node(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.current_total(), 0);

        db.delete_node(&created.id).await.unwrap();
        assert!(db.get_node(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn service_creation_stores_hashed_key() {
        let db = setup().await;
        let parent = test_node();
        db.create_node(&parent).await.unwrap();

        let svc = ServiceCreate {
            node_id: parent.id.clone(),
            secret_key: "svc-secret".to_string(),
            name: "vless-main".to_string(),
            protocol: "vless".to_string(),
            allowed_auth_methods: vec![AuthMethod::Uuid],
            callback_url: String::new(),
        }
        .into_service();
        db.create_service(&svc).await.unwrap();

        let fetched = db.get_service(&svc.id).await.unwrap().unwrap();
        assert_eq!(fetched.protocol, "vless");
        assert!(fetched.supports_auth_method(AuthMethod::Uuid));

        // the key validates through the hashed table
        assert!(db.validate_service_auth_key(&svc.id, "svc-secret").await.unwrap());
        assert!(!db.validate_service_auth_key(&svc.id, "wrong").await.unwrap());

        db.update_service_usage(&svc.id, 10, 20).await.unwrap();
        let fetched = db.get_service(&svc.id).await.unwrap().unwrap();
        assert_eq!((fetched.current_upload, fetched.current_download), (10, 20));
    }

    #[tokio::test]
    async fn deleting_node_cascades_services() {
        let db = setup().await;
        let parent = test_node();
        db.create_node(&parent).await.unwrap();

        let svc = ServiceCreate {
            node_id: parent.id.clone(),
            secret_key: "svc-secret".to_string(),
            name: "trojan-main".to_string(),
            protocol: "trojan".to_string(),
            allowed_auth_methods: vec![AuthMethod::Password],
            callback_url: String::new(),
        }
        .into_service();
        db.create_service(&svc).await.unwrap();

        db.delete_node(&parent.id).await.unwrap();
        assert!(db.get_service(&svc.id).await.unwrap().is_none());
    }
}
