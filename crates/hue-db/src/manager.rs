//! manager hierarchy operations on the metadata store.
//!
//! the tree is walked by repeatedly following `parent_id`; a visited set
//! guards against cycles, which are treated as data corruption: the walk
//! stops at the first repeat, logs once, and checks fail open.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use tracing::warn;

use hue_types::{Manager, ManagerPackage};

use crate::entity::{manager, manager_package};
use crate::meta::MetaDb;
use crate::{Error, Result};

/// outcome of a manager-limit check.
#[derive(Debug, Clone)]
pub struct ManagerLimitCheck {
    /// true if every ancestor has room for the delta.
    pub allowed: bool,
    /// the first ancestor whose limit would be exceeded.
    pub manager_id: String,
    /// which limit was hit.
    pub reason: String,
}

impl ManagerLimitCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            manager_id: String::new(),
            reason: String::new(),
        }
    }

    fn denied(manager_id: &str, reason: &str) -> Self {
        Self {
            allowed: false,
            manager_id: manager_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// deltas applied to every ancestor on a recorded report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerDelta {
    /// upload bytes.
    pub upload: i64,
    /// download bytes.
    pub download: i64,
    /// concurrent-session delta.
    pub sessions: i64,
    /// online-user delta.
    pub online_users: i64,
    /// active-user delta.
    pub active_users: i64,
}

impl ManagerDelta {
    /// a pure traffic delta with zeroed session counters.
    pub fn traffic(upload: i64, download: i64) -> Self {
        Self {
            upload,
            download,
            ..Default::default()
        }
    }

    /// true if nothing would change.
    pub fn is_zero(&self) -> bool {
        self.upload == 0
            && self.download == 0
            && self.sessions == 0
            && self.online_users == 0
            && self.active_users == 0
    }
}

impl MetaDb {
    /// create a manager together with its package.
    ///
    /// when the manager has a parent, every positive limit on the child must
    /// stay within the same-named positive limit on the parent.
    pub async fn create_manager(&self, new_manager: &Manager) -> Result<()> {
        let Some(pkg) = new_manager.package.as_ref() else {
            return Err(Error::Invalid("manager package is required".to_string()));
        };

        if let Some(parent_id) = new_manager.parent_id.as_deref().filter(|p| !p.is_empty()) {
            let parent_pkg = self
                .get_manager_package(parent_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("parent manager package {parent_id}")))?;
            pkg.validate_against_parent(&parent_pkg)
                .map_err(|e| Error::Invalid(e.to_string()))?;
        }

        let txn = self.conn.begin().await?;
        let model: manager::ActiveModel = new_manager.into();
        model.insert(&txn).await?;
        let mut pkg = pkg.clone();
        pkg.manager_id = new_manager.id.clone();
        let pkg_model: manager_package::ActiveModel = (&pkg).into();
        pkg_model.insert(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// get a manager with its package attached.
    pub async fn get_manager(&self, id: &str) -> Result<Option<Manager>> {
        let Some(model) = manager::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let mut found: Manager = model.into();
        found.package = self.get_manager_package(id).await?;
        Ok(Some(found))
    }

    /// get just the package for a manager.
    pub async fn get_manager_package(&self, manager_id: &str) -> Result<Option<ManagerPackage>> {
        let result = manager_package::Entity::find_by_id(manager_id)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    /// the ancestor chain starting at `manager_id` (inclusive), root last.
    ///
    /// a repeated id means the tree is corrupt; the walk stops there.
    pub async fn manager_ancestors(&self, manager_id: &str) -> Result<Vec<String>> {
        let mut chain = Vec::with_capacity(4);
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = manager_id.to_string();

        while !current.is_empty() {
            if !visited.insert(current.clone()) {
                warn!(manager_id = %current, "manager tree cycle detected, stopping traversal");
                break;
            }
            chain.push(current.clone());

            let Some(row) = manager::Entity::find_by_id(&current).one(&self.conn).await? else {
                break;
            };
            match row.parent_id {
                Some(parent) if !parent.is_empty() => current = parent,
                _ => break,
            }
        }

        Ok(chain)
    }

    /// check whether a delta fits within every active ancestor's limits.
    ///
    /// zero limits are unlimited. Returns the first offender.
    pub async fn check_manager_limits(
        &self,
        manager_id: &str,
        delta: ManagerDelta,
    ) -> Result<ManagerLimitCheck> {
        if manager_id.is_empty() {
            return Ok(ManagerLimitCheck::allowed());
        }

        for id in self.manager_ancestors(manager_id).await? {
            let Some(pkg) = self.get_manager_package(&id).await? else {
                continue;
            };
            if !pkg.is_active() {
                continue;
            }

            let projected_total = pkg.current_total + delta.upload + delta.download;
            if pkg.total_limit > 0 && projected_total > pkg.total_limit {
                return Ok(ManagerLimitCheck::denied(&id, "manager total limit reached"));
            }
            if pkg.upload_limit > 0 && pkg.current_upload + delta.upload > pkg.upload_limit {
                return Ok(ManagerLimitCheck::denied(&id, "manager upload limit reached"));
            }
            if pkg.download_limit > 0 && pkg.current_download + delta.download > pkg.download_limit
            {
                return Ok(ManagerLimitCheck::denied(
                    &id,
                    "manager download limit reached",
                ));
            }
            if pkg.max_sessions > 0
                && pkg.current_sessions + delta.sessions > i64::from(pkg.max_sessions)
            {
                return Ok(ManagerLimitCheck::denied(&id, "manager max sessions reached"));
            }
            if pkg.max_online_users > 0
                && pkg.current_online_users + delta.online_users > i64::from(pkg.max_online_users)
            {
                return Ok(ManagerLimitCheck::denied(
                    &id,
                    "manager max online users reached",
                ));
            }
            if pkg.max_active_users > 0
                && pkg.current_active_users + delta.active_users > i64::from(pkg.max_active_users)
            {
                return Ok(ManagerLimitCheck::denied(
                    &id,
                    "manager max active users reached",
                ));
            }
        }

        Ok(ManagerLimitCheck::allowed())
    }

    /// apply a delta to every ancestor in one transaction.
    ///
    /// counters are clamped at zero server-side so out-of-order session
    /// decrements cannot drive them negative. Only active packages change.
    pub async fn apply_manager_usage_delta(
        &self,
        manager_id: &str,
        delta: ManagerDelta,
    ) -> Result<()> {
        if manager_id.is_empty() || delta.is_zero() {
            return Ok(());
        }

        let ancestors = self.manager_ancestors(manager_id).await?;
        let txn = self.conn.begin().await?;
        let now = Utc::now();

        for id in &ancestors {
            manager_package::Entity::update_many()
                .col_expr(
                    manager_package::Column::CurrentUpload,
                    Expr::cust_with_values("MAX(0, current_upload + ?)", [delta.upload]),
                )
                .col_expr(
                    manager_package::Column::CurrentDownload,
                    Expr::cust_with_values("MAX(0, current_download + ?)", [delta.download]),
                )
                .col_expr(
                    manager_package::Column::CurrentTotal,
                    Expr::cust_with_values(
                        "MAX(0, current_total + ?)",
                        [delta.upload + delta.download],
                    ),
                )
                .col_expr(
                    manager_package::Column::CurrentSessions,
                    Expr::cust_with_values("MAX(0, current_sessions + ?)", [delta.sessions]),
                )
                .col_expr(
                    manager_package::Column::CurrentOnlineUsers,
                    Expr::cust_with_values(
                        "MAX(0, current_online_users + ?)",
                        [delta.online_users],
                    ),
                )
                .col_expr(
                    manager_package::Column::CurrentActiveUsers,
                    Expr::cust_with_values(
                        "MAX(0, current_active_users + ?)",
                        [delta.active_users],
                    ),
                )
                .col_expr(manager_package::Column::UpdatedAt, Expr::value(now))
                .filter(manager_package::Column::ManagerId.eq(id))
                .filter(manager_package::Column::Status.eq("active"))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_types::{ManagerPackageStatus, ResetMode};

    async fn setup() -> MetaDb {
        MetaDb::new_in_memory().await.unwrap()
    }

    fn test_manager(id: &str, parent: Option<&str>, total: i64, sessions: i32) -> Manager {
        let now = Utc::now();
        Manager {
            id: id.to_string(),
            name: id.to_string(),
            parent_id: parent.map(str::to_string),
            metadata: Default::default(),
            package: Some(ManagerPackage {
                manager_id: id.to_string(),
                total_limit: total,
                upload_limit: 0,
                download_limit: 0,
                reset_mode: ResetMode::NoReset,
                duration: 0,
                start_at: None,
                max_sessions: sessions,
                max_online_users: 0,
                max_active_users: 0,
                status: ManagerPackageStatus::Active,
                current_upload: 0,
                current_download: 0,
                current_total: 0,
                current_sessions: 0,
                current_online_users: 0,
                current_active_users: 0,
                created_at: now,
                updated_at: now,
            }),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn child_limits_validated_against_parent() {
        let db = setup().await;
        db.create_manager(&test_manager("root", None, 1000, 10))
            .await
            .unwrap();
        db.create_manager(&test_manager("child", Some("root"), 500, 4))
            .await
            .unwrap();

        // a grandchild with a larger total limit than its parent fails
        let oversized = test_manager("grandchild", Some("child"), 2000, 0);
        let err = db.create_manager(&oversized).await.unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[tokio::test]
    async fn delta_applies_to_whole_ancestor_chain() {
        let db = setup().await;
        db.create_manager(&test_manager("root", None, 1000, 10))
            .await
            .unwrap();
        db.create_manager(&test_manager("child", Some("root"), 500, 4))
            .await
            .unwrap();

        db.apply_manager_usage_delta(
            "child",
            ManagerDelta {
                upload: 100,
                download: 50,
                sessions: 1,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        for id in ["root", "child"] {
            let pkg = db.get_manager_package(id).await.unwrap().unwrap();
            assert_eq!(pkg.current_total, 150, "manager {id}");
            assert_eq!(pkg.current_sessions, 1, "manager {id}");
        }
    }

    #[tokio::test]
    async fn check_reports_first_offender() {
        let db = setup().await;
        db.create_manager(&test_manager("root", None, 1000, 10))
            .await
            .unwrap();
        db.create_manager(&test_manager("child", Some("root"), 500, 4))
            .await
            .unwrap();

        let check = db
            .check_manager_limits("child", ManagerDelta::traffic(400, 200))
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!(check.manager_id, "child");
        assert_eq!(check.reason, "manager total limit reached");

        let ok = db
            .check_manager_limits("child", ManagerDelta::traffic(100, 100))
            .await
            .unwrap();
        assert!(ok.allowed);
    }

    #[tokio::test]
    async fn counters_clamp_at_zero() {
        let db = setup().await;
        db.create_manager(&test_manager("root", None, 0, 0))
            .await
            .unwrap();

        db.apply_manager_usage_delta(
            "root",
            ManagerDelta {
                sessions: -5,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let pkg = db.get_manager_package("root").await.unwrap().unwrap();
        assert_eq!(pkg.current_sessions, 0);
    }

    #[tokio::test]
    async fn cycle_stops_traversal_and_fails_open() {
        let db = setup().await;
        db.create_manager(&test_manager("a", None, 100, 0))
            .await
            .unwrap();
        db.create_manager(&test_manager("b", Some("a"), 100, 0))
            .await
            .unwrap();

        // corrupt the tree: a's parent becomes b
        manager::Entity::update_many()
            .col_expr(manager::Column::ParentId, Expr::value("b"))
            .filter(manager::Column::Id.eq("a"))
            .exec(&db.conn)
            .await
            .unwrap();

        let chain = db.manager_ancestors("a").await.unwrap();
        assert_eq!(chain, vec!["a".to_string(), "b".to_string()]);

        // the check still terminates
        let check = db
            .check_manager_limits("a", ManagerDelta::traffic(1, 1))
            .await
            .unwrap();
        assert!(check.allowed);
    }

    #[tokio::test]
    async fn inactive_packages_are_skipped() {
        let db = setup().await;
        let mut inactive = test_manager("root", None, 10, 0);
        inactive.package.as_mut().unwrap().status = ManagerPackageStatus::Inactive;
        db.create_manager(&inactive).await.unwrap();

        // way past the limit, but the package is inactive
        let check = db
            .check_manager_limits("root", ManagerDelta::traffic(100, 100))
            .await
            .unwrap();
        assert!(check.allowed);

        db.apply_manager_usage_delta("root", ManagerDelta::traffic(100, 100))
            .await
            .unwrap();
        let pkg = db.get_manager_package("root").await.unwrap().unwrap();
        assert_eq!(pkg.current_total, 0);
    }
}
