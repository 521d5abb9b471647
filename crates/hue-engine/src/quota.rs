//! quota evaluation and usage recording.
//!
//! checks run under the user's read lock so they can proceed in parallel;
//! recording takes the write lock, giving a total order per user. Parallel
//! checks may therefore admit deltas that together overshoot a hard limit by
//! at most one report's worth before the next record flips the status. That
//! bounded overshoot is an accepted property of the design.

use std::sync::{Arc, RwLock};

use tracing::{debug, error, warn};

use hue_db::{ManagerDelta, ManagerLimitCheck, MetaDb};
use hue_state::{DisconnectCommand, LockRegistry, MemoryState};
use hue_types::{EnforcementMode, Package, PackageStatus, User, UserStatus};

use crate::Result;

/// outcome of a quota check.
#[derive(Debug, Default)]
pub struct QuotaResult {
    /// the user checked.
    pub user_id: String,
    /// true if the report may proceed.
    pub can_use: bool,
    /// why the report was rejected.
    pub reason: String,
    /// true if a traffic quota (user or manager) was the cause.
    pub quota_exceeded: bool,
    /// the package consulted, when one was found.
    pub package: Option<Package>,
    /// true if the user cache answered without a database read.
    pub cached: bool,
}

/// enforces per-user traffic quotas and manager-tree limits.
pub struct QuotaEngine {
    meta: MetaDb,
    state: Arc<MemoryState>,
    locks: Arc<LockRegistry>,
    enforcement_mode: RwLock<EnforcementMode>,
}

impl QuotaEngine {
    /// create a quota engine over the metadata store and shared state.
    pub fn new(meta: MetaDb, state: Arc<MemoryState>, locks: Arc<LockRegistry>) -> Self {
        Self {
            meta,
            state,
            locks,
            enforcement_mode: RwLock::new(EnforcementMode::Default),
        }
    }

    /// set the process-wide manager enforcement mode.
    pub fn set_enforcement_mode(&self, mode: EnforcementMode) {
        *self.enforcement_mode.write().unwrap() = mode;
    }

    /// the current manager enforcement mode.
    pub fn enforcement_mode(&self) -> EnforcementMode {
        *self.enforcement_mode.read().unwrap()
    }

    /// decide whether `(upload, download)` may be charged to the user.
    ///
    /// runs under the user's read lock; never mutates counters.
    pub async fn check_quota(
        &self,
        user_id: &str,
        upload: i64,
        download: i64,
    ) -> Result<QuotaResult> {
        let lock = self.locks.user_lock(user_id);
        let _guard = lock.read().await;

        let mut result = QuotaResult {
            user_id: user_id.to_string(),
            ..Default::default()
        };

        // cache hit path
        if let Some(cached) = self.state.get_user(user_id) {
            result.cached = true;

            if cached.status != UserStatus::Active {
                result.reason = format!("user status is {}", cached.status);
                return Ok(result);
            }
            let Some(package_id) = cached.active_package_id.clone() else {
                result.reason = "no active package".to_string();
                return Ok(result);
            };

            let Some(pkg) = self.meta.get_package(&package_id).await? else {
                result.reason = "package not found".to_string();
                return Ok(result);
            };

            if !pkg.is_active() {
                result.reason = format!("package status is {}", pkg.status);
                result.package = Some(pkg);
                return Ok(result);
            }
            if pkg.is_expired() {
                result.reason = "package expired".to_string();
                result.package = Some(pkg);
                return Ok(result);
            }

            if pkg.total_traffic > 0 && cached.current_total + upload + download > pkg.total_traffic
            {
                result.reason = "total traffic quota exceeded".to_string();
                result.quota_exceeded = true;
                result.package = Some(pkg);
                return Ok(result);
            }
            if pkg.upload_limit > 0 && cached.current_upload + upload > pkg.upload_limit {
                result.reason = "upload quota exceeded".to_string();
                result.quota_exceeded = true;
                result.package = Some(pkg);
                return Ok(result);
            }
            if pkg.download_limit > 0 && cached.current_download + download > pkg.download_limit {
                result.reason = "download quota exceeded".to_string();
                result.quota_exceeded = true;
                result.package = Some(pkg);
                return Ok(result);
            }

            result.package = Some(pkg);
            result.can_use = true;
            self.apply_manager_check(&mut result, user_id, upload, download)
                .await?;
            return Ok(result);
        }

        // cache miss: load from the metadata store and prime the cache
        let Some(found) = self.meta.get_user(user_id).await? else {
            result.reason = "user not found".to_string();
            return Ok(result);
        };

        if !found.is_active() {
            self.state
                .set_user(user_id, found.status, found.active_package_id.clone(), 0);
            result.reason = format!("user cannot connect: status={}", found.status);
            return Ok(result);
        }

        let Some(pkg) = self.meta.get_package_by_user_id(user_id).await? else {
            self.state
                .set_user(user_id, found.status, found.active_package_id.clone(), 0);
            result.reason = "no active package".to_string();
            return Ok(result);
        };

        self.prime_cache(&found, &pkg);

        if !pkg.can_use() {
            result.reason = format!(
                "package cannot be used: status={}, expired={}",
                pkg.status,
                pkg.is_expired()
            );
            result.package = Some(pkg);
            return Ok(result);
        }

        if !check_traffic_limits(&pkg, upload, download) {
            result.reason = "traffic quota exceeded".to_string();
            result.quota_exceeded = true;
            result.package = Some(pkg);
            return Ok(result);
        }

        result.package = Some(pkg);
        result.can_use = true;
        self.manager_check_for_user(&found, &mut result, upload, download)
            .await?;
        Ok(result)
    }

    /// charge an accepted delta: package counters, manager chain, cache,
    /// and last-connection stamp, then flip statuses if a limit was reached.
    ///
    /// runs under the user's write lock; per user, records are totally
    /// ordered.
    pub async fn record_usage(&self, user_id: &str, upload: i64, download: i64) -> Result<()> {
        let lock = self.locks.user_lock(user_id);
        let _guard = lock.write().await;

        let Some(mut pkg) = self.meta.get_package_by_user_id(user_id).await? else {
            return Err(crate::Error::NotFound(format!(
                "no active package for user {user_id}"
            )));
        };

        // lazy activation: the first recorded report anchors the window
        if pkg.start_at.is_none() {
            if let Some(anchored) = self.meta.anchor_package_start(&pkg.id).await? {
                pkg = anchored;
            }
        }

        self.meta
            .update_package_usage(&pkg.id, upload, download)
            .await?;

        let found = self.meta.get_user(user_id).await?;
        if let Some(manager_id) = found.as_ref().and_then(|u| u.manager_id.as_deref()) {
            self.meta
                .apply_manager_usage_delta(manager_id, ManagerDelta::traffic(upload, download))
                .await?;
        }

        self.state.update_user_usage(user_id, upload, download);

        if let Err(e) = self.meta.touch_user_connection(user_id).await {
            warn!(user_id = %user_id, error = %e, "failed to update last connection");
        }

        // re-read and flip to finish when the limit has been met
        if let Some(updated) = self.meta.get_package(&pkg.id).await?
            && !updated.has_traffic_remaining()
        {
            if let Err(e) = self
                .meta
                .update_package_status(&pkg.id, PackageStatus::Finish)
                .await
            {
                error!(package_id = %pkg.id, error = %e, "failed to mark package finished");
            }
            if let Err(e) = self.meta.update_user_status(user_id, UserStatus::Finish).await {
                error!(user_id = %user_id, error = %e, "failed to finish user");
            }
            self.state.set_user(
                user_id,
                UserStatus::Finish,
                Some(pkg.id.clone()),
                pkg.max_concurrent,
            );
        }

        debug!(user_id = %user_id, upload, download, "usage recorded");
        Ok(())
    }

    /// recompute quota from the database and enforce: suspend the user and
    /// queue a disconnect when a limit is crossed.
    pub async fn check_and_enforce(&self, user_id: &str) -> Result<QuotaResult> {
        let mut result = self.check_quota(user_id, 0, 0).await?;

        let pkg = match result.package.take() {
            Some(pkg) => Some(pkg),
            None => self.meta.get_package_by_user_id(user_id).await?,
        };

        if let Some(pkg) = pkg {
            let total_met = pkg.total_traffic > 0 && pkg.current_total >= pkg.total_traffic;
            let upload_met = pkg.upload_limit > 0 && pkg.current_upload >= pkg.upload_limit;
            let download_met =
                pkg.download_limit > 0 && pkg.current_download >= pkg.download_limit;

            if total_met || upload_met || download_met {
                result.can_use = false;
                result.quota_exceeded = true;
                result.reason = "traffic quota exceeded".to_string();
            }
            result.package = Some(pkg);
        }

        if !result.can_use && result.quota_exceeded {
            if let Err(e) = self
                .meta
                .update_user_status(user_id, UserStatus::Suspended)
                .await
            {
                error!(user_id = %user_id, error = %e, "failed to suspend user");
            }
            self.state.set_user(
                user_id,
                UserStatus::Suspended,
                result.package.as_ref().map(|p| p.id.clone()),
                result.package.as_ref().map_or(0, |p| p.max_concurrent),
            );
            self.state
                .queue_disconnect(DisconnectCommand::new(user_id, "", "quota_exceeded", ""));
        }

        Ok(result)
    }

    /// re-prime the cache for a user from the metadata store.
    pub async fn refresh_cache(&self, user_id: &str) -> Result<()> {
        let Some(found) = self.meta.get_user(user_id).await? else {
            self.state.delete_user(user_id);
            return Ok(());
        };
        match self.meta.get_package_by_user_id(user_id).await? {
            Some(pkg) => self.prime_cache(&found, &pkg),
            None => self
                .state
                .set_user(user_id, found.status, found.active_package_id, 1),
        }
        Ok(())
    }

    /// check a session-dimension delta against the user's manager chain.
    pub async fn check_manager_session_limits(
        &self,
        user_id: &str,
        sessions: i64,
        online_users: i64,
        active_users: i64,
    ) -> Result<ManagerLimitCheck> {
        let found = self.meta.get_user(user_id).await?;
        let Some(manager_id) = found.as_ref().and_then(|u| u.manager_id.as_deref()) else {
            return Ok(ManagerLimitCheck {
                allowed: true,
                manager_id: String::new(),
                reason: String::new(),
            });
        };
        Ok(self
            .meta
            .check_manager_limits(
                manager_id,
                ManagerDelta {
                    sessions,
                    online_users,
                    active_users,
                    ..Default::default()
                },
            )
            .await?)
    }

    /// apply a session-dimension delta to the user's manager chain.
    pub async fn record_manager_session_delta(
        &self,
        user_id: &str,
        sessions: i64,
        online_users: i64,
        active_users: i64,
    ) -> Result<()> {
        let delta = ManagerDelta {
            sessions,
            online_users,
            active_users,
            ..Default::default()
        };
        if delta.is_zero() {
            return Ok(());
        }
        let found = self.meta.get_user(user_id).await?;
        let Some(manager_id) = found.as_ref().and_then(|u| u.manager_id.as_deref()) else {
            return Ok(());
        };
        self.meta
            .apply_manager_usage_delta(manager_id, delta)
            .await?;
        Ok(())
    }

    fn prime_cache(&self, found: &User, pkg: &Package) {
        self.state.set_user(
            &found.id,
            found.status,
            found.active_package_id.clone(),
            pkg.max_concurrent,
        );
        // seed cached counters from the authoritative package values
        self.state
            .update_user_usage(&found.id, pkg.current_upload, pkg.current_download);
    }

    async fn manager_check_for_user(
        &self,
        found: &User,
        result: &mut QuotaResult,
        upload: i64,
        download: i64,
    ) -> Result<()> {
        let Some(manager_id) = found.manager_id.as_deref().filter(|m| !m.is_empty()) else {
            return Ok(());
        };
        let check = self
            .meta
            .check_manager_limits(manager_id, ManagerDelta::traffic(upload, download))
            .await?;
        self.fold_manager_check(result, check);
        Ok(())
    }

    async fn apply_manager_check(
        &self,
        result: &mut QuotaResult,
        user_id: &str,
        upload: i64,
        download: i64,
    ) -> Result<()> {
        let Some(found) = self.meta.get_user(user_id).await? else {
            return Ok(());
        };
        self.manager_check_for_user(&found, result, upload, download)
            .await
    }

    fn fold_manager_check(&self, result: &mut QuotaResult, check: ManagerLimitCheck) {
        if check.allowed {
            return;
        }
        warn!(
            manager_id = %check.manager_id,
            reason = %check.reason,
            mode = ?self.enforcement_mode(),
            "manager limit reached"
        );
        result.quota_exceeded = true;
        result.reason = check.reason;
        // soft mode reports the violation but never blocks on it
        if self.enforcement_mode().blocks() {
            result.can_use = false;
        }
    }
}

/// check a delta against a package's own limits (zero = unlimited).
fn check_traffic_limits(pkg: &Package, upload: i64, download: i64) -> bool {
    if pkg.total_traffic > 0 && pkg.current_total + upload + download > pkg.total_traffic {
        return false;
    }
    if pkg.upload_limit > 0 && pkg.current_upload + upload > pkg.upload_limit {
        return false;
    }
    if pkg.download_limit > 0 && pkg.current_download + download > pkg.download_limit {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_types::{PackageCreate, ResetMode};

    struct Fixture {
        meta: MetaDb,
        state: Arc<MemoryState>,
        engine: QuotaEngine,
        user_id: String,
        package_id: String,
    }

    async fn fixture(total: i64, upload_limit: i64, download_limit: i64) -> Fixture {
        let meta = MetaDb::new_in_memory().await.unwrap();
        let state = Arc::new(MemoryState::new());
        let locks = Arc::new(LockRegistry::new());
        let engine = QuotaEngine::new(meta.clone(), Arc::clone(&state), locks);

        let mut owner = User::new("tester".to_string(), "secret".to_string());
        meta.create_user(&owner).await.unwrap();

        let pkg = PackageCreate {
            user_id: owner.id.clone(),
            total_traffic: total,
            total_limit: 0,
            upload_limit,
            download_limit,
            reset_mode: ResetMode::NoReset,
            duration: 3600,
            start_at: None,
            max_concurrent: 2,
        }
        .into_package();
        meta.create_package(&pkg).await.unwrap();
        owner.active_package_id = Some(pkg.id.clone());
        meta.update_user(&owner).await.unwrap();

        Fixture {
            meta,
            state,
            engine,
            user_id: owner.id,
            package_id: pkg.id,
        }
    }

    #[tokio::test]
    async fn within_limits_is_accepted() {
        let f = fixture(1000, 0, 0).await;
        let result = f.engine.check_quota(&f.user_id, 100, 200).await.unwrap();
        assert!(result.can_use, "reason: {}", result.reason);
        assert!(!result.quota_exceeded);
    }

    #[tokio::test]
    async fn over_total_limit_is_rejected() {
        let f = fixture(100, 0, 0).await;
        let result = f.engine.check_quota(&f.user_id, 70, 40).await.unwrap();
        assert!(!result.can_use);
        assert!(result.quota_exceeded);
        assert_eq!(result.reason, "traffic quota exceeded");
    }

    #[tokio::test]
    async fn recorded_usage_reaches_database_and_cache() {
        let f = fixture(1000, 0, 0).await;
        // prime the cache with a check
        f.engine.check_quota(&f.user_id, 0, 0).await.unwrap();
        f.engine.record_usage(&f.user_id, 120, 80).await.unwrap();

        let pkg = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert_eq!(pkg.current_upload, 120);
        assert_eq!(pkg.current_download, 80);
        assert_eq!(pkg.current_total, 200);

        let cached = f.state.get_user(&f.user_id).unwrap();
        assert_eq!(cached.current_total, 200);
    }

    #[tokio::test]
    async fn exhausting_package_flips_to_finish() {
        let f = fixture(200, 0, 0).await;
        f.engine.record_usage(&f.user_id, 120, 80).await.unwrap();

        let pkg = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert_eq!(pkg.status, PackageStatus::Finish);
        let owner = f.meta.get_user(&f.user_id).await.unwrap().unwrap();
        assert_eq!(owner.status, UserStatus::Finish);

        // subsequent checks reject via the cache
        let result = f.engine.check_quota(&f.user_id, 1, 1).await.unwrap();
        assert!(!result.can_use);
        assert!(result.cached);
    }

    #[tokio::test]
    async fn upload_limit_checked_independently() {
        let f = fixture(0, 100, 0).await;
        // prime the cache, then consume most of the upload allowance
        f.engine.check_quota(&f.user_id, 0, 0).await.unwrap();
        f.engine.record_usage(&f.user_id, 90, 500).await.unwrap();

        let result = f.engine.check_quota(&f.user_id, 20, 0).await.unwrap();
        assert!(!result.can_use);
        assert_eq!(result.reason, "upload quota exceeded");
    }

    #[tokio::test]
    async fn check_and_enforce_suspends_and_queues_disconnect() {
        let f = fixture(100, 0, 0).await;
        // overshoot directly in the store (e.g. raced reports)
        f.meta
            .update_package_usage(&f.package_id, 70, 40)
            .await
            .unwrap();

        let result = f.engine.check_and_enforce(&f.user_id).await.unwrap();
        assert!(!result.can_use);
        assert!(result.quota_exceeded);

        let owner = f.meta.get_user(&f.user_id).await.unwrap().unwrap();
        assert_eq!(owner.status, UserStatus::Suspended);

        let batch = f.state.drain_disconnects();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].reason, "quota_exceeded");
    }

    #[tokio::test]
    async fn recording_anchors_lazy_start() {
        let f = fixture(0, 0, 0).await;
        let before = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert!(before.start_at.is_none());

        f.engine.record_usage(&f.user_id, 1, 1).await.unwrap();
        let after = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert!(after.start_at.is_some());
        assert!(after.expires_at.is_some());
    }

    async fn attach_manager(f: &Fixture, total_limit: i64) {
        let now = chrono::Utc::now();
        let root = hue_types::Manager {
            id: "root".to_string(),
            name: "root".to_string(),
            parent_id: None,
            metadata: Default::default(),
            package: Some(hue_types::ManagerPackage {
                manager_id: "root".to_string(),
                total_limit,
                upload_limit: 0,
                download_limit: 0,
                reset_mode: ResetMode::NoReset,
                duration: 0,
                start_at: None,
                max_sessions: 0,
                max_online_users: 0,
                max_active_users: 0,
                status: hue_types::ManagerPackageStatus::Active,
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
        };
        f.meta.create_manager(&root).await.unwrap();

        let mut owner = f.meta.get_user(&f.user_id).await.unwrap().unwrap();
        owner.manager_id = Some("root".to_string());
        f.meta.update_user(&owner).await.unwrap();
    }

    #[tokio::test]
    async fn manager_limit_blocks_in_default_mode() {
        let f = fixture(0, 0, 0).await;
        attach_manager(&f, 100).await;

        let result = f.engine.check_quota(&f.user_id, 70, 40).await.unwrap();
        assert!(!result.can_use);
        assert!(result.quota_exceeded);
        assert_eq!(result.reason, "manager total limit reached");
    }

    #[tokio::test]
    async fn manager_limit_only_reports_in_soft_mode() {
        let f = fixture(0, 0, 0).await;
        attach_manager(&f, 100).await;
        f.engine.set_enforcement_mode(EnforcementMode::Soft);

        let result = f.engine.check_quota(&f.user_id, 70, 40).await.unwrap();
        assert!(result.can_use);
        assert!(result.quota_exceeded);
        assert_eq!(result.reason, "manager total limit reached");
    }

    #[tokio::test]
    async fn recorded_usage_propagates_to_manager_chain() {
        let f = fixture(0, 0, 0).await;
        attach_manager(&f, 0).await;

        f.engine.record_usage(&f.user_id, 100, 50).await.unwrap();
        let pkg = f.meta.get_manager_package("root").await.unwrap().unwrap();
        assert_eq!(pkg.current_total, 150);
    }

    #[tokio::test]
    async fn inactive_user_rejected_with_status_reason() {
        let f = fixture(1000, 0, 0).await;
        f.meta
            .update_user_status(&f.user_id, UserStatus::Suspended)
            .await
            .unwrap();

        let result = f.engine.check_quota(&f.user_id, 1, 1).await.unwrap();
        assert!(!result.can_use);
        assert!(result.reason.contains("suspended"));
    }
}
