//! the per-report usage pipeline.
//!
//! ordered steps with early return on reject:
//! penalty → package → session → quota → geo → session add → record →
//! buffer/history → node+service counters → events → exhaustion check.
//!
//! rejections never cross component boundaries as errors; every outcome is
//! a populated [`UsageReportResult`]. Best-effort writes (aggregate
//! counters, events, history) log and continue.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use hue_db::{ActiveDb, HistoryDb, MetaDb};
use hue_state::{DisconnectCommand, MemoryState};
use hue_types::{Event, EventType, GeoData, UsageReport, UsageReportResult, UserStatus};

use crate::events::{EventStore, ReceiverHub, emit};
use crate::geo::GeoIpResolver;
use crate::penalty::PenaltyManager;
use crate::quota::QuotaEngine;
use crate::session::SessionTracker;

/// the usage enforcement engine: orchestrates one report end to end.
pub struct UsageEngine {
    quota: Arc<QuotaEngine>,
    session: Arc<SessionTracker>,
    penalty: Arc<PenaltyManager>,
    geo: Option<Arc<dyn GeoIpResolver>>,
    events: EventStore,
    hub: Arc<ReceiverHub>,
    state: Arc<MemoryState>,
    meta: MetaDb,
    active: Arc<ActiveDb>,
    history: HistoryDb,
}

impl UsageEngine {
    /// assemble the engine from its parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quota: Arc<QuotaEngine>,
        session: Arc<SessionTracker>,
        penalty: Arc<PenaltyManager>,
        geo: Option<Arc<dyn GeoIpResolver>>,
        events: EventStore,
        hub: Arc<ReceiverHub>,
        state: Arc<MemoryState>,
        meta: MetaDb,
        active: Arc<ActiveDb>,
        history: HistoryDb,
    ) -> Self {
        Self {
            quota,
            session,
            penalty,
            geo,
            events,
            hub,
            state,
            meta,
            active,
            history,
        }
    }

    /// the quota engine.
    pub fn quota(&self) -> &QuotaEngine {
        &self.quota
    }

    /// the session tracker.
    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    /// the penalty manager.
    pub fn penalty(&self) -> &PenaltyManager {
        &self.penalty
    }

    /// the event store.
    pub fn events(&self) -> &EventStore {
        &self.events
    }

    /// the receiver hub for in-process subscribers.
    pub fn hub(&self) -> &ReceiverHub {
        &self.hub
    }

    /// process one usage report through the full pipeline.
    pub async fn process_report(&self, report: &UsageReport) -> UsageReportResult {
        let mut result = UsageReportResult::rejected(&report.user_id);

        // 1. an active penalty short-circuits everything
        if self.penalty.check(&report.user_id).has_penalty {
            result.should_disconnect = true;
            result.reason = "user has active penalty".to_string();
            return result;
        }

        // 2. the package supplies the concurrency cap
        let pkg = match self.meta.get_package_by_user_id(&report.user_id).await {
            Ok(Some(pkg)) => pkg,
            Ok(None) => {
                result.reason = "no active package".to_string();
                return result;
            }
            Err(e) => {
                error!(user_id = %report.user_id, error = %e, "failed to get package");
                result.reason = "failed to get package".to_string();
                return result;
            }
        };

        // 3. concurrent-session enforcement
        let session_check =
            self.session
                .check_session(&report.user_id, &report.session_id, pkg.max_concurrent);
        if session_check.session_limit_hit {
            self.penalty
                .apply(&report.user_id, "concurrent_session_limit_exceeded");
            result.session_limit_hit = true;
            result.penalty_applied = true;
            result.should_disconnect = true;
            result.reason = "concurrent session limit exceeded, penalty applied".to_string();

            self.emit(
                EventType::PenaltyApplied,
                Some(report.user_id.as_str()),
                Some(pkg.id.as_str()),
                None,
                None,
                vec!["concurrent_limit".to_string()],
            )
            .await;
            return result;
        }

        // 4. quota decision
        let quota_check = match self
            .quota
            .check_quota(&report.user_id, report.upload, report.download)
            .await
        {
            Ok(check) => check,
            Err(e) => {
                error!(user_id = %report.user_id, error = %e, "quota check failed");
                result.reason = "quota check failed".to_string();
                return result;
            }
        };

        if !quota_check.can_use {
            result.quota_exceeded = quota_check.quota_exceeded;
            result.should_disconnect = true;
            result.reason = quota_check.reason;

            if result.quota_exceeded {
                if let Err(e) = self
                    .meta
                    .update_user_status(&report.user_id, UserStatus::Suspended)
                    .await
                {
                    error!(user_id = %report.user_id, error = %e, "failed to suspend user");
                }
                self.state.set_user(
                    &report.user_id,
                    UserStatus::Suspended,
                    Some(pkg.id.clone()),
                    pkg.max_concurrent,
                );
                self.emit(
                    EventType::UserSuspended,
                    Some(report.user_id.as_str()),
                    Some(pkg.id.as_str()),
                    None,
                    None,
                    vec!["quota_exceeded".to_string()],
                )
                .await;
            }
            return result;
        }

        // 5. derive geo attributes; the raw address goes no further
        let geo = self.extract_geo(&report.client_ip);

        // 6. admit or refresh the session
        self.session
            .add_session(&report.user_id, &report.session_id, &report.client_ip, &geo);
        if session_check.is_new {
            self.emit(
                EventType::UserConnected,
                Some(report.user_id.as_str()),
                Some(pkg.id.as_str()),
                Some(report.node_id.as_str()),
                Some(report.service_id.as_str()),
                report.tags.clone(),
            )
            .await;
            if let Err(e) = self
                .quota
                .record_manager_session_delta(&report.user_id, 1, 0, 0)
                .await
            {
                warn!(user_id = %report.user_id, error = %e, "failed to record manager session delta");
            }
        }

        // 7. charge the usage
        if let Err(e) = self
            .quota
            .record_usage(&report.user_id, report.upload, report.download)
            .await
        {
            error!(user_id = %report.user_id, error = %e, "failed to record usage");
            result.reason = "failed to record usage".to_string();
            return result;
        }

        // 8. buffer the raw row and append history (best effort)
        if let Err(e) = self.active.buffer_usage(report.clone()).await {
            warn!(user_id = %report.user_id, error = %e, "failed to buffer usage report");
        }
        if let Err(e) = self.history.store_usage(report, &pkg.id, &geo).await {
            warn!(user_id = %report.user_id, error = %e, "failed to store usage history");
        }

        // 9. node and service aggregates (best effort)
        if !report.node_id.is_empty()
            && let Err(e) = self
                .meta
                .update_node_usage(&report.node_id, report.upload, report.download)
                .await
        {
            warn!(node_id = %report.node_id, error = %e, "failed to update node usage");
        }
        if !report.service_id.is_empty()
            && let Err(e) = self
                .meta
                .update_service_usage(&report.service_id, report.upload, report.download)
                .await
        {
            warn!(service_id = %report.service_id, error = %e, "failed to update service usage");
        }

        // 10. usage recorded
        self.emit(
            EventType::UsageRecorded,
            Some(report.user_id.as_str()),
            Some(pkg.id.as_str()),
            Some(report.node_id.as_str()),
            Some(report.service_id.as_str()),
            report.tags.clone(),
        )
        .await;

        // 11. post-record exhaustion check
        match self.meta.get_package(&pkg.id).await {
            Ok(Some(updated)) if !updated.has_traffic_remaining() => {
                if let Err(e) = self
                    .meta
                    .update_package_status(&pkg.id, hue_types::PackageStatus::Finish)
                    .await
                {
                    error!(package_id = %pkg.id, error = %e, "failed to finish package");
                }
                if let Err(e) = self
                    .meta
                    .update_user_status(&report.user_id, UserStatus::Finish)
                    .await
                {
                    error!(user_id = %report.user_id, error = %e, "failed to finish user");
                }
                self.emit(
                    EventType::PackageExpired,
                    Some(report.user_id.as_str()),
                    Some(pkg.id.as_str()),
                    None,
                    None,
                    vec![],
                )
                .await;
            }
            Ok(_) => {}
            Err(e) => warn!(package_id = %pkg.id, error = %e, "post-record package read failed"),
        }

        result.accepted = true;
        result.package_id = pkg.id;
        result
    }

    /// process reports in input order; one failure does not abort the rest.
    pub async fn process_batch(&self, reports: &[UsageReport]) -> Vec<UsageReportResult> {
        let mut results = Vec::with_capacity(reports.len());
        for report in reports {
            results.push(self.process_report(report).await);
        }
        results
    }

    /// handle a data-plane disconnect notification.
    pub async fn handle_disconnect(&self, user_id: &str, session_id: &str) {
        self.session.remove_session(user_id, session_id);
        if let Err(e) = self
            .quota
            .record_manager_session_delta(user_id, -1, 0, 0)
            .await
        {
            warn!(user_id = %user_id, error = %e, "failed to record manager session delta");
        }
        self.emit(EventType::UserDisconnected, Some(user_id), None, None, None, vec![])
            .await;
    }

    /// drain the pending disconnect commands.
    pub fn disconnect_batch(&self) -> Vec<DisconnectCommand> {
        self.state.drain_disconnects()
    }

    /// periodic maintenance: stale sessions and lapsed penalties.
    pub fn cleanup(&self) -> (usize, usize) {
        let sessions = self.session.cleanup_stale();
        let penalties = self.penalty.cleanup_expired();
        if sessions > 0 || penalties > 0 {
            info!(
                stale_sessions = sessions,
                expired_penalties = penalties,
                "cleanup completed"
            );
        }
        (sessions, penalties)
    }

    fn extract_geo(&self, client_ip: &str) -> GeoData {
        let Some(resolver) = self.geo.as_deref() else {
            return GeoData::default();
        };
        let Ok(ip) = client_ip.parse::<IpAddr>() else {
            return GeoData::default();
        };
        resolver.lookup(ip)
    }

    async fn emit(
        &self,
        event_type: EventType,
        user_id: Option<&str>,
        package_id: Option<&str>,
        node_id: Option<&str>,
        service_id: Option<&str>,
        tags: Vec<String>,
    ) {
        let ev = Event::new(
            event_type,
            user_id.map(str::to_string),
            package_id.map(str::to_string),
            node_id.map(str::to_string),
            service_id.map(str::to_string),
            tags,
        );
        emit(&self.events, &self.hub, ev).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::mpsc;

    use hue_state::LockRegistry;
    use hue_types::{
        AuthMethod, EventStoreKind, NodeCreate, PackageCreate, ResetMode, ServiceCreate, User,
    };

    struct Fixture {
        engine: UsageEngine,
        meta: MetaDb,
        state: Arc<MemoryState>,
        events: mpsc::Receiver<Event>,
        user_id: String,
        package_id: String,
        node_id: String,
        service_id: String,
    }

    async fn fixture(max_concurrent: i32, total_traffic: i64) -> Fixture {
        let meta = MetaDb::new_in_memory().await.unwrap();
        let active = Arc::new(ActiveDb::new_in_memory().await.unwrap());
        let history = HistoryDb::new_in_memory().await.unwrap();
        let state = Arc::new(MemoryState::new());
        let locks = Arc::new(LockRegistry::new());

        let node = NodeCreate {
            name: "node-main".to_string(),
            secret_key: "node-secret".to_string(),
            allowed_ips: vec![],
            traffic_multiplier: 1.0,
            reset_mode: ResetMode::NoReset,
            reset_day: 0,
            country: String::new(),
            city: String::new(),
            isp: String::new(),
        }
        .into_node();
        meta.create_node(&node).await.unwrap();

        let service = ServiceCreate {
            node_id: node.id.clone(),
            secret_key: "service-secret".to_string(),
            name: "vless".to_string(),
            protocol: "vless".to_string(),
            allowed_auth_methods: vec![AuthMethod::Uuid],
            callback_url: String::new(),
        }
        .into_service();
        meta.create_service(&service).await.unwrap();

        let mut owner = User::new("tester".to_string(), "secret".to_string());
        meta.create_user(&owner).await.unwrap();
        let pkg = PackageCreate {
            user_id: owner.id.clone(),
            total_traffic,
            total_limit: 0,
            upload_limit: 0,
            download_limit: 0,
            reset_mode: ResetMode::NoReset,
            duration: 3600,
            start_at: None,
            max_concurrent,
        }
        .into_package();
        meta.create_package(&pkg).await.unwrap();
        owner.active_package_id = Some(pkg.id.clone());
        meta.update_user(&owner).await.unwrap();

        let quota = Arc::new(QuotaEngine::new(
            meta.clone(),
            Arc::clone(&state),
            Arc::clone(&locks),
        ));
        let session = Arc::new(SessionTracker::new(
            Arc::clone(&state),
            Duration::from_secs(120),
        ));
        let penalty = Arc::new(PenaltyManager::new(
            Arc::clone(&state),
            Duration::from_secs(600),
        ));
        let hub = Arc::new(ReceiverHub::new());
        let events = hub.subscribe("test", 32, vec![]);
        let store = EventStore::new(EventStoreKind::Db, history.clone()).unwrap();

        let engine = UsageEngine::new(
            quota,
            session,
            penalty,
            None,
            store,
            Arc::clone(&hub),
            Arc::clone(&state),
            meta.clone(),
            active,
            history,
        );

        Fixture {
            engine,
            meta,
            state,
            events,
            user_id: owner.id,
            package_id: pkg.id,
            node_id: node.id,
            service_id: service.id,
        }
    }

    fn report(f: &Fixture, session: &str, upload: i64, download: i64) -> UsageReport {
        UsageReport {
            id: String::new(),
            user_id: f.user_id.clone(),
            node_id: f.node_id.clone(),
            service_id: f.service_id.clone(),
            upload,
            download,
            session_id: session.to_string(),
            client_ip: "203.0.113.10".to_string(),
            tags: vec![],
            timestamp: Utc::now(),
        }
    }

    fn drain_event_types(events: &mut mpsc::Receiver<Event>) -> Vec<EventType> {
        let mut types = Vec::new();
        while let Ok(ev) = events.try_recv() {
            types.push(ev.event_type);
        }
        types
    }

    #[tokio::test]
    async fn accepted_report_updates_all_counters_and_emits_in_order() {
        let mut f = fixture(2, 1000).await;

        let result = f.engine.process_report(&report(&f, "s1", 120, 80)).await;
        assert!(result.accepted, "reason: {}", result.reason);
        assert_eq!(result.package_id, f.package_id);

        let pkg = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert_eq!(
            (pkg.current_upload, pkg.current_download, pkg.current_total),
            (120, 80, 200)
        );

        let node = f.meta.get_node(&f.node_id).await.unwrap().unwrap();
        assert_eq!((node.current_upload, node.current_download), (120, 80));
        let service = f.meta.get_service(&f.service_id).await.unwrap().unwrap();
        assert_eq!((service.current_upload, service.current_download), (120, 80));

        assert_eq!(
            drain_event_types(&mut f.events),
            vec![EventType::UserConnected, EventType::UsageRecorded]
        );
    }

    #[tokio::test]
    async fn over_quota_report_suspends_user() {
        let mut f = fixture(1, 100).await;

        let result = f.engine.process_report(&report(&f, "s1", 70, 40)).await;
        assert!(!result.accepted);
        assert!(result.quota_exceeded);
        assert!(result.should_disconnect);

        let owner = f.meta.get_user(&f.user_id).await.unwrap().unwrap();
        assert_eq!(owner.status, UserStatus::Suspended);

        assert_eq!(
            drain_event_types(&mut f.events),
            vec![EventType::UserSuspended]
        );
    }

    #[tokio::test]
    async fn session_limit_applies_penalty_and_disconnects() {
        let mut f = fixture(1, 0).await;

        let first = f.engine.process_report(&report(&f, "s1", 10, 10)).await;
        assert!(first.accepted, "reason: {}", first.reason);

        let second = f.engine.process_report(&report(&f, "s2", 10, 10)).await;
        assert!(!second.accepted);
        assert!(second.session_limit_hit);
        assert!(second.penalty_applied);
        assert!(second.should_disconnect);

        // the queued disconnect targets the existing session
        let batch = f.engine.disconnect_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].session_id, "s1");
        assert_eq!(batch[0].reason, "concurrent_session_limit_exceeded");

        // during the penalty even a fresh session is refused
        let third = f.engine.process_report(&report(&f, "s3", 1, 1)).await;
        assert!(!third.accepted);
        assert!(third.should_disconnect);
        assert_eq!(third.reason, "user has active penalty");

        let types = drain_event_types(&mut f.events);
        assert!(types.contains(&EventType::PenaltyApplied));
    }

    #[tokio::test]
    async fn exhausting_report_expires_package() {
        let mut f = fixture(1, 200).await;

        let result = f.engine.process_report(&report(&f, "s1", 120, 80)).await;
        assert!(result.accepted);

        let pkg = f.meta.get_package(&f.package_id).await.unwrap().unwrap();
        assert_eq!(pkg.status, hue_types::PackageStatus::Finish);

        let types = drain_event_types(&mut f.events);
        assert_eq!(
            types,
            vec![
                EventType::UserConnected,
                EventType::UsageRecorded,
                EventType::PackageExpired
            ]
        );
    }

    #[tokio::test]
    async fn batch_returns_results_in_input_order() {
        let f = fixture(5, 1000).await;

        let reports = vec![
            report(&f, "s1", 10, 10),
            // unknown user fails without aborting the batch
            UsageReport {
                user_id: "no-such-user".to_string(),
                ..report(&f, "s2", 1, 1)
            },
            report(&f, "s3", 20, 20),
        ];

        let results = f.engine.process_batch(&reports).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].accepted);
        assert!(!results[1].accepted);
        assert_eq!(results[1].reason, "no active package");
        assert!(results[2].accepted);
    }

    #[tokio::test]
    async fn disconnect_removes_session_and_emits() {
        let mut f = fixture(2, 0).await;
        f.engine.process_report(&report(&f, "s1", 1, 1)).await;
        assert_eq!(f.engine.session().active_count(&f.user_id), 1);

        f.engine.handle_disconnect(&f.user_id, "s1").await;
        assert_eq!(f.engine.session().active_count(&f.user_id), 0);

        let types = drain_event_types(&mut f.events);
        assert!(types.contains(&EventType::UserDisconnected));
    }

    #[tokio::test]
    async fn no_raw_ip_in_stored_state() {
        let f = fixture(2, 0).await;
        f.engine.process_report(&report(&f, "s1", 1, 1)).await;

        for session in f.engine.session().sessions(&f.user_id) {
            assert!(!format!("{session:?}").contains("203.0.113.10"));
        }
        // the cached state never saw the address either
        assert!(f.state.get_user(&f.user_id).is_some());
    }
}
