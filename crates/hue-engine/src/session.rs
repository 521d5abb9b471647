//! concurrent-session tracking within a sliding window.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use hue_state::{MemoryState, SessionEntry};
use hue_types::GeoData;

/// outcome of a session check.
#[derive(Debug, Default)]
pub struct SessionCheck {
    /// the user checked.
    pub user_id: String,
    /// the session checked.
    pub session_id: String,
    /// true if the session may proceed.
    pub allowed: bool,
    /// true if this id was not seen before.
    pub is_new: bool,
    /// sessions active within the window before this one.
    pub current_count: usize,
    /// the cap that applied.
    pub max_concurrent: i32,
    /// true if the cap blocked a new session.
    pub session_limit_hit: bool,
    /// human-readable rejection reason.
    pub reason: String,
}

/// tracks per-user sessions against a package's concurrency cap.
pub struct SessionTracker {
    state: Arc<MemoryState>,
    window: Duration,
}

impl SessionTracker {
    /// create a tracker with the given sliding window.
    pub fn new(state: Arc<MemoryState>, window: Duration) -> Self {
        Self { state, window }
    }

    /// the configured sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// check whether a session may proceed under the user's cap.
    ///
    /// a known session is touched and allowed. A new session is allowed
    /// unless the count of window-active sessions has reached the cap
    /// (`max_concurrent <= 0` means uncapped); the caller adds it afterwards
    /// via [`SessionTracker::add_session`].
    pub fn check_session(
        &self,
        user_id: &str,
        session_id: &str,
        max_concurrent: i32,
    ) -> SessionCheck {
        let mut result = SessionCheck {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            max_concurrent,
            ..Default::default()
        };

        let table = self.state.session_table(user_id);

        if table.has(session_id) {
            table.touch(session_id);
            result.allowed = true;
            result.current_count = table.active_count(self.window);
            return result;
        }

        let active = table.active_count(self.window);
        result.current_count = active;

        if max_concurrent > 0 && active >= max_concurrent as usize {
            result.session_limit_hit = true;
            result.reason = "max concurrent sessions exceeded".to_string();
            warn!(
                user_id = %user_id,
                current = active,
                max = max_concurrent,
                "session limit exceeded"
            );
            return result;
        }

        result.allowed = true;
        result.is_new = true;
        result
    }

    /// add or refresh a session with pre-derived geo attributes.
    ///
    /// the client address is hashed on insertion and dropped; only the hash
    /// and the geo fields are retained.
    pub fn add_session(&self, user_id: &str, session_id: &str, client_ip: &str, geo: &GeoData) {
        let table = self.state.session_table(user_id);
        table.add(session_id, client_ip, geo);
        debug!(
            user_id = %user_id,
            session_id = %session_id,
            country = %geo.country,
            "session added"
        );
    }

    /// remove a session.
    pub fn remove_session(&self, user_id: &str, session_id: &str) {
        self.state.session_table(user_id).remove(session_id);
        debug!(user_id = %user_id, session_id = %session_id, "session removed");
    }

    /// sessions active within the window for a user.
    pub fn active_count(&self, user_id: &str) -> usize {
        self.state.session_table(user_id).active_count(self.window)
    }

    /// snapshot of a user's sessions.
    pub fn sessions(&self, user_id: &str) -> Vec<SessionEntry> {
        self.state.session_table(user_id).snapshot()
    }

    /// drop window-expired sessions for every user; returns the count.
    pub fn cleanup_stale(&self) -> usize {
        let mut removed = 0;
        self.state.for_each_session_table(|_, table| {
            removed += table.remove_stale(self.window);
        });
        if removed > 0 {
            debug!(count = removed, "cleaned up stale sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(window_secs: u64) -> SessionTracker {
        SessionTracker::new(Arc::new(MemoryState::new()), Duration::from_secs(window_secs))
    }

    #[test]
    fn new_session_allowed_under_cap() {
        let t = tracker(60);
        let check = t.check_session("u1", "s1", 2);
        assert!(check.allowed);
        assert!(check.is_new);
        assert_eq!(check.current_count, 0);
    }

    #[test]
    fn existing_session_is_touched_not_counted_again() {
        let t = tracker(60);
        t.add_session("u1", "s1", "203.0.113.1", &GeoData::default());

        let check = t.check_session("u1", "s1", 1);
        assert!(check.allowed);
        assert!(!check.is_new);
        assert_eq!(check.current_count, 1);
    }

    #[test]
    fn cap_blocks_excess_sessions() {
        let t = tracker(60);
        t.add_session("u1", "s1", "203.0.113.1", &GeoData::default());

        let check = t.check_session("u1", "s2", 1);
        assert!(!check.allowed);
        assert!(check.session_limit_hit);
        assert_eq!(check.reason, "max concurrent sessions exceeded");
    }

    #[test]
    fn zero_cap_means_uncapped() {
        let t = tracker(60);
        for i in 0..10 {
            let session = format!("s{i}");
            let check = t.check_session("u1", &session, 0);
            assert!(check.allowed);
            t.add_session("u1", &session, "203.0.113.1", &GeoData::default());
        }
        assert_eq!(t.active_count("u1"), 10);
    }

    #[test]
    fn cleanup_keeps_fresh_sessions() {
        let t = tracker(60);
        t.add_session("u1", "s1", "203.0.113.1", &GeoData::default());
        t.add_session("u2", "s2", "203.0.113.2", &GeoData::default());

        assert_eq!(t.cleanup_stale(), 0);
        assert_eq!(t.active_count("u1"), 1);
        assert_eq!(t.active_count("u2"), 1);
    }

    #[tokio::test]
    async fn cleanup_removes_window_expired() {
        // a zero-length window expires everything immediately
        let t = tracker(0);
        t.add_session("u1", "s1", "203.0.113.1", &GeoData::default());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(t.cleanup_stale(), 1);
        assert_eq!(t.active_count("u1"), 0);
    }
}
