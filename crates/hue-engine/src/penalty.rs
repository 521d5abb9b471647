//! time-boxed penalties for session-limit violations.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use hue_state::{DisconnectCommand, MemoryState, PenaltyEntry};

/// outcome of a penalty check.
#[derive(Debug, Default)]
pub struct PenaltyCheck {
    /// the user checked.
    pub user_id: String,
    /// true if a penalty is in force.
    pub has_penalty: bool,
    /// why the penalty was applied.
    pub reason: String,
    /// when the penalty lapses.
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// applies and checks penalties; entries live only in memory.
pub struct PenaltyManager {
    state: Arc<MemoryState>,
    duration: Duration,
}

impl PenaltyManager {
    /// create a manager with the configured penalty duration.
    pub fn new(state: Arc<MemoryState>, duration: Duration) -> Self {
        Self { state, duration }
    }

    /// check whether the user is currently penalized.
    pub fn check(&self, user_id: &str) -> PenaltyCheck {
        let mut result = PenaltyCheck {
            user_id: user_id.to_string(),
            ..Default::default()
        };

        let Some(entry) = self.state.get_penalty(user_id) else {
            return result;
        };

        result.has_penalty = true;
        result.reason = entry.reason.clone();
        result.expires_at = Some(entry.expires_at);

        debug!(
            user_id = %user_id,
            expires_at = %entry.expires_at,
            "penalty check hit"
        );
        result
    }

    /// penalize a user and queue a disconnect for each current session.
    pub fn apply(&self, user_id: &str, reason: &str) {
        let duration = chrono::Duration::from_std(self.duration)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        self.state
            .set_penalty(PenaltyEntry::new(user_id, reason, duration));

        for session in self.state.session_table(user_id).snapshot() {
            self.state.queue_disconnect(DisconnectCommand::new(
                user_id,
                &session.session_id,
                reason,
                "",
            ));
        }

        warn!(
            user_id = %user_id,
            reason = %reason,
            duration_secs = self.duration.as_secs(),
            "penalty applied"
        );
    }

    /// lift a penalty early.
    pub fn clear(&self, user_id: &str) {
        self.state.clear_penalty(user_id);
        info!(user_id = %user_id, "penalty cleared");
    }

    /// drop lapsed penalties; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.state.cleanup_expired_penalties();
        if removed > 0 {
            debug!(count = removed, "cleaned up expired penalties");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hue_types::GeoData;

    fn manager(duration: Duration) -> (PenaltyManager, Arc<MemoryState>) {
        let state = Arc::new(MemoryState::new());
        (PenaltyManager::new(Arc::clone(&state), duration), state)
    }

    #[test]
    fn apply_sets_penalty_and_queues_disconnects() {
        let (pm, state) = manager(Duration::from_secs(600));
        state
            .session_table("u1")
            .add("s1", "203.0.113.1", &GeoData::default());
        state
            .session_table("u1")
            .add("s2", "203.0.113.2", &GeoData::default());

        pm.apply("u1", "concurrent_session_limit_exceeded");

        let check = pm.check("u1");
        assert!(check.has_penalty);
        assert_eq!(check.reason, "concurrent_session_limit_exceeded");

        let batch = state.drain_disconnects();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|c| c.user_id == "u1"));
    }

    #[test]
    fn clear_lifts_penalty() {
        let (pm, _state) = manager(Duration::from_secs(600));
        pm.apply("u1", "x");
        pm.clear("u1");
        assert!(!pm.check("u1").has_penalty);
    }

    #[tokio::test]
    async fn expired_penalty_reports_none() {
        let (pm, _state) = manager(Duration::from_millis(10));
        pm.apply("u1", "x");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!pm.check("u1").has_penalty);
    }

    #[tokio::test]
    async fn cleanup_counts_expired() {
        let (pm, _state) = manager(Duration::from_millis(10));
        pm.apply("u1", "a");
        pm.apply("u2", "b");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(pm.cleanup_expired(), 2);
    }

    #[test]
    fn at_most_one_penalty_per_user() {
        let (pm, state) = manager(Duration::from_secs(600));
        pm.apply("u1", "first");
        pm.apply("u1", "second");

        let check = pm.check("u1");
        assert_eq!(check.reason, "second");
        // replacing did not leave a second entry behind
        state.clear_penalty("u1");
        assert!(!pm.check("u1").has_penalty);
    }
}
