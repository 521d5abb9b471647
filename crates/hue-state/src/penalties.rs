//! time-boxed penalty entries.

use chrono::{DateTime, Duration, Utc};

/// a penalty blocking a user until `expires_at`.
///
/// penalties live only in memory; they are deliberately not persisted.
#[derive(Debug, Clone)]
pub struct PenaltyEntry {
    /// the penalized user.
    pub user_id: String,
    /// why the penalty was applied.
    pub reason: String,
    /// when the penalty was applied.
    pub applied_at: DateTime<Utc>,
    /// when the penalty lapses.
    pub expires_at: DateTime<Utc>,
}

impl PenaltyEntry {
    /// create a penalty lasting `duration` from now.
    pub fn new(user_id: &str, reason: &str, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            reason: reason.to_string(),
            applied_at: now,
            expires_at: now + duration,
        }
    }

    /// true once the penalty has lapsed.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// remaining penalty time, zero if lapsed.
    pub fn time_left(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_penalty_is_in_force() {
        let entry = PenaltyEntry::new("u1", "concurrent_session_limit_exceeded", Duration::minutes(10));
        assert!(!entry.is_expired());
        assert!(entry.expires_at > entry.applied_at);
        assert!(entry.time_left() > Duration::zero());
    }

    #[test]
    fn backdated_penalty_is_expired() {
        let mut entry = PenaltyEntry::new("u1", "x", Duration::minutes(10));
        entry.expires_at = Utc::now() - Duration::seconds(1);
        assert!(entry.is_expired());
        assert_eq!(entry.time_left(), Duration::zero());
    }
}
