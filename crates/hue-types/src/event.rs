//! immutable audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// kind of state transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// a new session was admitted.
    #[serde(rename = "USER_CONNECTED")]
    UserConnected,
    /// a session ended.
    #[serde(rename = "USER_DISCONNECTED")]
    UserDisconnected,
    /// a usage report was accepted and recorded.
    #[serde(rename = "USAGE_RECORDED")]
    UsageRecorded,
    /// a package ran out of traffic or time.
    #[serde(rename = "PACKAGE_EXPIRED")]
    PackageExpired,
    /// a package's counters were reset.
    #[serde(rename = "PACKAGE_RESET")]
    PackageReset,
    /// a node's counters were reset.
    #[serde(rename = "NODE_RESET")]
    NodeReset,
    /// a user was suspended after a quota breach.
    #[serde(rename = "USER_SUSPENDED")]
    UserSuspended,
    /// a user was re-activated.
    #[serde(rename = "USER_ACTIVATED")]
    UserActivated,
    /// a time-boxed penalty was applied.
    #[serde(rename = "PENALTY_APPLIED")]
    PenaltyApplied,
    /// a penalty ran out.
    #[serde(rename = "PENALTY_EXPIRED")]
    PenaltyExpired,
}

impl EventType {
    /// database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserConnected => "USER_CONNECTED",
            EventType::UserDisconnected => "USER_DISCONNECTED",
            EventType::UsageRecorded => "USAGE_RECORDED",
            EventType::PackageExpired => "PACKAGE_EXPIRED",
            EventType::PackageReset => "PACKAGE_RESET",
            EventType::NodeReset => "NODE_RESET",
            EventType::UserSuspended => "USER_SUSPENDED",
            EventType::UserActivated => "USER_ACTIVATED",
            EventType::PenaltyApplied => "PENALTY_APPLIED",
            EventType::PenaltyExpired => "PENALTY_EXPIRED",
        }
    }

    /// parse a stored type string.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "USER_CONNECTED" => EventType::UserConnected,
            "USER_DISCONNECTED" => EventType::UserDisconnected,
            "USAGE_RECORDED" => EventType::UsageRecorded,
            "PACKAGE_EXPIRED" => EventType::PackageExpired,
            "PACKAGE_RESET" => EventType::PackageReset,
            "NODE_RESET" => EventType::NodeReset,
            "USER_SUSPENDED" => EventType::UserSuspended,
            "USER_ACTIVATED" => EventType::UserActivated,
            "PENALTY_APPLIED" => EventType::PenaltyApplied,
            "PENALTY_EXPIRED" => EventType::PenaltyExpired,
            _ => return None,
        })
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// an immutable record of a state transition.
///
/// events are append-only: they are written once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// unique identifier (uuid string).
    pub id: String,
    /// what happened.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// affected user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// affected package, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    /// reporting node, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// reporting service, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// free-form labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// opaque json-encoded payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<u8>,
    /// when the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// create a new event stamped with the current time and a fresh uuid.
    pub fn new(
        event_type: EventType,
        user_id: Option<String>,
        package_id: Option<String>,
        node_id: Option<String>,
        service_id: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            user_id,
            package_id,
            node_id,
            service_id,
            tags,
            metadata: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_round_trip() {
        for t in [
            EventType::UserConnected,
            EventType::UserDisconnected,
            EventType::UsageRecorded,
            EventType::PackageExpired,
            EventType::PackageReset,
            EventType::NodeReset,
            EventType::UserSuspended,
            EventType::UserActivated,
            EventType::PenaltyApplied,
            EventType::PenaltyExpired,
        ] {
            assert_eq!(EventType::parse(t.as_str()), Some(t));
        }
        assert_eq!(EventType::parse("NOT_A_TYPE"), None);
    }

    #[test]
    fn wire_format_is_screaming_snake() {
        let json = serde_json::to_string(&EventType::UsageRecorded).unwrap();
        assert_eq!(json, "\"USAGE_RECORDED\"");
    }

    #[test]
    fn events_get_unique_ids() {
        let a = Event::new(EventType::UserConnected, None, None, None, None, vec![]);
        let b = Event::new(EventType::UserConnected, None, None, None, None, vec![]);
        assert_ne!(a.id, b.id);
    }
}
