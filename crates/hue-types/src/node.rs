//! node type: a logical server grouping data-plane services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::package::ResetMode;

/// a logical server identified by its allowed-IP set and secret key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// unique identifier (uuid string).
    pub id: String,
    /// shared secret presented by the node on every call.
    #[serde(skip_serializing, default)]
    pub secret_key: String,
    /// human-readable name.
    pub name: String,
    /// source addresses this node is expected to report from.
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    /// multiplier applied to reported traffic (>= 0.1).
    pub traffic_multiplier: f64,
    /// counter reset policy.
    pub reset_mode: ResetMode,
    /// day of week/month anchoring the reset.
    #[serde(default)]
    pub reset_day: i32,
    /// aggregate bytes uploaded through this node.
    pub current_upload: i64,
    /// aggregate bytes downloaded through this node.
    pub current_download: i64,
    /// geo label: country.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub country: String,
    /// geo label: city.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub city: String,
    /// geo label: isp.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub isp: String,
    /// when the node was created.
    pub created_at: DateTime<Utc>,
    /// when the node was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// aggregate traffic through this node.
    pub fn current_total(&self) -> i64 {
        self.current_upload + self.current_download
    }

    /// scale a reported delta by the node's traffic multiplier.
    ///
    /// multipliers of 0 and 1 pass the values through unchanged.
    pub fn apply_multiplier(&self, upload: i64, download: i64) -> (i64, i64) {
        if self.traffic_multiplier == 0.0 || self.traffic_multiplier == 1.0 {
            return (upload, download);
        }
        (
            (upload as f64 * self.traffic_multiplier) as i64,
            (download as f64 * self.traffic_multiplier) as i64,
        )
    }
}

/// input for creating a node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeCreate {
    /// human-readable name.
    pub name: String,
    /// shared secret.
    pub secret_key: String,
    /// allowed source addresses.
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    /// traffic multiplier, defaulting to 1.0.
    #[serde(default = "default_multiplier")]
    pub traffic_multiplier: f64,
    /// counter reset policy.
    #[serde(default = "default_reset_mode")]
    pub reset_mode: ResetMode,
    /// reset anchor day.
    #[serde(default)]
    pub reset_day: i32,
    /// geo label: country.
    #[serde(default)]
    pub country: String,
    /// geo label: city.
    #[serde(default)]
    pub city: String,
    /// geo label: isp.
    #[serde(default)]
    pub isp: String,
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_reset_mode() -> ResetMode {
    ResetMode::NoReset
}

impl NodeCreate {
    /// materialize a new node from the creation input.
    pub fn into_node(self) -> Node {
        let now = Utc::now();
        Node {
            id: uuid::Uuid::new_v4().to_string(),
            secret_key: self.secret_key,
            name: self.name,
            allowed_ips: self.allowed_ips,
            traffic_multiplier: self.traffic_multiplier.max(0.1),
            reset_mode: self.reset_mode,
            reset_day: self.reset_day,
            current_upload: 0,
            current_download: 0,
            country: self.country,
            city: self.city,
            isp: self.isp,
            created_at: now,
            updated_at: now,
        }
    }
}

/// partial update for a node; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeUpdate {
    /// new name.
    pub name: Option<String>,
    /// new shared secret.
    pub secret_key: Option<String>,
    /// replacement allowed-IP list.
    pub allowed_ips: Option<Vec<String>>,
    /// new traffic multiplier.
    pub traffic_multiplier: Option<f64>,
    /// new reset policy.
    pub reset_mode: Option<ResetMode>,
    /// new reset anchor day.
    pub reset_day: Option<i32>,
}
