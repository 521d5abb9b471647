//! sea-orm entity definitions for the three stores.
//!
//! metadata store: users, packages, nodes, services, managers,
//! manager_packages, owner_auth_key, service_auth_keys.
//! active store: usage_reports. History store: events, usage_history.

pub mod event;
pub mod manager;
pub mod manager_package;
pub mod node;
pub mod owner_auth_key;
pub mod package;
pub mod service;
pub mod service_auth_key;
pub mod usage_history;
pub mod usage_report;
pub mod user;

use sea_orm::JsonValue;

/// decode a json-encoded string list column, defaulting to empty.
pub(crate) fn decode_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// encode a string list for a text column.
pub(crate) fn encode_string_list(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

/// decode a json object column, defaulting to empty.
pub(crate) fn decode_metadata(raw: &str) -> std::collections::HashMap<String, JsonValue> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// encode a metadata map for a text column.
pub(crate) fn encode_metadata(map: &std::collections::HashMap<String, JsonValue>) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}
