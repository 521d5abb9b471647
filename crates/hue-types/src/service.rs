//! service type: a protocol instance hosted on a node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// authentication methods a service may offer to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// per-user uuid credential.
    Uuid,
    /// username/password.
    Password,
    /// public-key auth.
    Pubkey,
    /// client-certificate auth.
    Cert,
}

/// a protocol instance (vless, trojan, wireguard, ...) tied to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// unique identifier (uuid string).
    pub id: String,
    /// shared secret presented by the service on every call.
    #[serde(skip_serializing, default)]
    pub secret_key: String,
    /// hosting node.
    pub node_id: String,
    /// human-readable name.
    pub name: String,
    /// protocol label.
    pub protocol: String,
    /// auth methods this service accepts.
    pub allowed_auth_methods: Vec<AuthMethod>,
    /// optional callback url notified on enforcement decisions.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub callback_url: String,
    /// aggregate bytes uploaded through this service.
    pub current_upload: i64,
    /// aggregate bytes downloaded through this service.
    pub current_download: i64,
    /// when the service was created.
    pub created_at: DateTime<Utc>,
    /// when the service was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// true if the service accepts the given auth method.
    pub fn supports_auth_method(&self, method: AuthMethod) -> bool {
        self.allowed_auth_methods.contains(&method)
    }
}

/// input for creating a service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCreate {
    /// hosting node.
    pub node_id: String,
    /// shared secret.
    pub secret_key: String,
    /// human-readable name.
    pub name: String,
    /// protocol label.
    pub protocol: String,
    /// accepted auth methods.
    pub allowed_auth_methods: Vec<AuthMethod>,
    /// optional callback url.
    #[serde(default)]
    pub callback_url: String,
}

impl ServiceCreate {
    /// materialize a new service from the creation input.
    pub fn into_service(self) -> Service {
        let now = Utc::now();
        Service {
            id: uuid::Uuid::new_v4().to_string(),
            secret_key: self.secret_key,
            node_id: self.node_id,
            name: self.name,
            protocol: self.protocol,
            allowed_auth_methods: self.allowed_auth_methods,
            callback_url: self.callback_url,
            current_upload: 0,
            current_download: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// partial update for a service; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    /// new name.
    pub name: Option<String>,
    /// new shared secret.
    pub secret_key: Option<String>,
    /// replacement auth method list.
    pub allowed_auth_methods: Option<Vec<AuthMethod>>,
    /// new callback url.
    pub callback_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_auth_method() {
        let svc = ServiceCreate {
            node_id: "n1".to_string(),
            secret_key: "s".to_string(),
            name: "vless-main".to_string(),
            protocol: "vless".to_string(),
            allowed_auth_methods: vec![AuthMethod::Uuid, AuthMethod::Password],
            callback_url: String::new(),
        }
        .into_service();

        assert!(svc.supports_auth_method(AuthMethod::Uuid));
        assert!(!svc.supports_auth_method(AuthMethod::Cert));
    }

    #[test]
    fn auth_method_wire_format() {
        let json = serde_json::to_string(&AuthMethod::Pubkey).unwrap();
        assert_eq!(json, "\"pubkey\"");
    }
}
