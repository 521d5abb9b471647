//! user type representing a subscriber identity.
//!
//! a user owns at most one active package and may belong to a manager
//! (reseller). only `active` users are admitted by the quota engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// lifecycle state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// user may connect and consume traffic.
    Active,
    /// blocked after a quota breach; reversible by admin or period reset.
    Suspended,
    /// package wall-clock expired.
    Expired,
    /// package fully consumed.
    Finish,
    /// manually disabled by an admin.
    Inactive,
}

impl UserStatus {
    /// database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Expired => "expired",
            UserStatus::Finish => "finish",
            UserStatus::Inactive => "inactive",
        }
    }

    /// parse a stored status string. Unknown values read as `inactive`.
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => UserStatus::Active,
            "suspended" => UserStatus::Suspended,
            "expired" => UserStatus::Expired,
            "finish" => UserStatus::Finish,
            _ => UserStatus::Inactive,
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a subscriber account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// unique identifier (uuid string).
    pub id: String,

    /// manager (reseller) this user belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,

    /// login name, unique across the system.
    pub username: String,

    /// plaintext credential presented by data-plane services.
    #[serde(skip_serializing, default)]
    pub password: String,

    /// optional public key for key-based auth methods.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub public_key: String,

    /// optional private key, never serialized outward.
    #[serde(skip_serializing, default)]
    pub private_key: String,

    /// ca certificates accepted for cert auth.
    #[serde(default)]
    pub ca_cert_list: Vec<String>,

    /// group memberships.
    #[serde(default)]
    pub groups: Vec<String>,

    /// device identifiers allowed to connect.
    #[serde(default)]
    pub allowed_devices: Vec<String>,

    /// current lifecycle state.
    pub status: UserStatus,

    /// the package currently charged for this user's traffic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_package_id: Option<String>,

    /// first time a data-plane service reported this user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_connection_at: Option<DateTime<Utc>>,

    /// last time a usage report for this user was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connection_at: Option<DateTime<Utc>>,

    /// when the user was created.
    pub created_at: DateTime<Utc>,

    /// when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// create a new active user with a fresh uuid.
    pub fn new(username: String, password: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            manager_id: None,
            username,
            password,
            public_key: String::new(),
            private_key: String::new(),
            ca_cert_list: Vec::new(),
            groups: Vec::new(),
            allowed_devices: Vec::new(),
            status: UserStatus::Active,
            active_package_id: None,
            first_connection_at: None,
            last_connection_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// true if the user is in `active` status.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// true if the user can establish a connection: active with a package.
    pub fn can_connect(&self) -> bool {
        self.is_active() && self.active_package_id.is_some()
    }
}

/// input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    /// login name.
    pub username: String,
    /// plaintext credential.
    pub password: String,
    /// owning manager, if any.
    #[serde(default)]
    pub manager_id: Option<String>,
    /// optional public key.
    #[serde(default)]
    pub public_key: String,
    /// optional private key.
    #[serde(default)]
    pub private_key: String,
    /// ca certificates accepted for cert auth.
    #[serde(default)]
    pub ca_cert_list: Vec<String>,
    /// group memberships.
    #[serde(default)]
    pub groups: Vec<String>,
    /// device allowlist.
    #[serde(default)]
    pub allowed_devices: Vec<String>,
    /// active package reference.
    #[serde(default)]
    pub active_package_id: Option<String>,
}

/// partial update for a user; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    /// new login name.
    pub username: Option<String>,
    /// new manager reference.
    pub manager_id: Option<String>,
    /// new credential.
    pub password: Option<String>,
    /// new public key.
    pub public_key: Option<String>,
    /// new private key.
    pub private_key: Option<String>,
    /// replacement ca certificate list.
    pub ca_cert_list: Option<Vec<String>>,
    /// replacement group list.
    pub groups: Option<Vec<String>>,
    /// replacement device allowlist.
    pub allowed_devices: Option<Vec<String>>,
    /// new status.
    pub status: Option<UserStatus>,
    /// new active package reference.
    pub active_package_id: Option<String>,
}

/// filters for listing users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// restrict to a status.
    pub status: Option<UserStatus>,
    /// substring match on username.
    pub search: Option<String>,
    /// page size (0 = unlimited).
    #[serde(default)]
    pub limit: u64,
    /// page offset.
    #[serde(default)]
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_without_package() {
        let user = User::new("alice".to_string(), "secret".to_string());
        assert!(user.is_active());
        assert!(!user.can_connect());
    }

    #[test]
    fn user_with_package_can_connect() {
        let mut user = User::new("alice".to_string(), "secret".to_string());
        user.active_package_id = Some("pkg-1".to_string());
        assert!(user.can_connect());

        user.status = UserStatus::Suspended;
        assert!(!user.can_connect());
    }

    #[test]
    fn status_round_trip() {
        for status in [
            UserStatus::Active,
            UserStatus::Suspended,
            UserStatus::Expired,
            UserStatus::Finish,
            UserStatus::Inactive,
        ] {
            assert_eq!(UserStatus::parse(status.as_str()), status);
        }
        assert_eq!(UserStatus::parse("garbage"), UserStatus::Inactive);
    }

    #[test]
    fn password_never_serialized() {
        let user = User::new("alice".to_string(), "hunter2".to_string());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
