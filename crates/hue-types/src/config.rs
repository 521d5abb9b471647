//! application configuration.

use std::time::Duration;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// which backend persists emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStoreKind {
    /// persist to the history store.
    Db,
    /// reserved; selecting it fails with "not implemented".
    File,
    /// drop all events.
    None,
}

impl EventStoreKind {
    /// parse a configured kind string. Unknown values read as `db`.
    pub fn parse(s: &str) -> Self {
        match s {
            "file" => EventStoreKind::File,
            "none" => EventStoreKind::None,
            _ => EventStoreKind::Db,
        }
    }
}

/// error raised for malformed configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// a duration string could not be parsed.
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
    /// an allowlist entry was neither a cidr nor an address.
    #[error("invalid IP/CIDR: {0:?}")]
    InvalidCidr(String),
}

/// main configuration for hue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// base database url; `_active` / `_history` stores derive from it.
    pub db_url: String,

    /// grpc listen port.
    pub grpc_port: u16,

    /// http listen port.
    pub http_port: u16,

    /// log level (trace/debug/info/warn/error).
    pub log_level: String,

    /// shared admin secret; required in production.
    pub auth_secret: String,

    /// how often the active buffer is flushed to disk.
    #[serde(with = "duration_secs")]
    pub flush_interval: Duration,

    /// sliding window for concurrent-session counting.
    #[serde(with = "duration_secs")]
    pub concurrent_window: Duration,

    /// how long a penalty blocks a user.
    #[serde(with = "duration_secs")]
    pub penalty_duration: Duration,

    /// retention for processed raw usage rows.
    #[serde(with = "duration_secs")]
    pub usage_retention: Duration,

    /// path to a maxmind database; geo features disabled when empty.
    pub maxmind_db_path: String,

    /// which backend persists events.
    pub event_store: EventStoreKind,

    /// source networks allowed to call node/usage services; empty = all.
    pub allowed_node_ips: Vec<IpNet>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: "sqlite://./hue.db".to_string(),
            grpc_port: 50051,
            http_port: 50052,
            log_level: "info".to_string(),
            auth_secret: String::new(),
            flush_interval: Duration::from_secs(5 * 60),
            concurrent_window: Duration::from_secs(5 * 60),
            penalty_duration: Duration::from_secs(10 * 60),
            usage_retention: Duration::from_secs(30 * 24 * 3600),
            maxmind_db_path: String::new(),
            event_store: EventStoreKind::Db,
            allowed_node_ips: Vec::new(),
        }
    }
}

impl Config {
    /// parse a comma-separated allowlist of CIDRs or bare addresses.
    ///
    /// bare addresses are widened to /32 (v4) or /128 (v6).
    pub fn parse_allowed_ips(raw: &str) -> Result<Vec<IpNet>, ConfigError> {
        let mut nets = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Ok(net) = part.parse::<IpNet>() {
                nets.push(net);
                continue;
            }
            let addr: std::net::IpAddr = part
                .parse()
                .map_err(|_| ConfigError::InvalidCidr(part.to_string()))?;
            let prefix = if addr.is_ipv4() { 32 } else { 128 };
            nets.push(IpNet::new(addr, prefix).map_err(|_| ConfigError::InvalidCidr(part.to_string()))?);
        }
        Ok(nets)
    }

    /// true if `addr` is allowed to call node/usage services.
    pub fn is_node_ip_allowed(&self, addr: std::net::IpAddr) -> bool {
        if self.allowed_node_ips.is_empty() {
            return true;
        }
        self.allowed_node_ips.iter().any(|net| net.contains(&addr))
    }
}

/// parse a human duration: `5m`, `90s`, `2h`, `1d`, or bare seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::InvalidDuration(raw.to_string()));
    }

    let (digits, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| ConfigError::InvalidDuration(raw.to_string()))?;

    let secs = match unit {
        "s" | "" => value,
        "m" => value * 60,
        "h" => value * 3600,
        "d" => value * 24 * 3600,
        _ => return Err(ConfigError::InvalidDuration(raw.to_string())),
    };

    Ok(Duration::from_secs(secs))
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_forms() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("42").unwrap(), Duration::from_secs(42));
        assert!(parse_duration("5 parsecs").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn allowlist_parsing() {
        let nets = Config::parse_allowed_ips("10.0.0.0/8, 192.168.1.5").unwrap();
        assert_eq!(nets.len(), 2);

        let mut cfg = Config::default();
        cfg.allowed_node_ips = nets;
        assert!(cfg.is_node_ip_allowed("10.1.2.3".parse().unwrap()));
        assert!(cfg.is_node_ip_allowed("192.168.1.5".parse().unwrap()));
        assert!(!cfg.is_node_ip_allowed("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn empty_allowlist_allows_everything() {
        let cfg = Config::default();
        assert!(cfg.is_node_ip_allowed("203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn invalid_allowlist_entry_rejected() {
        assert!(Config::parse_allowed_ips("not-an-ip").is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.db_url, "sqlite://./hue.db");
        assert_eq!(cfg.grpc_port, 50051);
        assert_eq!(cfg.http_port, 50052);
        assert_eq!(cfg.flush_interval, Duration::from_secs(300));
        assert_eq!(cfg.concurrent_window, Duration::from_secs(300));
        assert_eq!(cfg.penalty_duration, Duration::from_secs(600));
        assert_eq!(cfg.event_store, EventStoreKind::Db);
    }
}
