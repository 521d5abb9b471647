//! gRPC services: admin, usage, and node.
//!
//! authentication is a shared secret presented in request metadata on every
//! admin call; node/usage calls additionally pass the optional IP allowlist.

mod admin;
mod node;
mod usage;

pub use admin::AdminServiceImpl;
pub use node::NodeServiceImpl;
pub use usage::UsageServiceImpl;

/// generated protobuf types.
pub mod pb {
    #![allow(missing_docs)]
    tonic::include_proto!("hue.v1");
}

use subtle::ConstantTimeEq;
use tonic::{Request, Status};

use hue_types::Config;

/// metadata key carrying the admin secret.
const SECRET_METADATA_KEY: &str = "x-hue-secret";

/// reject calls whose source address is outside the configured allowlist.
pub(crate) fn check_node_ip<T>(req: &Request<T>, config: &Config) -> Result<(), Status> {
    if config.allowed_node_ips.is_empty() {
        return Ok(());
    }
    let Some(addr) = req.remote_addr() else {
        return Err(Status::permission_denied("source address unavailable"));
    };
    if !config.is_node_ip_allowed(addr.ip()) {
        return Err(Status::permission_denied(format!(
            "IP {} not allowed",
            addr.ip()
        )));
    }
    Ok(())
}

/// reject admin calls without the correct shared secret.
pub(crate) fn check_admin_secret<T>(req: &Request<T>, config: &Config) -> Result<(), Status> {
    let presented = req
        .metadata()
        .get(SECRET_METADATA_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let expected = config.auth_secret.as_bytes();

    if expected.is_empty() || !bool::from(presented.as_bytes().ct_eq(expected)) {
        return Err(Status::unauthenticated("invalid secret"));
    }
    Ok(())
}

/// unix-seconds helper for optional timestamps.
pub(crate) fn unix_or_zero(t: Option<chrono::DateTime<chrono::Utc>>) -> i64 {
    t.map(|t| t.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret(secret: &str) -> Config {
        Config {
            auth_secret: secret.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn admin_secret_must_match() {
        let config = config_with_secret("top-secret");

        let mut req = Request::new(());
        req.metadata_mut()
            .insert(SECRET_METADATA_KEY, "top-secret".parse().unwrap());
        assert!(check_admin_secret(&req, &config).is_ok());

        let mut wrong = Request::new(());
        wrong
            .metadata_mut()
            .insert(SECRET_METADATA_KEY, "nope".parse().unwrap());
        assert!(check_admin_secret(&wrong, &config).is_err());

        let missing = Request::new(());
        assert!(check_admin_secret(&missing, &config).is_err());
    }

    #[test]
    fn empty_configured_secret_rejects_all() {
        let config = config_with_secret("");
        let mut req = Request::new(());
        req.metadata_mut()
            .insert(SECRET_METADATA_KEY, "".parse().unwrap());
        assert!(check_admin_secret(&req, &config).is_err());
    }

    #[test]
    fn empty_allowlist_admits_unknown_sources() {
        let config = Config::default();
        let req = Request::new(());
        assert!(check_node_ip(&req, &config).is_ok());
    }
}
