//! core types for hue - a usage and subscription control plane.
//!
//! this crate provides the fundamental data structures used throughout hue:
//! - [`user`]: subscriber identity and status
//! - [`package`]: subscription plans with traffic limits and live counters
//! - [`node`] / [`service`]: the data-plane topology reporting usage
//! - [`manager`]: the reseller tree with aggregated limits
//! - [`event`]: immutable audit events
//! - [`report`]: usage reports flowing in from data-plane services
//! - [`config`]: application configuration

#![warn(missing_docs)]

mod auth_key;
mod config;
mod event;
mod manager;
mod node;
mod package;
mod report;
mod service;
mod time;
mod user;

pub use auth_key::{hash_auth_key, verify_auth_key};
pub use config::{Config, ConfigError, EventStoreKind, parse_duration};
pub use event::{Event, EventType};
pub use manager::{
    EnforcementMode, Manager, ManagerLimitError, ManagerPackage, ManagerPackageStatus,
};
pub use node::{Node, NodeCreate, NodeUpdate};
pub use package::{Package, PackageCreate, PackageStatus, PackageUpdate, ResetMode};
pub use report::{GeoData, UsageReport, UsageReportResult};
pub use service::{AuthMethod, Service, ServiceCreate, ServiceUpdate};
pub use time::parse_flexible_timestamp;
pub use user::{User, UserCreate, UserFilter, UserStatus, UserUpdate};
