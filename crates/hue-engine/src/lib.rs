//! usage enforcement engine for hue.
//!
//! this crate ties the in-memory state and the stores into the per-report
//! control flow:
//! - [`QuotaEngine`]: accept/reject decisions against package and
//!   manager-tree limits, atomic usage recording
//! - [`SessionTracker`]: concurrent sessions within a sliding window
//! - [`PenaltyManager`]: time-boxed penalties with disconnect fan-out
//! - [`EventStore`] / [`ReceiverHub`]: durable events plus best-effort
//!   in-process pub/sub
//! - [`UsageEngine`]: the ordered pipeline gluing it all together

#![warn(missing_docs)]

mod error;
mod events;
mod geo;
mod penalty;
mod pipeline;
mod quota;
mod session;

pub use error::Error;
pub use events::{EventStore, ReceiverHub};
pub use geo::{GeoIpResolver, NoopGeoIpResolver};
#[cfg(feature = "maxminddb")]
pub use geo::MaxmindGeoIpResolver;
pub use penalty::{PenaltyCheck, PenaltyManager};
pub use pipeline::UsageEngine;
pub use quota::{QuotaEngine, QuotaResult};
pub use session::{SessionCheck, SessionTracker};

/// result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
