//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (meters, mirrored into the metrics facade)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → /metrics admin route (JSON snapshot)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Connection and stream IDs are span fields, not message text
//! - Meters are cheap (atomic increments)

pub mod logging;
pub mod metrics;
