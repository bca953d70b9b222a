//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Server::add_health_check(name, check) → registry.rs
//!
//! Scheduling (scheduler.rs):
//!     Initial delay → periodic timer
//!     → run every check
//!     → store latest result per name
//!
//! Reporting:
//!     /health admin route reads the latest results
//! ```
//!
//! # Design Decisions
//! - Checks are synchronous and cheap; they run on the scheduler task
//! - A check never seen before reports as not yet run, not as unhealthy

pub mod registry;
pub mod scheduler;

pub use registry::{HealthCheck, HealthRegistry, HealthStatus};
pub use scheduler::HealthScheduler;
