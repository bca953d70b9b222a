//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     template string
//!     → pattern.rs (compile into segments)
//!     → table.rs (insert by specificity, append mapping group)
//!     → publish new immutable snapshot
//!
//! Resolution (every completed request):
//!     (path, method)
//!     → snapshot loaded once
//!     → first matching pattern
//!     → exact method, else first ANY, else miss
//! ```
//!
//! # Design Decisions
//! - Specificity is structural (literal > variable > catch-all), not lexical
//! - Resolution is pure and lock-free
//! - First match wins

pub mod pattern;
pub mod table;

pub use pattern::{PathVariables, PatternError, RoutePattern};
pub use table::{MappingGroup, RouteEntry, RouteMatch, RouteMethod, RouteMiss, Routes, RoutingTable};
