//! # fleetwatch-types
//!
//! Core types for fleet health and topology monitoring. This crate defines
//! the vocabulary shared by the engine, the connectors and any consumer of
//! exported reports.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON/TOML/etc.
//! - **Immutable values**: Spans and resource statuses are never mutated after construction
//! - **Ergonomic builders**: Fluent API for constructing spans and reports
//!
//! ## Features
//!
//! - `std` (default): Standard library support (wall-clock timestamps)
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use fleetwatch_types::{HealthStatus, ResourceHealthStatus, Span};
//!
//! let span = Span::builder("checkout", "checkout-7f9c", "trace-1", "span-2")
//!     .parent("span-1")
//!     .duration_micros(1_250)
//!     .annotation("http.method", "POST")
//!     .build();
//! assert!(span.parent_span_id.is_some());
//!
//! let status = ResourceHealthStatus::unavailable("db-1", "connection refused");
//! assert!(status.is_critical());
//! assert_eq!(status.status.max(HealthStatus::Ok), HealthStatus::Malfunction);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod attribute;
mod health;
mod report;
mod resource;
mod span;

pub use attribute::*;
pub use health::*;
pub use report::*;
pub use resource::*;
pub use span::*;

/// Current report schema version.
///
/// Increment this when making breaking changes to the exported report format.
pub const REPORT_VERSION: u32 = 1;
