//! # strata-core
//!
//! Core primitives for strata, the windowed archiver of time-series
//! monitoring samples.
//!
//! This crate provides everything the archive pipeline shares:
//!
//! - **Record Model**: wire-format samples and their validated form
//! - **Window Arithmetic**: epoch-aligned planning and half-open assignment
//! - **Artifact Compilation**: one compiled artifact per non-empty window
//! - **Artifact Keys**: stable, collision-free storage paths
//! - **Sinks**: the `ArtifactSink` trait with memory and object-store backends
//! - **Error Types**: shared error definitions and result types
//!
//! The pipeline stages (`window::plan`, `window::assign`,
//! `artifact::compile`) are pure functions; everything stateful or
//! I/O-bound sits behind traits.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Duration;
//! use strata_core::prelude::*;
//!
//! let wire = vec![WireRecord {
//!     entity_id: "m1".into(),
//!     timestamp: "2026-03-01T10:02:30Z".into(),
//!     owner_id: "org-1".into(),
//!     values: serde_json::Map::new(),
//! }];
//! let grouped = group_by_entity(wire);
//! let records = &grouped.entities["m1"];
//! let windows = plan(records, Duration::minutes(5)).unwrap();
//! let buckets = assign(records, &windows).unwrap();
//! assert_eq!(buckets.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod artifact;
pub mod error;
pub mod id;
pub mod keys;
pub mod observability;
pub mod record;
pub mod sink;
pub mod window;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use strata_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::artifact::{compile, ArtifactEntry, CompiledArtifact, CompiledWindow};
    pub use crate::error::{Error, Result};
    pub use crate::id::ArchiveRunId;
    pub use crate::keys::ArtifactKey;
    pub use crate::record::{group_by_entity, GroupedBatch, Record, WireRecord};
    pub use crate::sink::{ArtifactSink, MemorySink, ObjectStoreSink};
    pub use crate::window::{assign, plan, Window, WindowBucket};
}

// Re-export key types at crate root for ergonomics
pub use artifact::{compile, ArtifactEntry, CompiledArtifact, CompiledWindow};
pub use error::{Error, Result};
pub use id::ArchiveRunId;
pub use keys::ArtifactKey;
pub use observability::{init_logging, LogFormat};
pub use record::{group_by_entity, GroupedBatch, Record, WireRecord};
pub use sink::{ArtifactSink, MemorySink, ObjectStoreSink};
pub use window::{assign, plan, Window, WindowBucket};
