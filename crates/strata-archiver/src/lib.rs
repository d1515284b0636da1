//! # strata-archiver
//!
//! The archival service for strata: fetches recent monitoring samples from a
//! [`RecordSource`], buckets each entity's records into aligned fixed-size
//! time windows, and persists one compiled artifact per non-empty window to
//! an [`strata_core::ArtifactSink`].
//!
//! The coordinator never fails a pass as a whole. Sink failures, rejected
//! records, and cancelled windows are aggregated into an [`ArchiveResult`];
//! partial success is the normal outcome shape. Re-running a pass over the
//! same data re-derives the same artifact keys, so persistence is
//! at-least-once with idempotent overwrites.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod coordinator;
pub mod result;
pub mod source;

pub use coordinator::{ArchiveCoordinator, ArchiverConfig};
pub use result::{ArchiveResult, EntityReport, WindowOutcome};
pub use source::{JsonFileSource, MemorySource, RecordSource};
