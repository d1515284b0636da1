//! Record source abstraction: where archive batches come from.
//!
//! The source owns pagination, retries, and query semantics; the coordinator
//! only asks for the full logical result set older than a cutoff, once per
//! pass. Records come back in wire form — timestamp validation happens in
//! the pipeline, not here, so a source never has to reject data it merely
//! transports.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use strata_core::{Error, Result, WireRecord};

/// Supplier of monitoring samples for one archive pass.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches every record with a timestamp strictly before `cutoff`.
    ///
    /// Returns an unordered flat batch spanning any number of entities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Source`] on transport or query failure.
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<WireRecord>>;
}

/// In-memory record source for testing and local runs.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: Vec<WireRecord>,
}

impl MemorySource {
    /// Creates a source holding the given records.
    #[must_use]
    pub fn new(records: Vec<WireRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<WireRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| before_cutoff(r, cutoff))
            .cloned()
            .collect())
    }
}

/// Record source reading a JSON array of wire records from a file.
///
/// Lets the binary run an archive pass from an exported batch without a live
/// upstream store.
#[derive(Debug)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source reading from the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    async fn fetch_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<WireRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::source_with(format!("failed to read {}", self.path.display()), e)
        })?;
        let records: Vec<WireRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            Error::source_with(format!("failed to parse {}", self.path.display()), e)
        })?;
        Ok(records
            .into_iter()
            .filter(|r| before_cutoff(r, cutoff))
            .collect())
    }
}

/// Cutoff filter over the wire timestamp.
///
/// Records whose timestamp does not parse are passed through: rejection with
/// an error belongs to validation in the pipeline, not to a transport-level
/// filter that would drop them silently.
fn before_cutoff(record: &WireRecord, cutoff: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(&record.timestamp)
        .map_or(true, |ts| ts.with_timezone(&Utc) < cutoff)
}
