//! The record model: wire-format samples and their validated form.
//!
//! Records arrive from the upstream store with RFC 3339 timestamp strings,
//! exactly as the query service returns them. Validation parses the string
//! once, up front; everything downstream of [`Record`] works with a real
//! [`DateTime`] and never re-parses. A record whose timestamp does not parse
//! is rejected here — it must never reach the planner, where an arbitrary
//! sort position would silently corrupt window boundaries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One monitoring sample as returned by the record source.
///
/// The timestamp is kept as the raw wire string; use [`WireRecord::validate`]
/// to obtain a [`Record`] with a parsed instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    /// Monitored entity this sample belongs to.
    pub entity_id: String,
    /// Sample instant, RFC 3339.
    pub timestamp: String,
    /// Owner (tenant/organization) of the entity.
    pub owner_id: String,
    /// Opaque measured values.
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl WireRecord {
    /// Parses the wire timestamp and returns the validated record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the timestamp is not valid RFC 3339.
    pub fn validate(self) -> Result<Record> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| {
                Error::InvalidInput(format!(
                    "unparseable timestamp '{}' for entity {}: {e}",
                    self.timestamp, self.entity_id
                ))
            })?
            .with_timezone(&Utc);

        Ok(Record {
            entity_id: self.entity_id,
            timestamp,
            owner_id: self.owner_id,
            values: self.values,
        })
    }
}

/// A validated monitoring sample.
///
/// Immutable once constructed; the archive pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Monitored entity this sample belongs to.
    pub entity_id: String,
    /// Sample instant.
    pub timestamp: DateTime<Utc>,
    /// Owner (tenant/organization) of the entity.
    pub owner_id: String,
    /// Opaque measured values.
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Outcome of validating and grouping one raw batch.
#[derive(Debug, Default)]
pub struct GroupedBatch {
    /// Valid records bucketed by entity id.
    pub entities: HashMap<String, Vec<Record>>,
    /// Per-entity count of records rejected during validation.
    pub rejected: HashMap<String, usize>,
    /// First rejection message per entity, for reporting.
    pub rejection_messages: HashMap<String, String>,
}

impl GroupedBatch {
    /// Total number of valid records across all entities.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}

/// Validates a flat wire batch and groups it by entity id.
///
/// Invalid records are dropped from their entity's bucket and counted;
/// they never abort the entity, let alone the batch. Input order within
/// each entity bucket is preserved (the assigner's tie-break depends on it).
#[must_use]
pub fn group_by_entity(batch: Vec<WireRecord>) -> GroupedBatch {
    let mut grouped = GroupedBatch::default();
    for wire in batch {
        let entity_id = wire.entity_id.clone();
        match wire.validate() {
            Ok(record) => grouped.entities.entry(entity_id).or_default().push(record),
            Err(err) => {
                *grouped.rejected.entry(entity_id.clone()).or_insert(0) += 1;
                grouped
                    .rejection_messages
                    .entry(entity_id)
                    .or_insert_with(|| err.to_string());
            }
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(entity: &str, ts: &str) -> WireRecord {
        WireRecord {
            entity_id: entity.to_string(),
            timestamp: ts.to_string(),
            owner_id: "org-1".to_string(),
            values: serde_json::Map::new(),
        }
    }

    #[test]
    fn validate_parses_rfc3339() {
        let record = wire("m1", "2026-03-01T10:02:30Z").validate().expect("valid");
        assert_eq!(record.timestamp.timestamp(), 1_772_359_350);
    }

    #[test]
    fn validate_rejects_garbage_timestamp() {
        let err = wire("m1", "yesterday-ish").validate().unwrap_err();
        assert!(err.to_string().contains("unparseable timestamp"));
    }

    #[test]
    fn grouping_isolates_invalid_records() {
        let batch = vec![
            wire("m1", "2026-03-01T10:00:00Z"),
            wire("m1", "not-a-time"),
            wire("m2", "2026-03-01T10:01:00Z"),
        ];
        let grouped = group_by_entity(batch);
        assert_eq!(grouped.entities["m1"].len(), 1);
        assert_eq!(grouped.entities["m2"].len(), 1);
        assert_eq!(grouped.rejected["m1"], 1);
        assert!(!grouped.rejected.contains_key("m2"));
    }

    #[test]
    fn grouping_preserves_input_order_per_entity() {
        let batch = vec![
            wire("m1", "2026-03-01T10:02:00Z"),
            wire("m1", "2026-03-01T10:01:00Z"),
        ];
        let grouped = group_by_entity(batch);
        let ts: Vec<_> = grouped.entities["m1"]
            .iter()
            .map(|r| r.timestamp.to_rfc3339())
            .collect();
        assert_eq!(ts[0], "2026-03-01T10:02:00+00:00");
        assert_eq!(ts[1], "2026-03-01T10:01:00+00:00");
    }

    #[test]
    fn wire_record_deserializes_camel_case() {
        let json = r#"{
            "entityId": "m1",
            "timestamp": "2026-03-01T10:00:00Z",
            "ownerId": "org-1",
            "values": { "temp": 21.5 }
        }"#;
        let record: WireRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.entity_id, "m1");
        assert_eq!(record.owner_id, "org-1");
    }
}
