//! Compilation of one window's records into a single archive artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::window::Window;

/// One entry of a compiled artifact: a timestamped set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    /// Sample instant.
    pub timestamp: DateTime<Utc>,
    /// Opaque measured values.
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// The compiled representation of one entity's records for one window.
///
/// Entries are ordered ascending by timestamp. Field order here is the
/// serialized field order; keep it matching construction order so the JSON
/// form stays stable and diffable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledArtifact {
    /// Entity whose records this artifact holds.
    pub entity_id: String,
    /// Owner of the entity.
    pub owner_id: String,
    /// Start of the window this artifact covers.
    pub window_start: DateTime<Utc>,
    /// Samples inside the window, ascending by timestamp.
    pub entries: Vec<ArtifactEntry>,
}

impl CompiledArtifact {
    /// Serializes the artifact to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Serialization {
            message: format!(
                "failed to encode artifact for entity {} window {}: {e}",
                self.entity_id,
                self.window_start.to_rfc3339()
            ),
        })
    }
}

/// A compiled window together with integrity findings.
#[derive(Debug, Clone)]
pub struct CompiledWindow {
    /// The artifact to persist.
    pub artifact: CompiledArtifact,
    /// True if records in the window disagreed on the owner id. The artifact
    /// carries the first record's owner; the conflict is the caller's to
    /// report.
    pub owner_conflict: bool,
}

/// Compiles the records assigned to one window into an artifact.
///
/// Returns `None` for an empty bucket — an artifact with zero entries is
/// never produced, so the store cannot accumulate empty files and "no data"
/// stays distinguishable from "data lost". The records must already be
/// ordered ascending by timestamp (the assigner's output contract).
///
/// Owner policy: all records for one entity are expected to share one owner.
/// If they disagree, the first record's owner wins and the result is flagged
/// rather than rejected — rejecting would drop samples over a metadata
/// inconsistency.
#[must_use]
pub fn compile(window: &Window, records: &[Record]) -> Option<CompiledWindow> {
    let first = records.first()?;
    let owner_id = first.owner_id.clone();
    let entity_id = first.entity_id.clone();
    let owner_conflict = records.iter().any(|r| r.owner_id != owner_id);

    let entries = records
        .iter()
        .map(|r| ArtifactEntry {
            timestamp: r.timestamp,
            values: r.values.clone(),
        })
        .collect();

    Some(CompiledWindow {
        artifact: CompiledArtifact {
            entity_id,
            owner_id,
            window_start: window.start,
            entries,
        },
        owner_conflict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(owner: &str, ts: &str) -> Record {
        Record {
            entity_id: "m1".to_string(),
            timestamp: ts.parse().expect("test timestamp"),
            owner_id: owner.to_string(),
            values: serde_json::Map::new(),
        }
    }

    fn window(start: &str) -> Window {
        let start: DateTime<Utc> = start.parse().expect("test timestamp");
        Window {
            start,
            end: start + Duration::minutes(5),
        }
    }

    #[test]
    fn empty_bucket_produces_no_artifact() {
        assert!(compile(&window("2026-03-01T10:00:00Z"), &[]).is_none());
    }

    #[test]
    fn compile_builds_entries_in_record_order() {
        let records = vec![
            record("org-1", "2026-03-01T10:00:00Z"),
            record("org-1", "2026-03-01T10:02:30Z"),
        ];
        let compiled = compile(&window("2026-03-01T10:00:00Z"), &records).expect("artifact");
        assert!(!compiled.owner_conflict);
        assert_eq!(compiled.artifact.entity_id, "m1");
        assert_eq!(compiled.artifact.owner_id, "org-1");
        assert_eq!(
            compiled.artifact.window_start.to_rfc3339(),
            "2026-03-01T10:00:00+00:00"
        );
        assert_eq!(compiled.artifact.entries.len(), 2);
        assert!(compiled.artifact.entries[0].timestamp < compiled.artifact.entries[1].timestamp);
    }

    #[test]
    fn owner_disagreement_keeps_first_and_flags() {
        let records = vec![
            record("org-1", "2026-03-01T10:00:00Z"),
            record("org-2", "2026-03-01T10:01:00Z"),
        ];
        let compiled = compile(&window("2026-03-01T10:00:00Z"), &records).expect("artifact");
        assert!(compiled.owner_conflict);
        assert_eq!(compiled.artifact.owner_id, "org-1");
        assert_eq!(compiled.artifact.entries.len(), 2);
    }

    #[test]
    fn json_form_is_stable_and_camel_case() {
        let records = vec![record("org-1", "2026-03-01T10:00:00Z")];
        let compiled = compile(&window("2026-03-01T10:00:00Z"), &records).expect("artifact");
        let json = String::from_utf8(compiled.artifact.to_json_pretty().expect("encode"))
            .expect("utf8");
        // Field order matches construction order.
        let entity_pos = json.find("\"entityId\"").expect("entityId");
        let owner_pos = json.find("\"ownerId\"").expect("ownerId");
        let start_pos = json.find("\"windowStart\"").expect("windowStart");
        let entries_pos = json.find("\"entries\"").expect("entries");
        assert!(entity_pos < owner_pos && owner_pos < start_pos && start_pos < entries_pos);
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let records = vec![record("org-1", "2026-03-01T10:00:00Z")];
        let compiled = compile(&window("2026-03-01T10:00:00Z"), &records).expect("artifact");
        let bytes = compiled.artifact.to_json_pretty().expect("encode");
        let decoded: CompiledArtifact = serde_json::from_slice(&bytes).expect("decode");
        assert_eq!(decoded, compiled.artifact);
    }
}
