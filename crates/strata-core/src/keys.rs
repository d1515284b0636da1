//! Typed artifact keys for stable, collision-free storage paths.
//!
//! A key identifies one (entity, window) artifact and is a pure function of
//! its inputs: two invocations that archive the same window for the same
//! entity derive the same key. That stability is what makes re-persisting
//! after a partial failure an idempotent overwrite rather than a duplicate.
//!
//! # Path Format
//!
//! `{owner_id}/{entity_id}/{window_start RFC3339}-data.json`

use chrono::{DateTime, SecondsFormat, Utc};

/// A typed key addressing one compiled artifact in the sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Derives the key for one (entity, window) artifact.
    #[must_use]
    pub fn derive(owner_id: &str, entity_id: &str, window_start: DateTime<Utc>) -> Self {
        Self(format!(
            "{owner_id}/{entity_id}/{}-data.json",
            window_start.to_rfc3339_opts(SecondsFormat::Secs, true)
        ))
    }

    /// Returns the key for an entity's artifact directory prefix.
    #[must_use]
    pub fn entity_prefix(owner_id: &str, entity_id: &str) -> String {
        format!("{owner_id}/{entity_id}/")
    }
}

impl AsRef<str> for ArtifactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format_is_stable() {
        let start: DateTime<Utc> = "2026-03-01T10:05:00Z".parse().expect("timestamp");
        let key = ArtifactKey::derive("org-1", "m1", start);
        assert_eq!(key.as_ref(), "org-1/m1/2026-03-01T10:05:00Z-data.json");
    }

    #[test]
    fn same_inputs_derive_same_key() {
        let start: DateTime<Utc> = "2026-03-01T10:05:00Z".parse().expect("timestamp");
        assert_eq!(
            ArtifactKey::derive("org-1", "m1", start),
            ArtifactKey::derive("org-1", "m1", start)
        );
    }

    #[test]
    fn keys_fall_under_entity_prefix() {
        let start: DateTime<Utc> = "2026-03-01T10:05:00Z".parse().expect("timestamp");
        let key = ArtifactKey::derive("org-1", "m1", start);
        assert!(key.as_ref().starts_with(&ArtifactKey::entity_prefix("org-1", "m1")));
    }
}
