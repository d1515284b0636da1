//! Property-based tests for window-arithmetic invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated record sets:
//!
//! 1. **Coverage**: the plan covers `[alignedStart(min), alignedStart(max) + D)`
//! 2. **Partition**: assignment places every record in exactly one bucket
//! 3. **Determinism**: compiled entry sequences are identical for any
//!    permutation of the input ordering

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use strata_core::{assign, compile, plan, Record};

/// Generates a timestamp within a few days around a fixed base instant.
fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // 2026-03-01T00:00:00Z, offsets up to ~3 days in seconds.
    (0i64..260_000).prop_map(|offset| {
        DateTime::from_timestamp(1_772_323_200 + offset, 0).expect("valid instant")
    })
}

fn arb_record() -> impl Strategy<Value = Record> {
    (arb_timestamp(), 0u8..3).prop_map(|(timestamp, owner)| Record {
        entity_id: "m1".to_string(),
        timestamp,
        owner_id: format!("org-{owner}"),
        values: serde_json::Map::new(),
    })
}

fn arb_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(arb_record(), 1..50)
}

fn arb_duration() -> impl Strategy<Value = Duration> {
    // 1 second to 1 hour.
    (1i64..3600).prop_map(Duration::seconds)
}

proptest! {
    #[test]
    fn plan_is_contiguous_sorted_and_covering(records in arb_records(), duration in arb_duration()) {
        let windows = plan(&records, duration).expect("plan");
        prop_assert!(!windows.is_empty());

        let duration_ms = duration.num_milliseconds();
        for window in &windows {
            prop_assert_eq!(
                window.end.timestamp_millis() - window.start.timestamp_millis(),
                duration_ms
            );
            prop_assert_eq!(window.start.timestamp_millis().rem_euclid(duration_ms), 0);
        }
        for pair in windows.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }

        let min = records.iter().map(|r| r.timestamp).min().expect("non-empty");
        let max = records.iter().map(|r| r.timestamp).max().expect("non-empty");
        let first = windows.first().expect("non-empty");
        let last = windows.last().expect("non-empty");
        prop_assert!(first.start <= min && min < first.end);
        prop_assert!(last.start <= max && max < last.end);
    }

    #[test]
    fn assignment_partitions_the_input_exactly(records in arb_records(), duration in arb_duration()) {
        let windows = plan(&records, duration).expect("plan");
        let buckets = assign(&records, &windows).expect("assign");

        // Key set of the mapping equals the full plan, empty windows included.
        prop_assert_eq!(buckets.len(), windows.len());

        let mut assigned = 0usize;
        for bucket in &buckets {
            for record in &bucket.records {
                prop_assert!(bucket.window.contains(record.timestamp));
            }
            for pair in bucket.records.windows(2) {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }
            assigned += bucket.records.len();
        }
        prop_assert_eq!(assigned, records.len());
    }

    #[test]
    fn compiled_entries_are_permutation_independent(
        records in arb_records(),
        duration in arb_duration(),
        seed in any::<u64>(),
    ) {
        // Records sharing a timestamp are tie-broken by input order, so only
        // sets without duplicate timestamps must compile identically under
        // permutation.
        let mut unique = records.clone();
        unique.sort_by_key(|r| r.timestamp);
        unique.dedup_by_key(|r| r.timestamp);

        let windows = plan(&unique, duration).expect("plan");
        let forward = assign(&unique, &windows).expect("assign");

        // Deterministic pseudo-shuffle of the input ordering.
        let mut shuffled = unique.clone();
        let len = shuffled.len();
        for i in 0..len {
            let j = (seed as usize).wrapping_mul(31).wrapping_add(i * 7) % len;
            shuffled.swap(i, j);
        }
        let backward = assign(&shuffled, &windows).expect("assign");

        for (a, b) in forward.iter().zip(backward.iter()) {
            let compiled_a = compile(&a.window, &a.records);
            let compiled_b = compile(&b.window, &b.records);
            match (compiled_a, compiled_b) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    prop_assert_eq!(a.artifact.entries, b.artifact.entries);
                }
                _ => prop_assert!(false, "one ordering produced an artifact the other did not"),
            }
        }
    }

    #[test]
    fn no_artifact_for_empty_windows(records in arb_records(), duration in arb_duration()) {
        let windows = plan(&records, duration).expect("plan");
        let buckets = assign(&records, &windows).expect("assign");
        for bucket in &buckets {
            let compiled = compile(&bucket.window, &bucket.records);
            prop_assert_eq!(compiled.is_some(), !bucket.records.is_empty());
            if let Some(compiled) = compile(&bucket.window, &bucket.records) {
                prop_assert!(!compiled.artifact.entries.is_empty());
            }
        }
    }
}
