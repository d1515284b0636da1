//! Window arithmetic: planning aligned time windows and assigning records.
//!
//! A window is a half-open, fixed-duration interval `[start, start + D)`
//! whose start is aligned to a multiple of `D` since the Unix epoch. Both
//! operations here are pure: deterministic for a given record set and
//! duration, independent of input iteration order, and free of I/O.
//!
//! Alignment is *floor* alignment. Rounding to the nearest boundary can
//! advance past the true start whenever the minimum timestamp sits more than
//! half a window past its floor boundary; flooring is the only policy that
//! guarantees the first window covers the minimum timestamp.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Record;

/// A half-open, epoch-aligned time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// Inclusive start, aligned to a multiple of the window duration.
    pub start: DateTime<Utc>,
    /// Exclusive end, `start + duration`.
    pub end: DateTime<Utc>,
}

impl Window {
    /// Returns true if the instant falls inside this window.
    ///
    /// Half-open: an instant exactly on `end` belongs to the *next* window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// The records assigned to one window of a plan.
///
/// Buckets come back in plan order, one per planned window, empty windows
/// included — the caller decides whether to skip compilation for them.
#[derive(Debug, Clone)]
pub struct WindowBucket {
    /// The window these records fall into.
    pub window: Window,
    /// Records inside the window, ascending by timestamp, ties in input order.
    pub records: Vec<Record>,
}

/// Floors an instant to its aligned window boundary.
///
/// Uses euclidean division so pre-epoch instants floor toward the earlier
/// boundary rather than toward zero.
fn aligned_start_millis(instant_millis: i64, duration_millis: i64) -> i64 {
    instant_millis.div_euclid(duration_millis) * duration_millis
}

/// Computes the aligned window plan covering every record in the set.
///
/// The plan is contiguous, non-overlapping, and strictly increasing. The
/// first window's start is the greatest aligned boundary at or before the
/// minimum record timestamp; the last window's end is the smallest aligned
/// boundary strictly after the maximum. A set whose timestamps all share one
/// window yields a single-window plan.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `records` is empty or
/// `window_duration` is not positive.
pub fn plan(records: &[Record], window_duration: Duration) -> Result<Vec<Window>> {
    if records.is_empty() {
        return Err(Error::InvalidInput(
            "cannot plan windows for an empty record set".to_string(),
        ));
    }
    let duration_millis = window_duration.num_milliseconds();
    if duration_millis <= 0 {
        return Err(Error::InvalidInput(format!(
            "window duration must be positive, got {duration_millis}ms"
        )));
    }

    let min_millis = records
        .iter()
        .map(|r| r.timestamp.timestamp_millis())
        .min()
        .unwrap_or_default();
    let max_millis = records
        .iter()
        .map(|r| r.timestamp.timestamp_millis())
        .max()
        .unwrap_or_default();

    let mut windows = Vec::new();
    let mut start = aligned_start_millis(min_millis, duration_millis);
    while start <= max_millis {
        let end = start + duration_millis;
        windows.push(Window {
            start: millis_to_instant(start)?,
            end: millis_to_instant(end)?,
        });
        start = end;
    }
    Ok(windows)
}

/// Assigns every record to exactly one window of the plan.
///
/// Membership is half-open (`start <= ts < end`), so a boundary-exact
/// timestamp lands in the window it starts, never the preceding one. Each
/// bucket is sorted ascending by timestamp with a stable sort, so records
/// sharing a timestamp keep their input order and the output is
/// deterministic for identical inputs.
///
/// # Errors
///
/// Returns [`Error::Internal`] if a record falls outside the plan; with a
/// plan computed by [`plan`] over the same set this cannot happen.
pub fn assign(records: &[Record], windows: &[Window]) -> Result<Vec<WindowBucket>> {
    if windows.is_empty() {
        return Err(Error::InvalidInput(
            "cannot assign records to an empty plan".to_string(),
        ));
    }

    let plan_start = windows[0].start.timestamp_millis();
    let duration_millis = windows[0].end.timestamp_millis() - plan_start;

    let mut buckets: Vec<WindowBucket> = windows
        .iter()
        .map(|w| WindowBucket {
            window: *w,
            records: Vec::new(),
        })
        .collect();

    for record in records {
        let offset = record.timestamp.timestamp_millis() - plan_start;
        let index = offset.div_euclid(duration_millis);
        let bucket = usize::try_from(index)
            .ok()
            .and_then(|i| buckets.get_mut(i))
            .ok_or_else(|| {
                Error::internal(format!(
                    "record at {} falls outside the planned windows",
                    record.timestamp.to_rfc3339()
                ))
            })?;
        bucket.records.push(record.clone());
    }

    for bucket in &mut buckets {
        bucket.records.sort_by_key(|r| r.timestamp);
    }
    Ok(buckets)
}

fn millis_to_instant(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::internal(format!("window boundary {millis}ms out of range")))
}
